//! Branch names and revision expressions

pub mod branch_name;
pub mod revision;

/// Branch HEAD points at in a freshly initialized repository
pub const DEFAULT_BRANCH: &str = "main";
pub const HEAD_REF_NAME: &str = "HEAD";
/// Directory (relative to the metadata dir) holding one file per branch
pub const HEADS_PREFIX: &str = "refs/heads/";

pub const INVALID_BRANCH_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";
pub const PARENT_REGEX: &str = r"^(.+)\^$";
pub const ANCESTOR_REGEX: &str = r"^(.+)\~(\d+)$";
pub const REF_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};

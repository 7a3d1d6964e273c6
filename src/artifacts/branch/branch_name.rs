use crate::artifacts::branch::{DEFAULT_BRANCH, HEADS_PREFIX, INVALID_BRANCH_NAME_REGEX};
use crate::error::{Error, Result};

/// A validated branch name such as `main` or `feature/login`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn try_parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidBranchName(name));
        }

        let re = regex::Regex::new(INVALID_BRANCH_NAME_REGEX)
            .map_err(|err| Error::malformed("branch name pattern", err.to_string()))?;

        if re.is_match(&name) {
            Err(Error::InvalidBranchName(name))
        } else {
            Ok(Self(name))
        }
    }

    pub fn default_branch() -> Self {
        Self(DEFAULT_BRANCH.to_string())
    }

    /// Parse the target of a symbolic HEAD (`refs/heads/<name>`).
    pub fn try_parse_ref_path(ref_path: &str) -> Result<Self> {
        let name = ref_path
            .strip_prefix(HEADS_PREFIX)
            .ok_or_else(|| Error::malformed("HEAD", format!("unsupported ref {ref_path}")))?;

        Self::try_parse(name)
    }

    /// Path of the branch file relative to the metadata directory.
    pub fn to_ref_path(&self) -> String {
        format!("{HEADS_PREFIX}{}", self.0)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::proptest;

    proptest! {
        #[test]
        fn test_is_valid_branch_name_with_valid_branch_name(
            branch_name in "[a-zA-Z0-9_-]+"
        ) {
            assert!(BranchName::try_parse(branch_name).is_ok());
        }

        #[test]
        fn test_is_valid_branch_name_with_slashes(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}/{}", prefix, suffix);
            assert!(BranchName::try_parse(branch_name).is_ok());
        }

        #[test]
        fn test_is_invalid_branch_name_starting_with_dot(
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!(".{}", suffix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn test_is_invalid_branch_name_ending_with_lock(
            prefix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}.lock", prefix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn test_is_invalid_branch_name_with_consecutive_dots(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}..{}", prefix, suffix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn test_is_invalid_branch_name_with_special_chars(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+",
            special_char in r"[\*:\?\[\\^~ ]"
        ) {
            let branch_name = format!("{}{}{}", prefix, special_char, suffix);
            assert!(matches!(
                BranchName::try_parse(branch_name),
                Err(Error::InvalidBranchName(_))
            ));
        }
    }

    #[test]
    fn test_is_invalid_branch_name_edges() {
        for name in ["", "/lead", "trail/", "a@{b}", "nul\x00byte"] {
            assert!(BranchName::try_parse(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn test_ref_path_round_trip() {
        let name = BranchName::try_parse("feature/login").unwrap();

        assert_eq!(name.to_ref_path(), "refs/heads/feature/login");
        assert_eq!(BranchName::try_parse_ref_path(&name.to_ref_path()).unwrap(), name);
        assert!(BranchName::try_parse_ref_path("refs/tags/v1").is_err());
    }
}

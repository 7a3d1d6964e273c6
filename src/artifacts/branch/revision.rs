use crate::areas::database::Database;
use crate::areas::refs::Refs;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::{ANCESTOR_REGEX, HEAD_REF_NAME, PARENT_REGEX, REF_ALIASES};
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::{Error, Result};

/// A revision expression naming a commit.
///
/// Supported forms:
/// - `HEAD`, `@`, a branch name, a full or abbreviated digest
/// - `<rev>^`: the first parent of `<rev>`
/// - `<rev>~<n>`: the n-th first-parent ancestor of `<rev>`
///
/// Digest-looking names are kept as `Name` at parse time; the ref store
/// decides during resolution whether they name a branch or an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    Name(String),
    Parent(Box<Revision>),
    Ancestor(Box<Revision>, usize),
}

impl Revision {
    pub fn try_parse(revision: &str) -> Result<Revision> {
        let parent_re = regex::Regex::new(PARENT_REGEX)
            .map_err(|err| Error::malformed("revision pattern", err.to_string()))?;
        let ancestor_re = regex::Regex::new(ANCESTOR_REGEX)
            .map_err(|err| Error::malformed("revision pattern", err.to_string()))?;

        if let Some(caps) = parent_re.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Parent(Box::new(base_revision)))
        } else if let Some(caps) = ancestor_re.captures(revision) {
            let generations = caps[2]
                .parse::<usize>()
                .map_err(|_| Error::malformed("revision", revision.to_string()))?;
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Ancestor(Box::new(base_revision), generations))
        } else {
            let resolved_name = *REF_ALIASES.get(revision).unwrap_or(&revision);
            if resolved_name != HEAD_REF_NAME {
                BranchName::try_parse(resolved_name)?;
            }

            Ok(Revision::Name(resolved_name.to_string()))
        }
    }

    /// Resolve to a commit digest; `None` when the chain runs out (an unborn
    /// branch, or walking past the root commit).
    pub fn resolve(&self, refs: &Refs, database: &Database) -> Result<Option<ObjectId>> {
        match self {
            Revision::Name(name) => refs.resolve(name, database),
            Revision::Parent(base_revision) => {
                Self::resolve_commit_parent(base_revision.resolve(refs, database)?, database)
            }
            Revision::Ancestor(base_revision, generations) => {
                let mut oid = base_revision.resolve(refs, database)?;
                for _ in 0..*generations {
                    oid = Self::resolve_commit_parent(oid, database)?;
                }

                Ok(oid)
            }
        }
    }

    fn resolve_commit_parent(
        oid: Option<ObjectId>,
        database: &Database,
    ) -> Result<Option<ObjectId>> {
        match oid {
            Some(oid) => Ok(database.load_commit(&oid)?.parent().cloned()),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn name(value: &str) -> Revision {
        Revision::Name(value.to_string())
    }

    #[test]
    fn test_parse_simple_ref() {
        assert_eq!(Revision::try_parse("main").unwrap(), name("main"));
    }

    #[test]
    fn test_parse_head_alias() {
        assert_eq!(Revision::try_parse("@").unwrap(), name("HEAD"));
    }

    #[test]
    fn test_parse_nested_parent() {
        assert_eq!(
            Revision::try_parse("main^^").unwrap(),
            Revision::Parent(Box::new(Revision::Parent(Box::new(name("main")))))
        );
    }

    #[test]
    fn test_parse_ancestor_of_parent() {
        assert_eq!(
            Revision::try_parse("HEAD^~2").unwrap(),
            Revision::Ancestor(Box::new(Revision::Parent(Box::new(name("HEAD")))), 2)
        );
    }

    #[test]
    fn test_parse_invalid_names() {
        for revision in ["", "invalid name", "invalid:name", ".invalid^", ".invalid~5"] {
            assert!(Revision::try_parse(revision).is_err(), "{revision:?}");
        }
    }

    fn valid_branch_name_strategy() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9][a-zA-Z0-9_/-]*[a-zA-Z0-9]")
            .unwrap()
            .prop_filter("Must not contain invalid patterns", |s| {
                !s.contains("//") && s.len() < 256
            })
    }

    proptest! {
        #[test]
        fn prop_ancestor_suffix_creates_ancestor_revision(
            base in valid_branch_name_strategy(),
            generations in 0usize..100
        ) {
            let parsed = Revision::try_parse(&format!("{}~{}", base, generations)).unwrap();
            prop_assert_eq!(parsed, Revision::Ancestor(Box::new(name(&base)), generations));
        }

        #[test]
        fn prop_digests_parse_as_names(oid in "[0-9a-f]{4,64}") {
            prop_assert_eq!(Revision::try_parse(&oid).unwrap(), name(&oid));
        }
    }
}

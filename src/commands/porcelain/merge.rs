use crate::areas::repository::Repository;
use crate::artifacts::core::clock;
use crate::artifacts::merge::{ConflictKind, MergeOutcome};
use crate::artifacts::objects::commit::Author;
use std::io::Write;

impl Repository {
    /// Merge `target` into HEAD. A conflicted merge reports the conflicting
    /// paths and fails, leaving the markers for the user.
    pub fn merge_revision(&self, target: &str, message: Option<&str>) -> anyhow::Result<()> {
        let target_oid = self
            .resolve_revision(target)?
            .ok_or_else(|| anyhow::anyhow!("{target} - not something we can merge"))?;

        let author = Author::load_name_from_env()?;
        let clock = clock::load_from_env();
        let current = self.refs().read_head()?;

        match self.merge(&target_oid, target, &author, message.map(str::trim), clock.as_ref())? {
            MergeOutcome::UpToDate => writeln!(self.writer(), "Already up to date.")?,
            MergeOutcome::FastForward(oid) => {
                match current {
                    Some(current) => writeln!(
                        self.writer(),
                        "Updating {}..{}",
                        current.to_short_oid(),
                        oid.to_short_oid()
                    )?,
                    None => writeln!(self.writer(), "Updating to {}", oid.to_short_oid())?,
                }
                writeln!(self.writer(), "Fast-forward")?;
            }
            MergeOutcome::Merged(oid) => {
                writeln!(
                    self.writer(),
                    "Merge made by the 'three-way' strategy: {}",
                    oid.to_short_oid()
                )?;
            }
            MergeOutcome::Conflicted { conflicts, .. } => {
                for conflict in &conflicts {
                    let kind = match conflict.kind {
                        ConflictKind::Content => "content",
                        ConflictKind::FileDirectory => "file/directory",
                    };
                    writeln!(
                        self.writer(),
                        "CONFLICT ({kind}): Merge conflict in {}",
                        conflict.path.display()
                    )?;
                }
                anyhow::bail!("automatic merge failed; fix conflicts and then commit the result");
            }
        }

        Ok(())
    }
}

use crate::areas::repository::Repository;
use crate::artifacts::diff::lcs::{Edit, diff_lines};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use colored::Colorize;
use std::io::Write;
use std::path::Path;

const NULL_PATH: &str = "/dev/null";

impl Repository {
    /// Line diff of the working directory against the index, or of the index
    /// against HEAD when `cached`. `None` stands for a missing side.
    pub fn diff(&self, cached: bool) -> anyhow::Result<()> {
        let status_info = self.status()?;

        if cached {
            let head_tree = self.head_tree()?;
            for (path, change) in status_info.staged() {
                let old = match head_tree.get(path) {
                    Some(entry) if change != IndexChangeType::Added => {
                        Some(self.blob_text(&entry.oid)?)
                    }
                    _ => None,
                };
                let new = match change {
                    IndexChangeType::Deleted => None,
                    _ => self.index_text(path)?,
                };
                self.print_file_diff(path, old.as_deref(), new.as_deref())?;
            }
        } else {
            for (path, change) in status_info.unstaged() {
                let old = self.index_text(path)?;
                let new = match change {
                    WorkspaceChangeType::Deleted => None,
                    _ => Some(
                        String::from_utf8_lossy(&self.workspace().read_file(path)?).into_owned(),
                    ),
                };
                self.print_file_diff(path, old.as_deref(), new.as_deref())?;
            }
        }

        Ok(())
    }

    fn index_text(&self, path: &Path) -> anyhow::Result<Option<String>> {
        let oid = self.index().entry_by_path(path).map(|entry| entry.oid.clone());

        match oid {
            Some(oid) => Ok(Some(self.blob_text(&oid)?)),
            None => Ok(None),
        }
    }

    fn blob_text(&self, oid: &ObjectId) -> anyhow::Result<String> {
        Ok(self.database().load_blob(oid)?.text())
    }

    fn print_file_diff(
        &self,
        path: &Path,
        old: Option<&str>,
        new: Option<&str>,
    ) -> anyhow::Result<()> {
        if old == new {
            return Ok(());
        }

        let path = path.display();
        let old_label = old.map_or(NULL_PATH.to_string(), |_| format!("a/{path}"));
        let new_label = new.map_or(NULL_PATH.to_string(), |_| format!("b/{path}"));

        writeln!(
            self.writer(),
            "{}",
            format!("diff --arbor a/{path} b/{path}").bold()
        )?;
        writeln!(self.writer(), "{}", format!("--- {old_label}").bold())?;
        writeln!(self.writer(), "{}", format!("+++ {new_label}").bold())?;

        for edit in diff_lines(old.unwrap_or_default(), new.unwrap_or_default()) {
            let line = edit.to_string();
            match edit {
                Edit::Delete { .. } => writeln!(self.writer(), "{}", line.red())?,
                Edit::Insert { .. } => writeln!(self.writer(), "{}", line.green())?,
                Edit::Equal { .. } => writeln!(self.writer(), "{line}")?,
            }
        }

        Ok(())
    }
}

//! Per-path three-way resolution
//!
//! Each path is decided from its entry in the base, current and target trees
//! (absent entries are `None`):
//!
//! | current vs target | base vs current | base vs target | result   |
//! |-------------------|-----------------|----------------|----------|
//! | same              | any             | any            | current  |
//! | differ            | same            | differ         | target   |
//! | differ            | differ          | same           | current  |
//! | differ            | differ          | differ         | conflict |

use crate::artifacts::database::database_entry::DatabaseEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Take this entry; `None` removes the path
    Clean(Option<DatabaseEntry>),
    Conflict {
        current: Option<DatabaseEntry>,
        target: Option<DatabaseEntry>,
    },
}

pub fn resolve_path(
    base: Option<&DatabaseEntry>,
    current: Option<&DatabaseEntry>,
    target: Option<&DatabaseEntry>,
) -> Resolution {
    if current == target || base == target {
        Resolution::Clean(current.cloned())
    } else if base == current {
        Resolution::Clean(target.cloned())
    } else {
        Resolution::Conflict {
            current: current.cloned(),
            target: target.cloned(),
        }
    }
}

/// Working-file content for a conflicted path: both versions between markers.
/// A side that lacks a final newline gets one so markers start on their own line.
pub fn conflict_markers(current: &[u8], target: &[u8], target_name: &str) -> Vec<u8> {
    let mut content = Vec::with_capacity(current.len() + target.len() + 64);

    content.extend_from_slice(b"<<<<<<< HEAD\n");
    push_with_newline(&mut content, current);
    content.extend_from_slice(b"=======\n");
    push_with_newline(&mut content, target);
    content.extend_from_slice(format!(">>>>>>> {target_name}\n").as_bytes());

    content
}

fn push_with_newline(content: &mut Vec<u8>, side: &[u8]) {
    content.extend_from_slice(side);
    if !side.is_empty() && !side.ends_with(b"\n") {
        content.push(b'\n');
    }
}

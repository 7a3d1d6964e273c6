use colored::{ColoredString, Colorize};

/// Width of the long-format labels, e.g. `new file:   `
const LABEL_WIDTH: usize = 12;

/// Difference between the index and the working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WorkspaceChangeType {
    #[default]
    None,
    Modified,
    Deleted,
}

impl WorkspaceChangeType {
    pub fn code(&self) -> char {
        match self {
            WorkspaceChangeType::None => ' ',
            WorkspaceChangeType::Modified => 'M',
            WorkspaceChangeType::Deleted => 'D',
        }
    }

    pub fn label(&self) -> ColoredString {
        let label = match self {
            WorkspaceChangeType::None => "",
            WorkspaceChangeType::Modified => "modified:",
            WorkspaceChangeType::Deleted => "deleted:",
        };
        format!("{label:<LABEL_WIDTH$}").red()
    }
}

/// Difference between the HEAD tree and the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum IndexChangeType {
    #[default]
    None,
    Added,
    Modified,
    Deleted,
}

impl IndexChangeType {
    pub fn code(&self) -> char {
        match self {
            IndexChangeType::None => ' ',
            IndexChangeType::Added => 'A',
            IndexChangeType::Modified => 'M',
            IndexChangeType::Deleted => 'D',
        }
    }

    pub fn label(&self) -> ColoredString {
        let label = match self {
            IndexChangeType::None => "",
            IndexChangeType::Added => "new file:",
            IndexChangeType::Modified => "modified:",
            IndexChangeType::Deleted => "deleted:",
        };
        format!("{label:<LABEL_WIDTH$}").green()
    }
}

/// Both sides of a tracked path's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FileChange {
    pub index_change: IndexChangeType,
    pub workspace_change: WorkspaceChangeType,
}

impl FileChange {
    pub fn is_unchanged(&self) -> bool {
        self.index_change == IndexChangeType::None
            && self.workspace_change == WorkspaceChangeType::None
    }
}

/// Two-letter porcelain code, index side first.
impl std::fmt::Display for FileChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}",
            self.index_change.code(),
            self.workspace_change.code()
        )
    }
}

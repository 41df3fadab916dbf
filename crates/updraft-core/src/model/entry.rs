use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Operation kind, independent of the fields each operation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Create a file from a staged source.
    Create,
    /// Delete a file or directory.
    Delete,
    /// Patch a file in place with a staged binary diff.
    Modify,
    /// Move a file to a new location.
    Rename,
}

impl OpKind {
    /// Single-character script code.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Create => 'C',
            Self::Delete => 'D',
            Self::Modify => 'M',
            Self::Rename => 'R',
        }
    }

    /// Resolve a script op field. The field must be exactly one known character.
    #[must_use]
    pub fn from_code(field: &str) -> Option<Self> {
        match field {
            "C" => Some(Self::Create),
            "D" => Some(Self::Delete),
            "M" => Some(Self::Modify),
            "R" => Some(Self::Rename),
            _ => None,
        }
    }

    /// Stable lowercase label for logs and output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Modify => "modify",
            Self::Rename => "rename",
        }
    }

    /// Minimum number of space-separated fields, op code included.
    #[must_use]
    pub const fn min_fields(self) -> usize {
        match self {
            Self::Create | Self::Modify => 4,
            Self::Rename => 3,
            Self::Delete => 2,
        }
    }
}

impl Display for OpKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Payload already downloaded to the staging area for a Create or Modify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedPayload {
    /// Remote field exactly as written in the script.
    pub remote: String,
    /// Resolved location of the staged bytes.
    pub staged_path: PathBuf,
    /// Expected MD5 hex digest of the staged bytes.
    pub checksum: String,
}

/// Operation plus its operation-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Copy the staged source to `local`.
    Create(StagedPayload),
    /// Remove `local`.
    Delete,
    /// Apply the staged diff to `local`.
    Modify(StagedPayload),
    /// Move `local` to `destination`.
    Rename {
        /// Destination field exactly as written in the script.
        relative: String,
        /// Destination rooted under the install root.
        destination: PathBuf,
    },
}

impl Operation {
    /// Kind of this operation.
    #[must_use]
    pub const fn kind(&self) -> OpKind {
        match self {
            Self::Create(_) => OpKind::Create,
            Self::Delete => OpKind::Delete,
            Self::Modify(_) => OpKind::Modify,
            Self::Rename { .. } => OpKind::Rename,
        }
    }
}

/// One file-system operation within a repository.
///
/// Two entries are equal when they share an operation kind and a local path;
/// the remaining fields do not participate.
#[derive(Debug, Clone, Serialize)]
pub struct ChangesetEntry {
    relative: String,
    local: PathBuf,
    operation: Operation,
}

impl ChangesetEntry {
    /// Build an entry from its script-relative path, its rooted path and its operation.
    #[must_use]
    pub fn new(relative: impl Into<String>, local: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            relative: relative.into(),
            local: local.into(),
            operation,
        }
    }

    /// Operation kind.
    #[must_use]
    pub const fn kind(&self) -> OpKind {
        self.operation.kind()
    }

    /// Operation with its fields.
    #[must_use]
    pub const fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Local path rooted under the install root.
    #[must_use]
    pub fn local(&self) -> &Path {
        &self.local
    }

    /// Local path exactly as written in the script.
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Staged payload for Create and Modify entries.
    #[must_use]
    pub const fn payload(&self) -> Option<&StagedPayload> {
        match &self.operation {
            Operation::Create(payload) | Operation::Modify(payload) => Some(payload),
            Operation::Delete | Operation::Rename { .. } => None,
        }
    }

    /// Resolved staging path, absent for Delete and Rename.
    #[must_use]
    pub fn staged_path(&self) -> Option<&Path> {
        self.payload().map(|payload| payload.staged_path.as_path())
    }

    /// Expected checksum, absent for Delete and Rename.
    #[must_use]
    pub fn checksum(&self) -> Option<&str> {
        self.payload().map(|payload| payload.checksum.as_str())
    }
}

impl PartialEq for ChangesetEntry {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.local == other.local
    }
}

impl Eq for ChangesetEntry {}

/// Renders the entry as its patch-script line.
impl Display for ChangesetEntry {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {}", self.kind().code(), self.relative)?;
        match &self.operation {
            Operation::Create(payload) | Operation::Modify(payload) => {
                write!(formatter, " {} {}", payload.remote, payload.checksum)
            }
            Operation::Rename { relative, .. } => write!(formatter, " {relative}"),
            Operation::Delete => Ok(()),
        }
    }
}

//! # Design
//!
//! - Provide structured, constant-message errors for the patch engine.
//! - Expected filesystem conditions are variants, never panics.
//! - Engine errors carry the repository version and the entry's script line.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use updraft_core::{CoreError, Version};

use crate::diff::DiffError;

/// Result type for a single processor step.
pub type OperationResult<T> = Result<T, OperationError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Outcome of validating or committing one changeset entry.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The path an operation would create is already present.
    #[error("target already exists")]
    AlreadyExists {
        /// Offending path.
        path: PathBuf,
    },
    /// A path the operation requires is missing.
    #[error("required path not found")]
    NotFound {
        /// Missing path.
        path: PathBuf,
    },
    /// A staged payload does not hash to the digest recorded in the script.
    #[error("staged payload checksum mismatch")]
    ChecksumMismatch {
        /// Staged payload path.
        path: PathBuf,
        /// Digest recorded in the script.
        expected: String,
        /// Digest of the staged bytes.
        actual: String,
    },
    /// The target exists but cannot be operated on.
    #[error("invalid operation target")]
    InvalidTarget {
        /// Offending path.
        path: PathBuf,
        /// Static reason for the rejection.
        reason: &'static str,
    },
    /// Applying a binary diff failed.
    #[error("binary diff application failed")]
    Diff {
        /// File being patched.
        path: PathBuf,
        /// Underlying diff error.
        source: DiffError,
    },
    /// IO failures while interacting with the filesystem.
    #[error("filesystem operation failed")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Walkdir traversal failures.
    #[error("directory traversal failed")]
    Walkdir {
        /// Operation that triggered the traversal failure.
        operation: &'static str,
        /// Path involved in the traversal failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
}

impl OperationError {
    /// Path the failure refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::AlreadyExists { path }
            | Self::NotFound { path }
            | Self::ChecksumMismatch { path, .. }
            | Self::InvalidTarget { path, .. }
            | Self::Diff { path, .. }
            | Self::Io { path, .. }
            | Self::Walkdir { path, .. } => path,
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Errors that abort a patch run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The patch script could not be read.
    #[error("failed to read patch script")]
    ScriptRead {
        /// Script location.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The patch script could not be resolved into a pending chain.
    #[error("failed to parse patch script")]
    Parse {
        /// Underlying parse error.
        #[from]
        source: CoreError,
    },
    /// An entry failed validation; nothing in its repository was committed.
    #[error("changeset entry failed validation")]
    Validation {
        /// Repository version.
        version: Version,
        /// Entry rendered as its script line.
        entry: String,
        /// Underlying operation error.
        source: OperationError,
    },
    /// An entry failed to commit; earlier entries of the repository may be applied.
    #[error("changeset entry failed to commit")]
    Commit {
        /// Repository version.
        version: Version,
        /// Entry rendered as its script line.
        entry: String,
        /// Underlying operation error.
        source: OperationError,
    },
    /// The installed-version marker could not be written.
    #[error("failed to persist installed-version marker")]
    Marker {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Marker location.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl EngineError {
    pub(crate) fn marker(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Marker {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether the install tree may have been modified before the failure.
    #[must_use]
    pub const fn install_touched(&self) -> bool {
        matches!(self, Self::Commit { .. } | Self::Marker { .. })
    }

    /// Repository version the failure belongs to, when it belongs to one.
    #[must_use]
    pub const fn version(&self) -> Option<Version> {
        match self {
            Self::Validation { version, .. } | Self::Commit { version, .. } => Some(*version),
            Self::ScriptRead { .. } | Self::Parse { .. } | Self::Marker { .. } => None,
        }
    }

    /// Script line of the failing entry, when the failure belongs to one.
    #[must_use]
    pub fn entry(&self) -> Option<&str> {
        match self {
            Self::Validation { entry, .. } | Self::Commit { entry, .. } => Some(entry),
            Self::ScriptRead { .. } | Self::Parse { .. } | Self::Marker { .. } => None,
        }
    }

    /// Underlying operation error for validation and commit failures.
    #[must_use]
    pub const fn operation_error(&self) -> Option<&OperationError> {
        match self {
            Self::Validation { source, .. } | Self::Commit { source, .. } => Some(source),
            Self::ScriptRead { .. } | Self::Parse { .. } | Self::Marker { .. } => None,
        }
    }
}

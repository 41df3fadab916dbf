//! Error types for the core data model and script parsing.
//!
//! # Design
//!
//! - Constant messages; the offending value, line, or path is carried in fields.
//! - Malformed entry lines are not errors: the parser skips them and reports
//!   them as diagnostics. Only chain-level problems surface here.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::version::Version;

/// Convenience alias for core results.
pub type CoreResult<T> = Result<T, CoreError>;

/// A version string did not match `VERSION MAJOR.MINOR.BUILD`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed version string")]
pub struct VersionFormatError {
    /// Input that failed to parse.
    pub value: String,
    /// Static reason for the failure.
    pub reason: &'static str,
}

impl VersionFormatError {
    pub(crate) fn new(value: impl Into<String>, reason: &'static str) -> Self {
        Self {
            value: value.into(),
            reason,
        }
    }
}

/// Errors produced while building the pending repository chain.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A standalone version string was malformed.
    #[error(transparent)]
    VersionFormat(#[from] VersionFormatError),
    /// A version header line in the script was malformed.
    #[error("malformed version header")]
    Header {
        /// One-based script line number.
        line: usize,
        /// Underlying version parse failure.
        #[source]
        source: VersionFormatError,
    },
    /// The installed version never appeared in the script.
    #[error("installed version not found in patch script")]
    VersionNotFound {
        /// Version read from the installed marker.
        installed: Version,
    },
    /// The same pending version was declared twice.
    #[error("duplicate version header in patch script")]
    DuplicateVersion {
        /// One-based script line number of the repeat.
        line: usize,
        /// Version that was repeated.
        version: Version,
    },
    /// A pending header is not newer than the installed version.
    #[error("pending version is not newer than the installed version")]
    StaleVersion {
        /// One-based script line number.
        line: usize,
        /// Version declared by the header.
        version: Version,
        /// Version read from the installed marker.
        installed: Version,
    },
    /// Staging directory preparation failed.
    #[error("staging io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl CoreError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn header_error_preserves_version_source() {
        let err = CoreError::Header {
            line: 3,
            source: VersionFormatError::new("VERSION 1.2", "expected three components"),
        };
        let source = err.source().expect("header errors carry their source");
        assert_eq!(source.to_string(), "malformed version string");
        assert_eq!(err.to_string(), "malformed version header");
    }

    #[test]
    fn io_helper_builds_variant() {
        let err = CoreError::io("create_staging", "/tmp/stage", io::Error::other("io"));
        assert!(matches!(err, CoreError::Io { operation: "create_staging", .. }));
        assert!(err.source().is_some());
    }
}

//! Binary-diff capability consumed by Modify entries.
//!
//! The engine only sequences the files around a diff; producing new bytes
//! from old bytes plus a diff is delegated to a [`DiffApplier`].

use std::fmt::Debug;
use std::io::{self, Cursor};

use qbsdiff::Bspatch;
use thiserror::Error;

/// Failure reported by a diff applier.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The diff payload is not in the expected encoding.
    #[error("malformed diff payload")]
    Malformed {
        /// Underlying decode error.
        source: io::Error,
    },
    /// The diff could not be applied to the given bytes.
    #[error("diff does not apply to source bytes")]
    Apply {
        /// Underlying apply error.
        source: io::Error,
    },
}

/// Produces new bytes from old bytes and a binary diff.
pub trait DiffApplier: Debug + Send + Sync {
    /// Apply `diff` to `old`.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError`] when the diff is malformed or does not apply.
    fn apply(&self, old: &[u8], diff: &[u8]) -> Result<Vec<u8>, DiffError>;
}

/// Applier for bsdiff 4.x payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BsdiffApplier;

impl DiffApplier for BsdiffApplier {
    fn apply(&self, old: &[u8], diff: &[u8]) -> Result<Vec<u8>, DiffError> {
        let patcher = Bspatch::new(diff).map_err(|source| DiffError::Malformed { source })?;
        let mut patched = Vec::with_capacity(usize::try_from(patcher.hint_target_size()).unwrap_or(0));
        patcher
            .apply(old, Cursor::new(&mut patched))
            .map_err(|source| DiffError::Apply { source })?;
        Ok(patched)
    }
}

//! Staged payload digests.

use std::fs::File;
use std::io;
use std::path::Path;

use md5::{Digest, Md5};

use crate::error::{OperationError, OperationResult};

/// Lowercase MD5 hex digest of the file at `path`.
///
/// # Errors
///
/// Returns [`OperationError::Io`] when the file cannot be read.
pub fn md5_file(path: &Path) -> OperationResult<String> {
    let mut file = File::open(path).map_err(|source| OperationError::io("checksum.open", path, source))?;
    let mut hasher = Md5::new();
    io::copy(&mut file, &mut hasher).map_err(|source| OperationError::io("checksum.read", path, source))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Check that `path` hashes to `expected`, compared case-insensitively.
///
/// # Errors
///
/// Returns [`OperationError::ChecksumMismatch`] on a mismatch and
/// [`OperationError::Io`] when the file cannot be read.
pub fn verify(path: &Path, expected: &str) -> OperationResult<()> {
    let actual = md5_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }
    Err(OperationError::ChecksumMismatch {
        path: path.to_path_buf(),
        expected: expected.to_string(),
        actual,
    })
}

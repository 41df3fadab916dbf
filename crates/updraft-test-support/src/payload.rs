//! Payload helpers: the editor-side half of the staged payload contract.

use std::io::Cursor;

use anyhow::Result;
use md5::{Digest, Md5};
use qbsdiff::Bsdiff;

/// Lowercase MD5 hex digest of `bytes`.
#[must_use]
pub fn md5_hex(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

/// Produce a bsdiff patch that turns `old` into `new`.
///
/// # Errors
///
/// Returns an error if the diff cannot be encoded.
pub fn make_bsdiff(old: &[u8], new: &[u8]) -> Result<Vec<u8>> {
    let mut patch = Vec::new();
    Bsdiff::new(old, new).compare(Cursor::new(&mut patch))?;
    Ok(patch)
}

//! Operation processors: one validate step and one commit step per operation.
//!
//! Validation never mutates the filesystem. Commit is only called for entries
//! that validated as [`Readiness::Ready`] within the same repository pass.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use updraft_core::{ChangesetEntry, Operation, StagedPayload};
use walkdir::WalkDir;

use crate::checksum;
use crate::diff::DiffApplier;
use crate::error::{OperationError, OperationResult};

const WORK_SUFFIX: &str = ".work";

/// Result of a successful validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Preconditions hold; commit will perform the operation.
    Ready,
    /// The filesystem already reflects this entry; commit is skipped.
    AlreadyApplied,
}

/// Validates and commits changeset entries against the real filesystem.
#[derive(Debug, Clone, Copy)]
pub struct Processor<'a> {
    diff: &'a dyn DiffApplier,
    verify_checksums: bool,
}

impl<'a> Processor<'a> {
    /// Processor applying diffs with `diff`.
    #[must_use]
    pub const fn new(diff: &'a dyn DiffApplier, verify_checksums: bool) -> Self {
        Self {
            diff,
            verify_checksums,
        }
    }

    /// Check the preconditions of `entry` without touching the filesystem.
    ///
    /// # Errors
    ///
    /// - Create: [`OperationError::AlreadyExists`] when the target holds other bytes.
    /// - Delete/Modify/Rename: [`OperationError::NotFound`] when the path is missing.
    /// - Rename: [`OperationError::AlreadyExists`] when the destination is present.
    /// - Modify: [`OperationError::InvalidTarget`] when the target is a directory.
    /// - Rename: [`OperationError::InvalidTarget`] when the destination lies inside the source.
    /// - Create/Modify: [`OperationError::NotFound`] for a missing staged payload and
    ///   [`OperationError::ChecksumMismatch`] when verification is enabled and fails.
    pub fn validate(&self, entry: &ChangesetEntry) -> OperationResult<Readiness> {
        let local = entry.local();
        match entry.operation() {
            Operation::Create(payload) => {
                if path_exists(local) {
                    if same_contents(local, &payload.staged_path)? {
                        return Ok(Readiness::AlreadyApplied);
                    }
                    return Err(OperationError::AlreadyExists {
                        path: local.to_path_buf(),
                    });
                }
                self.validate_payload(payload)?;
            }
            Operation::Delete => require_present(local)?,
            Operation::Modify(payload) => {
                require_present(local)?;
                if local.is_dir() {
                    return Err(OperationError::InvalidTarget {
                        path: local.to_path_buf(),
                        reason: "directory",
                    });
                }
                self.validate_payload(payload)?;
            }
            Operation::Rename { destination, .. } => {
                require_present(local)?;
                if destination.starts_with(local) {
                    return Err(OperationError::InvalidTarget {
                        path: destination.clone(),
                        reason: "inside_source",
                    });
                }
                if path_exists(destination) {
                    return Err(OperationError::AlreadyExists {
                        path: destination.clone(),
                    });
                }
            }
        }
        Ok(Readiness::Ready)
    }

    /// Perform `entry`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Io`] for filesystem failures and
    /// [`OperationError::Diff`] when a Modify diff does not apply.
    pub fn commit(&self, entry: &ChangesetEntry) -> OperationResult<()> {
        let local = entry.local();
        match entry.operation() {
            Operation::Create(payload) => {
                ensure_parent(local, "create.create_parent")?;
                fs::copy(&payload.staged_path, local)
                    .map_err(|source| OperationError::io("create.copy", local, source))?;
            }
            Operation::Delete => remove_path(local)?,
            Operation::Modify(payload) => self.patch_in_place(local, payload)?,
            Operation::Rename { destination, .. } => {
                ensure_parent(destination, "rename.create_parent")?;
                move_path(local, destination)?;
            }
        }
        debug!(op = %entry.kind(), path = %local.display(), "committed entry");
        Ok(())
    }

    fn validate_payload(&self, payload: &StagedPayload) -> OperationResult<()> {
        if !payload.staged_path.is_file() {
            return Err(OperationError::NotFound {
                path: payload.staged_path.clone(),
            });
        }
        if self.verify_checksums {
            checksum::verify(&payload.staged_path, &payload.checksum)?;
        }
        Ok(())
    }

    fn patch_in_place(&self, local: &Path, payload: &StagedPayload) -> OperationResult<()> {
        let work = work_path(&payload.staged_path);
        fs::copy(local, &work).map_err(|source| OperationError::io("modify.copy_work", &work, source))?;

        let old = fs::read(&work).map_err(|source| OperationError::io("modify.read_work", &work, source))?;
        let diff = fs::read(&payload.staged_path)
            .map_err(|source| OperationError::io("modify.read_diff", &payload.staged_path, source))?;
        let patched = self
            .diff
            .apply(&old, &diff)
            .map_err(|source| OperationError::Diff {
                path: local.to_path_buf(),
                source,
            })?;
        fs::write(&work, patched).map_err(|source| OperationError::io("modify.write_work", &work, source))?;

        fs::remove_file(local).map_err(|source| OperationError::io("modify.remove_original", local, source))?;
        move_path(&work, local)
    }
}

fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn require_present(path: &Path) -> OperationResult<()> {
    if path_exists(path) {
        Ok(())
    } else {
        Err(OperationError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

fn same_contents(local: &Path, staged: &Path) -> OperationResult<bool> {
    if !local.is_file() || !staged.is_file() {
        return Ok(false);
    }
    let left = fs::metadata(local).map_err(|source| OperationError::io("create.stat_target", local, source))?;
    let right = fs::metadata(staged).map_err(|source| OperationError::io("create.stat_payload", staged, source))?;
    if left.len() != right.len() {
        return Ok(false);
    }
    let target = fs::read(local).map_err(|source| OperationError::io("create.read_target", local, source))?;
    let payload = fs::read(staged).map_err(|source| OperationError::io("create.read_payload", staged, source))?;
    Ok(target == payload)
}

fn work_path(staged: &Path) -> PathBuf {
    let mut name = OsString::from(staged.as_os_str());
    name.push(WORK_SUFFIX);
    PathBuf::from(name)
}

fn ensure_parent(path: &Path, operation: &'static str) -> OperationResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| OperationError::io(operation, parent, source))?;
    }
    Ok(())
}

fn remove_path(path: &Path) -> OperationResult<()> {
    let metadata =
        fs::symlink_metadata(path).map_err(|source| OperationError::io("delete.stat", path, source))?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(|source| OperationError::io("delete.remove_dir", path, source))
    } else {
        fs::remove_file(path).map_err(|source| OperationError::io("delete.remove_file", path, source))
    }
}

/// Rename `source` to `destination`, copying then removing across filesystems.
fn move_path(source: &Path, destination: &Path) -> OperationResult<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) if rename_err.kind() != io::ErrorKind::CrossesDevices => {
            Err(OperationError::io("move.rename", destination, rename_err))
        }
        Err(rename_err) => {
            debug!(
                source = %source.display(),
                destination = %destination.display(),
                error = %rename_err,
                "rename crosses devices; falling back to copy"
            );
            copy_tree(source, destination)?;
            let cleanup = if source.is_dir() {
                fs::remove_dir_all(source)
            } else {
                fs::remove_file(source)
            };
            match cleanup {
                Err(err) if err.kind() != io::ErrorKind::NotFound => {
                    Err(OperationError::io("move.cleanup", source, err))
                }
                _ => Ok(()),
            }
        }
    }
}

fn copy_tree(source: &Path, destination: &Path) -> OperationResult<()> {
    if source.is_file() {
        ensure_parent(destination, "copy.create_parent")?;
        fs::copy(source, destination)
            .map_err(|source_err| OperationError::io("copy.copy_file", destination, source_err))?;
        return Ok(());
    }

    fs::create_dir_all(destination)
        .map_err(|source_err| OperationError::io("copy.create_dir", destination, source_err))?;

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|source_err| OperationError::walkdir("copy.walk", source, source_err))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| OperationError::InvalidTarget {
                path: entry.path().to_path_buf(),
                reason: "outside_source_tree",
            })?;
        let target_path = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target_path)
                .map_err(|source_err| OperationError::io("copy.create_dir", &target_path, source_err))?;
        } else {
            ensure_parent(&target_path, "copy.create_parent")?;
            fs::copy(entry.path(), &target_path)
                .map_err(|source_err| OperationError::io("copy.copy_entry", &target_path, source_err))?;
        }
    }

    Ok(())
}

//! Installed-version marker store.
//!
//! The marker is a single `VERSION X.Y.Z` line. It is the only durable
//! checkpoint: it moves forward only after a whole repository commits.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use updraft_core::Version;

use crate::error::{EngineError, EngineResult};

/// File-backed record of the version currently on disk.
#[derive(Debug, Clone)]
pub struct VersionMarker {
    path: PathBuf,
}

impl VersionMarker {
    /// Marker stored at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Marker location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the recorded version; `None` when absent or unreadable.
    #[must_use]
    pub fn load(&self) -> Option<Version> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "installed-version marker unreadable");
                return None;
            }
        };
        match Version::parse(text.lines().next().unwrap_or_default()) {
            Ok(version) => Some(version),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "installed-version marker malformed");
                None
            }
        }
    }

    /// Read the recorded version, falling back to `baseline`.
    ///
    /// An absent marker is created with `baseline`; a present but unreadable
    /// one is left in place until the next repository commits.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Marker`] when an absent marker cannot be created.
    pub fn load_or_init(&self, baseline: Version) -> EngineResult<Version> {
        if let Some(version) = self.load() {
            return Ok(version);
        }
        if !self.path.exists() {
            debug!(path = %self.path.display(), %baseline, "writing baseline marker");
            self.persist(baseline)?;
        }
        Ok(baseline)
    }

    /// Record `version`, replacing the marker atomically.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Marker`] when the marker cannot be written.
    pub fn persist(&self, version: Version) -> EngineResult<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| EngineError::marker("marker.create_parent", parent, source))?;
        }
        let staged = self.temp_path();
        fs::write(&staged, format!("{version}\n"))
            .map_err(|source| EngineError::marker("marker.write", &staged, source))?;
        fs::rename(&staged, &self.path)
            .map_err(|source| EngineError::marker("marker.rename", &self.path, source))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| OsString::from("version"), ToOwned::to_owned);
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

//! Layered configuration loading: defaults, JSON document, environment, flags.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{ConfigDocument, Settings};
use crate::validate::{parse_bool, resolve};

/// Environment variable naming the JSON configuration document.
pub const ENV_CONFIG: &str = "UPDRAFT_CONFIG";
/// Environment override for the install root.
pub const ENV_INSTALL_ROOT: &str = "UPDRAFT_INSTALL_ROOT";
/// Environment override for the staging root.
pub const ENV_STAGING_ROOT: &str = "UPDRAFT_STAGING_ROOT";
/// Environment override for the script location.
pub const ENV_SCRIPT: &str = "UPDRAFT_SCRIPT";
/// Environment override for the marker location.
pub const ENV_MARKER: &str = "UPDRAFT_MARKER";
/// Environment override for the baseline version.
pub const ENV_BASELINE_VERSION: &str = "UPDRAFT_BASELINE_VERSION";
/// Environment override for the staging layout.
pub const ENV_LAYOUT: &str = "UPDRAFT_LAYOUT";
/// Environment override for checksum verification.
pub const ENV_VERIFY_CHECKSUMS: &str = "UPDRAFT_VERIFY_CHECKSUMS";
/// Environment override for staging retention.
pub const ENV_KEEP_STAGING: &str = "UPDRAFT_KEEP_STAGING";

/// Read a JSON configuration document. Unknown keys are rejected.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read and
/// [`ConfigError::Document`] when it is not a valid document.
pub fn load_document(path: &Path) -> ConfigResult<ConfigDocument> {
    let raw = fs::read(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| ConfigError::Document {
        path: path.to_path_buf(),
        source,
    })
}

impl ConfigDocument {
    /// Build a layer from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when a boolean variable is malformed.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a layer from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when a boolean variable is malformed.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Ok(Self {
            install_root: read(ENV_INSTALL_ROOT).map(PathBuf::from),
            staging_root: read(ENV_STAGING_ROOT).map(PathBuf::from),
            script_path: read(ENV_SCRIPT).map(PathBuf::from),
            marker_path: read(ENV_MARKER).map(PathBuf::from),
            baseline_version: read(ENV_BASELINE_VERSION),
            layout: read(ENV_LAYOUT),
            verify_checksums: read(ENV_VERIFY_CHECKSUMS)
                .map(|value| parse_bool("verify_checksums", &value))
                .transpose()?,
            keep_staging: read(ENV_KEEP_STAGING)
                .map(|value| parse_bool("keep_staging", &value))
                .transpose()?,
            log_level: None,
            log_format: None,
        })
    }
}

/// Builder that stacks configuration layers and resolves them.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    layers: Vec<ConfigDocument>,
}

impl ConfigLoader {
    /// Start from built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON document as the lowest layer above the defaults.
    #[must_use]
    pub fn with_file(mut self, path: Option<PathBuf>) -> Self {
        self.file = path;
        self
    }

    /// Stack `layer` above everything added so far.
    #[must_use]
    pub fn with_layer(mut self, layer: ConfigDocument) -> Self {
        self.layers.push(layer);
        self
    }

    /// Merge every layer and validate the result.
    ///
    /// # Errors
    ///
    /// Propagates document read/decode failures and validation failures.
    pub fn load(self) -> ConfigResult<Settings> {
        let base = match self.file.as_deref() {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration document");
                load_document(path)?
            }
            None => ConfigDocument::default(),
        };
        let merged = self
            .layers
            .into_iter()
            .fold(base, ConfigDocument::merge);
        resolve(merged)
    }
}

//! Typed configuration models.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use updraft_core::{StagingLayout, Version};

use crate::defaults;

/// Fully resolved settings for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    /// Root prefixed to every local path in the script.
    pub install_root: PathBuf,
    /// Root of the per-version staging directories.
    pub staging_root: PathBuf,
    /// Patch script location.
    pub script_path: PathBuf,
    /// Installed-version marker location.
    pub marker_path: PathBuf,
    /// Version assumed, and written, when the marker is absent or unreadable.
    pub baseline_version: Version,
    /// How payload names map into a staging directory.
    pub layout: StagingLayout,
    /// Verify staged payload digests before committing.
    pub verify_checksums: bool,
    /// Keep staging directories after their repository commits.
    pub keep_staging: bool,
}

impl EngineConfig {
    /// Defaults for an installation rooted at `install_root`.
    #[must_use]
    pub fn for_install_root(install_root: impl Into<PathBuf>) -> Self {
        let install_root = install_root.into();
        let staging_root = defaults::staging_root(&install_root);
        Self {
            script_path: defaults::script_path(&staging_root),
            marker_path: defaults::marker_path(&install_root),
            staging_root,
            install_root,
            baseline_version: defaults::baseline_version(),
            layout: defaults::layout(),
            verify_checksums: true,
            keep_staging: false,
        }
    }

    /// Replace the staging root, moving a default script location along with it.
    #[must_use]
    pub fn with_staging_root(mut self, staging_root: impl Into<PathBuf>) -> Self {
        let staging_root = staging_root.into();
        if self.script_path == defaults::script_path(&self.staging_root) {
            self.script_path = defaults::script_path(&staging_root);
        }
        self.staging_root = staging_root;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_install_root(defaults::install_root())
    }
}

/// Logging preferences carried alongside the engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggingSettings {
    /// Default tracing directive; `RUST_LOG` still wins at runtime.
    pub level: String,
    /// `pretty` or `json`; inferred from the build profile when unset.
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: None,
        }
    }
}

/// Everything a loader resolves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Engine configuration.
    pub engine: EngineConfig,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// One partially specified configuration layer.
///
/// Layers come from a JSON document, the environment and command-line flags;
/// later layers override earlier ones field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    /// Install root override.
    #[serde(default)]
    pub install_root: Option<PathBuf>,
    /// Staging root override.
    #[serde(default)]
    pub staging_root: Option<PathBuf>,
    /// Script location override.
    #[serde(default)]
    pub script_path: Option<PathBuf>,
    /// Marker location override.
    #[serde(default)]
    pub marker_path: Option<PathBuf>,
    /// Baseline version as `MAJOR.MINOR.BUILD`.
    #[serde(default)]
    pub baseline_version: Option<String>,
    /// Staging layout label.
    #[serde(default)]
    pub layout: Option<String>,
    /// Checksum verification toggle.
    #[serde(default)]
    pub verify_checksums: Option<bool>,
    /// Staging retention toggle.
    #[serde(default)]
    pub keep_staging: Option<bool>,
    /// Tracing level.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Log output format.
    #[serde(default)]
    pub log_format: Option<String>,
}

impl ConfigDocument {
    /// Overlay `other` on top of `self`; fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            install_root: other.install_root.or(self.install_root),
            staging_root: other.staging_root.or(self.staging_root),
            script_path: other.script_path.or(self.script_path),
            marker_path: other.marker_path.or(self.marker_path),
            baseline_version: other.baseline_version.or(self.baseline_version),
            layout: other.layout.or(self.layout),
            verify_checksums: other.verify_checksums.or(self.verify_checksums),
            keep_staging: other.keep_staging.or(self.keep_staging),
            log_level: other.log_level.or(self.log_level),
            log_format: other.log_format.or(self.log_format),
        }
    }
}

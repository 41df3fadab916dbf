//! Default locations and values for engine configuration.
//!
//! # Design
//! - Derived paths hang off the install root so a bare `--install-root` is a
//!   complete configuration.

use std::path::{Path, PathBuf};

use updraft_core::{StagingLayout, Version};

/// Directory under the install root holding engine-owned state.
pub const STATE_DIR: &str = ".updraft";
/// Staging directory name below [`STATE_DIR`].
pub const STAGING_DIR: &str = "staging";
/// Patch script file name below the staging root.
pub const SCRIPT_FILE: &str = "patch.txt";
/// Marker file name below [`STATE_DIR`].
pub const MARKER_FILE: &str = "version";
/// Default tracing level.
pub const LOG_LEVEL: &str = "info";

/// Install root used when none is configured.
#[must_use]
pub fn install_root() -> PathBuf {
    PathBuf::from(".")
}

/// Staging root for `install_root`.
#[must_use]
pub fn staging_root(install_root: &Path) -> PathBuf {
    install_root.join(STATE_DIR).join(STAGING_DIR)
}

/// Script location for `staging_root`.
#[must_use]
pub fn script_path(staging_root: &Path) -> PathBuf {
    staging_root.join(SCRIPT_FILE)
}

/// Marker location for `install_root`.
#[must_use]
pub fn marker_path(install_root: &Path) -> PathBuf {
    install_root.join(STATE_DIR).join(MARKER_FILE)
}

/// Version assumed when no marker exists.
#[must_use]
pub const fn baseline_version() -> Version {
    Version::from_parts(0, 0, 0)
}

/// Staging layout used when none is configured.
#[must_use]
pub const fn layout() -> StagingLayout {
    StagingLayout::Flat
}

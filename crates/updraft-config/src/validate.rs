//! Validation helpers and parsing utilities for configuration layers.

use std::path::Path;

use updraft_core::{StagingLayout, Version};

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ConfigDocument, EngineConfig, LoggingSettings, Settings};

/// Log formats the telemetry layer understands.
pub const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

/// Resolve a merged document into validated settings.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when a value fails validation.
pub fn resolve(document: ConfigDocument) -> ConfigResult<Settings> {
    let install_root = document
        .install_root
        .unwrap_or_else(defaults::install_root);
    if install_root.as_os_str().is_empty() {
        return Err(ConfigError::InvalidField {
            field: "install_root",
            reason: "must not be empty",
            value: None,
        });
    }

    let staging_root = document
        .staging_root
        .unwrap_or_else(|| defaults::staging_root(&install_root));
    validate_roots(&install_root, &staging_root)?;

    let engine = EngineConfig {
        script_path: document
            .script_path
            .unwrap_or_else(|| defaults::script_path(&staging_root)),
        marker_path: document
            .marker_path
            .unwrap_or_else(|| defaults::marker_path(&install_root)),
        baseline_version: document
            .baseline_version
            .as_deref()
            .map(parse_version)
            .transpose()?
            .unwrap_or_else(defaults::baseline_version),
        layout: document
            .layout
            .as_deref()
            .map(parse_layout)
            .transpose()?
            .unwrap_or_else(defaults::layout),
        verify_checksums: document.verify_checksums.unwrap_or(true),
        keep_staging: document.keep_staging.unwrap_or(false),
        install_root,
        staging_root,
    };

    let logging = LoggingSettings {
        level: document
            .log_level
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| defaults::LOG_LEVEL.to_string()),
        format: document.log_format.as_deref().map(parse_log_format).transpose()?,
    };

    Ok(Settings { engine, logging })
}

fn validate_roots(install_root: &Path, staging_root: &Path) -> ConfigResult<()> {
    if staging_root.as_os_str().is_empty() {
        return Err(ConfigError::InvalidField {
            field: "staging_root",
            reason: "must not be empty",
            value: None,
        });
    }
    if staging_root == install_root {
        return Err(ConfigError::invalid(
            "staging_root",
            "must differ from install_root",
            staging_root.display().to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn parse_version(value: &str) -> ConfigResult<Version> {
    value
        .parse()
        .map_err(|_| ConfigError::invalid("baseline_version", "must be MAJOR.MINOR.BUILD", value))
}

pub(crate) fn parse_layout(value: &str) -> ConfigResult<StagingLayout> {
    value
        .parse()
        .map_err(|_| ConfigError::invalid("layout", "must be 'flat' or 'mirrored'", value))
}

pub(crate) fn parse_log_format(value: &str) -> ConfigResult<String> {
    let normalized = value.trim().to_ascii_lowercase();
    if LOG_FORMATS.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(ConfigError::invalid(
            "log_format",
            "must be 'pretty' or 'json'",
            value,
        ))
    }
}

pub(crate) fn parse_bool(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(field, "must be a boolean", value)),
    }
}

//! CLI error type and exit-code mapping.

use std::fmt::{self, Display, Formatter};

use updraft_config::ConfigError;
use updraft_core::CoreError;
use updraft_engine::EngineError;

/// CLI-level error type separating bad input, refused runs and failed commits.
#[derive(Debug)]
pub(crate) enum CliError {
    /// Arguments or configuration were invalid.
    Validation(String),
    /// The patch was refused before anything was committed.
    Rejected(anyhow::Error),
    /// A failure after the installation may have been modified.
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Rejected(_) => 3,
            Self::Failure(_) => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Rejected(error) | Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        let message = match &error {
            ConfigError::InvalidField {
                field,
                reason,
                value: Some(value),
            } => format!("invalid configuration field '{field}': {reason} (got '{value}')"),
            ConfigError::InvalidField { field, reason, .. } => {
                format!("invalid configuration field '{field}': {reason}")
            }
            ConfigError::Document { path, .. } | ConfigError::Io { path, .. } => {
                format!("{}: {}", path.display(), error_chain(&error))
            }
        };
        Self::Validation(message)
    }
}

impl From<EngineError> for CliError {
    fn from(error: EngineError) -> Self {
        let context = engine_context(&error);
        let touched = error.install_touched();
        let error = match context {
            Some(context) => anyhow::Error::new(error).context(context),
            None => anyhow::Error::new(error),
        };
        if touched {
            Self::Failure(error)
        } else {
            Self::Rejected(error)
        }
    }
}

/// Location details for an engine failure: repository, entry, path or script line.
fn engine_context(error: &EngineError) -> Option<String> {
    match error {
        EngineError::Validation { version, entry, source } | EngineError::Commit { version, entry, source } => {
            Some(format!(
                "{version}, entry '{entry}', path {}",
                source.path().display()
            ))
        }
        EngineError::ScriptRead { path, .. } | EngineError::Marker { path, .. } => {
            Some(path.display().to_string())
        }
        EngineError::Parse { source } => match source {
            CoreError::Header { line, .. } => Some(format!("line {line}")),
            CoreError::VersionNotFound { installed } => Some(format!("installed {installed}")),
            CoreError::DuplicateVersion { line, version } => Some(format!("line {line}, {version}")),
            CoreError::StaleVersion {
                line,
                version,
                installed,
            } => Some(format!("line {line}, {version}, installed {installed}")),
            CoreError::Io { path, .. } => Some(path.display().to_string()),
            CoreError::VersionFormat(_) => None,
        },
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

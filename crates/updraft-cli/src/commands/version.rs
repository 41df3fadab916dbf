use updraft_config::EngineConfig;
use updraft_engine::VersionMarker;
use updraft_telemetry::build_sha;

use crate::cli::OutputFormat;
use crate::error::CliResult;
use crate::output::{VersionReport, render_version};

/// Reports the installed version without writing a baseline marker.
pub(crate) fn handle_version(config: &EngineConfig, format: OutputFormat) -> CliResult<()> {
    let stored = VersionMarker::new(&config.marker_path).load();
    let report = VersionReport {
        tool: env!("CARGO_PKG_VERSION"),
        build_sha: build_sha().to_string(),
        installed: stored.unwrap_or(config.baseline_version),
        marker_present: stored.is_some(),
    };
    render_version(&report, format)
}

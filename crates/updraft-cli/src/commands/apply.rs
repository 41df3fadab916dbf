use tracing::info;
use updraft_config::EngineConfig;
use updraft_engine::Engine;

use crate::cli::OutputFormat;
use crate::error::CliResult;
use crate::output::render_summary;

pub(crate) fn handle_apply(config: &EngineConfig, format: OutputFormat) -> CliResult<()> {
    let mut engine = Engine::new(config.clone())?;
    engine.validate();
    let summary = engine.run()?;
    info!(
        from = %summary.from,
        to = %summary.to,
        repositories = summary.repositories_applied,
        "apply finished"
    );
    render_summary(&summary, format)
}

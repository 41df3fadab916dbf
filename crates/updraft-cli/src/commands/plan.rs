use updraft_config::EngineConfig;
use updraft_engine::Engine;

use crate::cli::OutputFormat;
use crate::error::CliResult;
use crate::output::render_plan;

pub(crate) fn handle_plan(config: &EngineConfig, format: OutputFormat) -> CliResult<()> {
    let engine = Engine::new(config.clone())?;
    let plan = engine.plan()?;
    render_plan(&plan, format)
}

//! Argument parsing, configuration layering and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use updraft_config::{ConfigDocument, ConfigLoader, Settings};
use updraft_telemetry::{LogFormat, LoggingConfig, build_sha, init_logging};

use crate::commands::{handle_apply, handle_plan, handle_version};
use crate::error::{CliError, CliResult};

/// Parses CLI arguments, executes the requested command and reports failures.
/// Returns the process exit code.
#[must_use]
pub fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() { 2 } else { 0 };
        }
    };

    match execute(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn execute(cli: Cli) -> CliResult<()> {
    let settings = load_settings(&cli)?;
    install_logging(&settings)?;
    debug!(command = command_label(&cli.command), "dispatching command");
    dispatch(&cli.command, &settings, cli.output)
}

pub(crate) fn dispatch(command: &Command, settings: &Settings, output: OutputFormat) -> CliResult<()> {
    match command {
        Command::Apply(_) => handle_apply(&settings.engine, output),
        Command::Plan => handle_plan(&settings.engine, output),
        Command::Version => handle_version(&settings.engine, output),
    }
}

pub(crate) fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let env = ConfigDocument::from_env()?;
    let mut loader = ConfigLoader::new()
        .with_file(cli.config.clone())
        .with_layer(env)
        .with_layer(cli.overrides());
    if let Command::Apply(args) = &cli.command {
        loader = loader.with_layer(args.overrides());
    }
    Ok(loader.load()?)
}

fn install_logging(settings: &Settings) -> CliResult<()> {
    let format = LogFormat::from_label(settings.logging.format.as_deref())
        .map_err(|err| CliError::validation(format!("invalid log format: {err}")))?;
    let config = LoggingConfig {
        level: &settings.logging.level,
        format,
        build_sha: option_env!("UPDRAFT_BUILD_SHA").unwrap_or_else(build_sha),
    };
    init_logging(&config).map_err(CliError::failure)
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Apply(_) => "apply",
        Command::Plan => "plan",
        Command::Version => "version",
    }
}

#[derive(Parser)]
#[command(name = "updraft", about = "Apply versioned patch scripts to an installation")]
pub(crate) struct Cli {
    #[arg(long, global = true, env = "UPDRAFT_CONFIG", help = "JSON configuration document")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Root every script path is placed under")]
    install_root: Option<PathBuf>,
    #[arg(long, global = true, help = "Root of the per-version staging directories")]
    staging_root: Option<PathBuf>,
    #[arg(long, global = true, help = "Patch script location")]
    script: Option<PathBuf>,
    #[arg(long, global = true, help = "Installed-version marker location")]
    marker: Option<PathBuf>,
    #[arg(long, global = true, help = "Version assumed when no marker exists (MAJOR.MINOR.BUILD)")]
    baseline_version: Option<String>,
    #[arg(long, global = true, help = "Staging layout: flat or mirrored")]
    layout: Option<String>,
    #[arg(long, global = true, help = "Default tracing level; RUST_LOG takes precedence")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Log format: pretty or json")]
    log_format: Option<String>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn overrides(&self) -> ConfigDocument {
        ConfigDocument {
            install_root: self.install_root.clone(),
            staging_root: self.staging_root.clone(),
            script_path: self.script.clone(),
            marker_path: self.marker.clone(),
            baseline_version: self.baseline_version.clone(),
            layout: self.layout.clone(),
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            ..ConfigDocument::default()
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Apply every pending repository.
    Apply(ApplyArgs),
    /// Show the pending chain without applying it.
    Plan,
    /// Show the tool version and the installed version.
    Version,
}

#[derive(Args)]
pub(crate) struct ApplyArgs {
    #[arg(long, help = "Keep staging directories after their repository commits")]
    keep_staging: bool,
    #[arg(long, help = "Skip staged payload checksum verification")]
    no_verify: bool,
}

impl ApplyArgs {
    fn overrides(&self) -> ConfigDocument {
        ConfigDocument {
            keep_staging: self.keep_staging.then_some(true),
            verify_checksums: self.no_verify.then_some(false),
            ..ConfigDocument::default()
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

//! Patch run orchestration.
//!
//! A run reads the installed version, resolves the pending chain from the
//! patch script and applies it one repository at a time. Each repository is
//! validated in full before any of its entries is committed, and the marker
//! advances only after every entry of the repository has committed.

use std::fs;
use std::io;

use chrono::Utc;
use tracing::{debug, info, warn};
use updraft_config::EngineConfig;
use updraft_core::{ParsedChain, Repository, ScriptContext, Version, parse_script};
use updraft_telemetry::{record_target, run_span};
use uuid::Uuid;

use crate::diff::{BsdiffApplier, DiffApplier};
use crate::error::{EngineError, EngineResult};
use crate::marker::VersionMarker;
use crate::model::{PatchPlan, RepositoryReport, RunSummary};
use crate::processor::{Processor, Readiness};

/// Applies a patch script to one installation.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    marker: VersionMarker,
    installed: Version,
    diff: Box<dyn DiffApplier>,
    validated: bool,
    completed: Option<RunSummary>,
}

impl Engine {
    /// Engine for `config`, applying diffs as bsdiff payloads.
    ///
    /// Reads the installed-version marker, creating it with the baseline
    /// version when absent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Marker`] when an absent marker cannot be created.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::with_diff_applier(config, Box::new(BsdiffApplier))
    }

    /// Engine for `config` with a custom diff applier.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Marker`] when an absent marker cannot be created.
    pub fn with_diff_applier(config: EngineConfig, diff: Box<dyn DiffApplier>) -> EngineResult<Self> {
        let marker = VersionMarker::new(&config.marker_path);
        let installed = marker.load_or_init(config.baseline_version)?;
        info!(
            %installed,
            install_root = %config.install_root.display(),
            "patch engine ready"
        );
        Ok(Self {
            config,
            marker,
            installed,
            diff,
            validated: false,
            completed: None,
        })
    }

    /// Version currently on disk.
    #[must_use]
    pub const fn installed(&self) -> Version {
        self.installed
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Summary of the completed run, if one has completed.
    #[must_use]
    pub const fn completed(&self) -> Option<&RunSummary> {
        self.completed.as_ref()
    }

    /// Mark the engine ready to run. Idempotent.
    pub fn validate(&mut self) {
        if !self.validated {
            debug!("engine validated");
            self.validated = true;
        }
    }

    /// Resolve the pending chain without touching the install tree.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ScriptRead`] or [`EngineError::Parse`].
    pub fn plan(&self) -> EngineResult<PatchPlan> {
        Ok(PatchPlan {
            installed: self.installed,
            chain: self.parse()?,
        })
    }

    /// Apply every pending repository.
    ///
    /// A second call after a successful run returns the stored summary without
    /// touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns the first failure. Script, parse and validation failures leave
    /// the failing repository untouched; commit failures may leave it partially
    /// applied. The marker always names the last fully committed repository.
    pub fn run(&mut self) -> EngineResult<RunSummary> {
        if let Some(summary) = &self.completed {
            info!(run_id = %summary.run_id, "patch run already completed; skipping");
            return Ok(summary.clone());
        }
        self.validate();

        let run_id = Uuid::new_v4();
        let span = run_span(&run_id, &self.installed);
        let _entered = span.enter();

        let started_at = Utc::now();
        let from = self.installed;
        let chain = self.parse()?;
        if let Some(target) = chain.target() {
            record_target(&target);
        }
        info!(
            repositories = chain.repositories.len(),
            entries = chain.entry_count(),
            skipped_lines = chain.skipped.len(),
            "resolved pending chain"
        );

        let processor = Processor::new(self.diff.as_ref(), self.config.verify_checksums);
        let mut reports = Vec::with_capacity(chain.repositories.len());
        for repository in &chain.repositories {
            let version = repository.version();
            info!(%version, entries = repository.len(), "applying repository");

            let readiness = validate_repository(&processor, repository)?;
            let report = commit_repository(&processor, repository, &readiness)?;

            self.marker.persist(version)?;
            self.installed = version;
            info!(
                %version,
                applied = report.entries_applied,
                skipped = report.entries_skipped,
                "repository committed"
            );

            if !self.config.keep_staging {
                self.remove_staging(repository);
            }
            reports.push(report);
        }

        let summary = RunSummary {
            run_id,
            from,
            to: self.installed,
            repositories_applied: reports.len(),
            entries_applied: reports.iter().map(|report| report.entries_applied).sum(),
            entries_skipped: reports.iter().map(|report| report.entries_skipped).sum(),
            repositories: reports,
            skipped_lines: chain.skipped,
            started_at,
            finished_at: Utc::now(),
        };
        info!(from = %summary.from, to = %summary.to, "patch run completed");
        self.completed = Some(summary.clone());
        Ok(summary)
    }

    fn parse(&self) -> EngineResult<ParsedChain> {
        let path = &self.config.script_path;
        let text = fs::read_to_string(path).map_err(|source| EngineError::ScriptRead {
            path: path.clone(),
            source,
        })?;
        let ctx = ScriptContext {
            installed: self.installed,
            install_root: &self.config.install_root,
            staging_root: &self.config.staging_root,
            layout: self.config.layout,
        };
        Ok(parse_script(&text, &ctx)?)
    }

    fn remove_staging(&self, repository: &Repository) {
        let dir = repository.staging_dir(&self.config.staging_root);
        match fs::remove_dir_all(&dir) {
            Ok(()) => debug!(path = %dir.display(), "removed staging directory"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %dir.display(),
                error = %err,
                "failed to remove staging directory"
            ),
        }
    }
}

fn validate_repository(
    processor: &Processor<'_>,
    repository: &Repository,
) -> EngineResult<Vec<Readiness>> {
    let version = repository.version();
    repository
        .entries()
        .iter()
        .map(|entry| {
            let readiness = processor
                .validate(entry)
                .map_err(|source| EngineError::Validation {
                    version,
                    entry: entry.to_string(),
                    source,
                })?;
            debug!(%version, op = %entry.kind(), path = %entry.local().display(), ?readiness, "validated entry");
            Ok(readiness)
        })
        .collect()
}

fn commit_repository(
    processor: &Processor<'_>,
    repository: &Repository,
    readiness: &[Readiness],
) -> EngineResult<RepositoryReport> {
    let version = repository.version();
    let mut report = RepositoryReport {
        version,
        entries_applied: 0,
        entries_skipped: 0,
    };
    for (entry, state) in repository.entries().iter().zip(readiness) {
        match state {
            Readiness::AlreadyApplied => {
                debug!(%version, op = %entry.kind(), path = %entry.local().display(), "entry already applied");
                report.entries_skipped += 1;
            }
            Readiness::Ready => {
                processor
                    .commit(entry)
                    .map_err(|source| EngineError::Commit {
                        version,
                        entry: entry.to_string(),
                        source,
                    })?;
                report.entries_applied += 1;
            }
        }
    }
    Ok(report)
}

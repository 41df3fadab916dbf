//! Run outcomes reported by the engine.
//!
//! # Design
//! - Summaries are plain data; rendering is the caller's concern.
//! - Everything serialises so the CLI can emit JSON without mirror types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use updraft_core::{ParsedChain, SkippedLine, Version};
use uuid::Uuid;

/// Counts for one committed repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReport {
    /// Repository version.
    pub version: Version,
    /// Entries whose commit step ran.
    pub entries_applied: usize,
    /// Entries that were already reflected on disk.
    pub entries_skipped: usize,
}

/// Outcome of a successful patch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Identifier shared with every log line of the run.
    pub run_id: Uuid,
    /// Version on disk when the run started.
    pub from: Version,
    /// Version on disk when the run finished.
    pub to: Version,
    /// Number of repositories committed.
    pub repositories_applied: usize,
    /// Entries whose commit step ran, across all repositories.
    pub entries_applied: usize,
    /// Entries skipped as already applied, across all repositories.
    pub entries_skipped: usize,
    /// Per-repository counts in application order.
    pub repositories: Vec<RepositoryReport>,
    /// Script lines the parser ignored.
    pub skipped_lines: Vec<SkippedLine>,
    /// Run start.
    pub started_at: DateTime<Utc>,
    /// Run end.
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Whether the run changed the installed version.
    #[must_use]
    pub fn advanced(&self) -> bool {
        self.to > self.from
    }
}

/// What a run would apply, without applying it.
#[derive(Debug, Serialize)]
pub struct PatchPlan {
    /// Version currently on disk.
    pub installed: Version,
    /// Pending repositories and parse diagnostics.
    pub chain: ParsedChain,
}

impl PatchPlan {
    /// Version the installation reaches once every pending repository commits.
    #[must_use]
    pub fn target(&self) -> Version {
        self.chain.target().unwrap_or(self.installed)
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.chain.repositories.is_empty()
    }
}

//! Span helpers for patch runs.

use std::fmt::Display;

use tracing::Span;

use crate::init::build_sha;

/// Span wrapping one patch run; every engine log line is emitted inside it.
#[must_use]
pub fn run_span(run_id: &dyn Display, installed: &dyn Display) -> Span {
    tracing::info_span!(
        "patch_run",
        run_id = %run_id,
        installed = %installed,
        build_sha = %build_sha(),
        target_version = tracing::field::Empty,
    )
}

/// Record the newest version a run is heading to on the current span.
pub fn record_target(version: &dyn Display) {
    Span::current().record("target_version", tracing::field::display(version));
}

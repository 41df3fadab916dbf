//! Patch engine: applies a chain of versioned changesets to an installation.
#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

//! Layout: `engine.rs` (run orchestration), `processor.rs` (per-operation
//! validate/commit), `marker.rs` (installed-version marker), `diff.rs`
//! (binary-diff capability), `checksum.rs` (payload digests), `model/`
//! (run summaries and plans), `error.rs`.

pub mod checksum;
pub mod diff;
pub mod engine;
pub mod error;
pub mod marker;
pub mod model;
pub mod processor;

pub use diff::{BsdiffApplier, DiffApplier, DiffError};
pub use engine::Engine;
pub use error::{EngineError, EngineResult, OperationError, OperationResult};
pub use marker::VersionMarker;
pub use model::{PatchPlan, RepositoryReport, RunSummary};
pub use processor::{Processor, Readiness};

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

//! Logging setup and span helpers shared across the updraft workspace.
//!
//! Layout: `init.rs` (subscriber installation and build identifier),
//! `context.rs` (patch-run spans), `error.rs`.

pub mod context;
pub mod error;
pub mod init;

pub use context::{record_target, run_span};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};

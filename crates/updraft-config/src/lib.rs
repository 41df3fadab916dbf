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

//! Layered configuration for the updraft patch engine.
//!
//! Layout: `model.rs` (typed settings and partial layers), `defaults.rs`
//! (derived default locations), `loader.rs` (JSON document and environment
//! layers), `validate.rs` (resolution and field validation), `error.rs`.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_document};
pub use model::{ConfigDocument, EngineConfig, LoggingSettings, Settings};
pub use validate::resolve;

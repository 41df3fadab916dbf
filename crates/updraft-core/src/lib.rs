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

//! Data model and patch-script handling for the updraft patch engine.
//!
//! Layout: `version.rs` (version triple and its renderings), `model/` (changeset
//! entries and repositories), `script.rs` (patch-script parsing into a pending
//! chain), `render.rs` (rendering repositories back to script text), `error.rs`.

pub mod error;
pub mod model;
pub mod render;
pub mod script;
pub mod version;

pub use error::{CoreError, CoreResult, VersionFormatError};
pub use model::{
    ChangesetEntry, OpKind, Operation, Registration, Repository, StagedPayload, StagingLayout,
};
pub use render::render_script;
pub use script::{ParsedChain, ScriptContext, SkipReason, SkippedLine, parse_script};
pub use version::{HEADER_TOKEN, SEPARATOR, Version};

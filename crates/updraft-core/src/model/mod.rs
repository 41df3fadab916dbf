//! Changeset domain types shared by the parser and the engine.
//!
//! # Design
//! - Operations are a closed variant; each variant owns exactly the fields it needs.
//! - Entries carry no presentation state; callers key their own views by `(kind, local)`.

mod entry;
mod repository;

pub use entry::{ChangesetEntry, OpKind, Operation, StagedPayload};
pub use repository::{Registration, Repository, StagingLayout};

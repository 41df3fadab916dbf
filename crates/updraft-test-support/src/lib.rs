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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (temporary install and staging trees), payload.rs (digests and diff payloads).

pub mod fixtures;
pub mod payload;

pub use fixtures::InstallFixture;
pub use payload::{make_bsdiff, md5_hex};

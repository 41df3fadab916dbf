//! Command handlers.

mod apply;
mod plan;
mod version;

pub(crate) use apply::handle_apply;
pub(crate) use plan::handle_plan;
pub(crate) use version::handle_version;

//! Repository layer — entity-scoped database operations.
//!
//! Each sub-module owns one table family; rows are converted into the
//! typed records of `crate::models` here, so callers never see raw strings.

mod application;
mod draft;
mod ledger;
mod package;
mod patient;
mod session;

#[cfg(test)]
pub(crate) mod fixtures;

pub use application::*;
pub use draft::*;
pub use ledger::*;
pub use package::*;
pub use patient::*;
pub use session::*;

//! Daily attendance queue.
//!
//! Same-day sessions are joined with each patient's packages and ledger,
//! collapsed to one entry per patient, then filtered by status and ranked
//! for display: waiting patients first (flagged medication, then arrival
//! order), everyone else by name. Also owns the queue transitions
//! (check-in, removal, start of attendance, walk-in).

mod actions;
mod collation;
mod derive;
mod fetch;
mod ranking;
mod types;

pub use actions::*;
pub use collation::compare_names;
pub use derive::*;
pub use fetch::*;
pub use ranking::*;
pub use types::*;

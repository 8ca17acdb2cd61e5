//! API middleware. The audit logger runs innermost, next to the handlers.

pub mod audit;

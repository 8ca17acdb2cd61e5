//! HTTP endpoint handlers, one module per resource.

pub mod applications;
pub mod financial;
pub mod health;
pub mod patients;
pub mod queue;

//! HTTP service.
//!
//! Routes are nested under `/api/` and wrapped in CORS, a
//! `Cache-Control: no-store` header and the audit logger.
//! `api_router()` returns a composable `Router`; `server` owns the
//! bind/serve/shutdown lifecycle.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, start_server_on, ApiServer};
pub use types::ApiContext;

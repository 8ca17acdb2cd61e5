//! API router.
//!
//! Returns a composable `Router` with every endpoint under `/api/`.
//!
//! Layers (outermost → innermost): CORS → no-store header → audit logger.

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        // Queue
        .route("/queue", get(endpoints::queue::list))
        .route("/queue/checkin", post(endpoints::queue::check_in))
        .route("/queue/remove", post(endpoints::queue::remove))
        .route(
            "/queue/start-attendance",
            post(endpoints::queue::start_attendance),
        )
        .route("/queue/add", post(endpoints::queue::add))
        .route(
            "/sessions/:id/applications/count",
            get(endpoints::queue::application_count),
        )
        // Patients
        .route("/patients/:id", get(endpoints::patients::profile))
        .route("/patients/:id/details", get(endpoints::patients::details))
        .route(
            "/patients/:id/sessions/count",
            get(endpoints::patients::session_count),
        )
        // Applications
        .route(
            "/applications/drafts",
            post(endpoints::applications::create_draft),
        )
        .route(
            "/applications/drafts/:id",
            get(endpoints::applications::get_draft),
        )
        .route("/applications/create", post(endpoints::applications::create))
        // Financial
        .route("/financial/pay", post(endpoints::financial::pay))
        .route("/financial/charge", post(endpoints::financial::charge))
        .route("/financial/:id", get(endpoints::financial::view))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_access));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors)
}

//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub schema_tables: i64,
}

/// `GET /api/health` — service and database reachability.
pub async fn check(
    State(ctx): State<ApiContext>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    let conn = ctx.open_db()?;
    let schema_tables = crate::db::count_tables(&conn)?;

    Ok(Json(ApiResponse::ok(HealthResponse {
        status: "ok".into(),
        version: crate::config::APP_VERSION.into(),
        schema_tables,
    })))
}

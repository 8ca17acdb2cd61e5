//! Patient endpoints.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse, CountResponse};
use crate::db;
use crate::models::Patient;
use crate::patients::{self, PatientDetails};

/// `GET /api/patients/:id`
pub async fn profile(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Patient>>, ApiError> {
    let conn = ctx.open_db()?;
    let patient = db::require_patient(&conn, &id)?;
    Ok(Json(ApiResponse::ok(patient)))
}

/// `GET /api/patients/:id/details`
pub async fn details(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PatientDetails>>, ApiError> {
    let conn = ctx.open_db()?;
    let details = patients::fetch_patient_details(&conn, &id)?;
    Ok(Json(ApiResponse::ok(details)))
}

/// `GET /api/patients/:id/sessions/count`
pub async fn session_count(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let conn = ctx.open_db()?;
    let count = db::count_patient_sessions(&conn, &id)?;
    Ok(Json(ApiResponse::ok(CountResponse { count })))
}

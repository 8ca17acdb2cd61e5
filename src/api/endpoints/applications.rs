//! Application endpoints: drafts and the signed create.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse};
use crate::applications::{self, CreateApplicationRequest, CreatedApplication, DraftRequest};
use crate::models::ApplicationDraft;
use crate::queue;

#[derive(Debug, Serialize, Deserialize)]
pub struct DraftCreatedResponse {
    pub draft_id: Uuid,
}

/// `POST /api/applications/drafts`
pub async fn create_draft(
    State(ctx): State<ApiContext>,
    Json(req): Json<DraftRequest>,
) -> Result<Json<ApiResponse<DraftCreatedResponse>>, ApiError> {
    let conn = ctx.open_db()?;
    let draft = applications::create_draft(&conn, &req, &Utc::now())?;
    Ok(Json(ApiResponse::ok(DraftCreatedResponse { draft_id: draft.id })))
}

/// `GET /api/applications/drafts/:id`
pub async fn get_draft(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApplicationDraft>>, ApiError> {
    let conn = ctx.open_db()?;
    let draft = applications::get_draft(&conn, &id)?;
    Ok(Json(ApiResponse::ok(draft)))
}

/// `POST /api/applications/create`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(req): Json<CreateApplicationRequest>,
) -> Result<Json<ApiResponse<CreatedApplication>>, ApiError> {
    let mut conn = ctx.open_db()?;
    let (from, to) = queue::today_bounds();
    let created = applications::create_application(&mut conn, &req, &Utc::now(), (&from, &to))?;
    Ok(Json(ApiResponse::ok(created)))
}

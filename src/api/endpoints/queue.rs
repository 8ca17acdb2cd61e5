//! Attendance queue endpoints.
//!
//! `GET /api/queue` returns today's deduplicated entries. The mutations
//! take a session id and answer with an empty success envelope; callers
//! refetch the queue afterwards.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{
    AddToQueueRequest, ApiContext, ApiResponse, CountResponse, SessionActionRequest,
};
use crate::db;
use crate::queue::{self, AttendanceRoute, QueueFilter, QueueSnapshot};

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    /// Comma-separated statuses. When present, entries are filtered and
    /// ranked for display.
    pub status: Option<String>,
}

/// `GET /api/queue`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<ApiResponse<QueueSnapshot>>, ApiError> {
    let conn = ctx.open_db()?;
    let (from, to) = queue::today_bounds();
    let mut snapshot = queue::fetch_queue(&conn, &from, &to)?;

    if let Some(raw) = query.status.as_deref() {
        let filter = QueueFilter::parse(raw)?;
        snapshot.entries = queue::rank(&snapshot.entries, &filter);
    }

    Ok(Json(ApiResponse::ok(snapshot)))
}

/// `POST /api/queue/checkin`
pub async fn check_in(
    State(ctx): State<ApiContext>,
    Json(req): Json<SessionActionRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let conn = ctx.open_db()?;
    queue::check_in(&conn, &req.session_id, &Utc::now())?;
    Ok(Json(ApiResponse::ok(())))
}

/// `POST /api/queue/remove`
pub async fn remove(
    State(ctx): State<ApiContext>,
    Json(req): Json<SessionActionRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let conn = ctx.open_db()?;
    queue::remove_from_queue(&conn, &req.session_id)?;
    Ok(Json(ApiResponse::ok(())))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartAttendanceResponse {
    pub route: AttendanceRoute,
    pub application_count: u32,
}

/// `POST /api/queue/start-attendance` — also tells the caller which step
/// comes next.
pub async fn start_attendance(
    State(ctx): State<ApiContext>,
    Json(req): Json<SessionActionRequest>,
) -> Result<Json<ApiResponse<StartAttendanceResponse>>, ApiError> {
    let conn = ctx.open_db()?;
    queue::start_attendance(&conn, &req.session_id)?;
    let plan = queue::attendance_route(&conn, &req.session_id);
    Ok(Json(ApiResponse::ok(StartAttendanceResponse {
        route: plan.route,
        application_count: plan.application_count,
    })))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddToQueueResponse {
    pub session_id: Uuid,
}

/// `POST /api/queue/add`
pub async fn add(
    State(ctx): State<ApiContext>,
    Json(req): Json<AddToQueueRequest>,
) -> Result<Json<ApiResponse<AddToQueueResponse>>, ApiError> {
    let conn = ctx.open_db()?;
    let (from, to) = queue::today_bounds();
    let session_id = queue::add_to_queue(&conn, &req.patient_id, &Utc::now(), (&from, &to))?;
    Ok(Json(ApiResponse::ok(AddToQueueResponse { session_id })))
}

/// `GET /api/sessions/:id/applications/count`
pub async fn application_count(
    State(ctx): State<ApiContext>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let conn = ctx.open_db()?;
    db::require_session(&conn, &session_id)?;
    let count = db::count_session_applications(&conn, &session_id)?;
    Ok(Json(ApiResponse::ok(CountResponse { count })))
}

//! Financial ledger endpoints.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse};
use crate::ledger::{self, ChargeRequest, FinancialView, PaymentRequest};

#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerWriteResponse {
    pub ledger_id: Uuid,
}

/// `GET /api/financial/:id`
pub async fn view(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FinancialView>>, ApiError> {
    let conn = ctx.open_db()?;
    let view = ledger::fetch_financial(&conn, &id)?;
    Ok(Json(ApiResponse::ok(view)))
}

/// `POST /api/financial/pay`
pub async fn pay(
    State(ctx): State<ApiContext>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<ApiResponse<LedgerWriteResponse>>, ApiError> {
    let mut conn = ctx.open_db()?;
    let ledger_id = ledger::record_payment(&mut conn, &req, &Utc::now())?;
    Ok(Json(ApiResponse::ok(LedgerWriteResponse { ledger_id })))
}

/// `POST /api/financial/charge`
pub async fn charge(
    State(ctx): State<ApiContext>,
    Json(req): Json<ChargeRequest>,
) -> Result<Json<ApiResponse<LedgerWriteResponse>>, ApiError> {
    let conn = ctx.open_db()?;
    let ledger_id = ledger::record_charge(&conn, &req, &Utc::now())?;
    Ok(Json(ApiResponse::ok(LedgerWriteResponse { ledger_id })))
}

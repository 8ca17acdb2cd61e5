//! Medication applications: drafts registered during attendance and the
//! signed, transactional write that closes a session.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::enums::{ApplicationKind, ApplicationStatus};
use crate::models::{AdhocApplication, Application, ApplicationDraft, DraftLine, Session};
use crate::signature::{self, SignatureError};

#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

fn invalid(field: &str, value: impl ToString) -> DatabaseError {
    DatabaseError::InvalidInput {
        field: field.into(),
        value: value.to_string(),
    }
}

fn validate_amount(field: &str, amount: f64) -> Result<(), DatabaseError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, amount))
    }
}

fn validate_weight(weight: Option<f64>) -> Result<(), DatabaseError> {
    match weight {
        Some(w) => validate_amount("weight", w),
        None => Ok(()),
    }
}

// ═══════════════════════════════════════════
// Display helpers
// ═══════════════════════════════════════════

/// pt-BR number with at most two decimals and no trailing zeros
/// (`1234.5` → `"1.234,5"`, `2.0` → `"2"`).
pub fn format_number(value: f64) -> String {
    let hundredths = (value.abs() * 100.0).round() as u64;
    let (units, fraction) = (hundredths / 100, hundredths % 100);

    let digits = units.to_string();
    let mut out = String::new();
    if value < 0.0 && hundredths > 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if fraction > 0 {
        let decimals = format!("{fraction:02}");
        out.push(',');
        out.push_str(decimals.trim_end_matches('0'));
    }
    out
}

/// Unit label for an amount. "Aplicação" units agree in number with the
/// amount; any other unit is shown as stored.
pub fn display_unit(unit: &str, amount: f64) -> String {
    let lower = unit.to_lowercase();
    if lower.contains("aplicação") || lower.contains("aplicacao") {
        let label = if amount < 2.0 { "Aplicação" } else { "Aplicações" };
        label.to_string()
    } else {
        unit.to_string()
    }
}

/// Package balance left after this line is applied.
pub fn remaining_preview(line: &DraftLine) -> f64 {
    line.previous_balance - line.amount
}

// ═══════════════════════════════════════════
// Drafts
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub patient_id: Uuid,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub weight: Option<f64>,
    pub lines: Vec<DraftLine>,
}

/// Drafts older than this many hours are dropped whenever a new one is stored.
pub const DRAFT_TTL_HOURS: i64 = 12;

/// Validate and store a pending application. Package lines get their
/// previous balance from the package itself. A new draft replaces any
/// earlier one for the same patient or session.
pub fn create_draft(
    conn: &Connection,
    request: &DraftRequest,
    now: &DateTime<Utc>,
) -> Result<ApplicationDraft, DatabaseError> {
    db::require_patient(conn, &request.patient_id)?;
    if let Some(session_id) = &request.session_id {
        require_open_session(conn, session_id, &request.patient_id)?;
    }
    validate_weight(request.weight)?;
    if request.lines.is_empty() {
        return Err(invalid("lines", "[]"));
    }

    let mut lines = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        validate_amount("lines.amount", line.amount)?;
        let mut line = line.clone();
        match line.kind {
            ApplicationKind::Package => {
                let package_id = line.package_id.ok_or_else(|| invalid("lines.package_id", "null"))?;
                let pkg = db::get_package(conn, &package_id)?.ok_or_else(|| DatabaseError::NotFound {
                    entity_type: "PatientPackage".into(),
                    id: package_id.to_string(),
                })?;
                if pkg.patient_id != request.patient_id {
                    return Err(DatabaseError::ConstraintViolation(format!(
                        "package {package_id} does not belong to patient {}",
                        request.patient_id
                    )));
                }
                line.previous_balance = pkg.remaining_amount;
            }
            ApplicationKind::Adhoc => {
                if line.medication_name.trim().is_empty() {
                    return Err(invalid("lines.medication_name", ""));
                }
                line.package_id = None;
                line.previous_balance = 0.0;
            }
        }
        lines.push(line);
    }

    let draft = ApplicationDraft {
        id: Uuid::new_v4(),
        patient_id: request.patient_id,
        session_id: request.session_id,
        weight: request.weight,
        lines,
        created_at: *now,
    };
    let tx = conn.unchecked_transaction()?;
    let expired = db::delete_drafts_created_before(&tx, &(*now - Duration::hours(DRAFT_TTL_HOURS)))?;
    let superseded = db::delete_superseded_drafts(&tx, &draft.patient_id, draft.session_id.as_ref())?;
    db::insert_draft(&tx, &draft)?;
    tx.commit()?;
    tracing::info!(
        draft_id = %draft.id,
        patient_id = %draft.patient_id,
        lines = draft.lines.len(),
        expired,
        superseded,
        "Application draft stored"
    );
    Ok(draft)
}

pub fn get_draft(conn: &Connection, id: &Uuid) -> Result<ApplicationDraft, DatabaseError> {
    db::get_draft(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "ApplicationDraft".into(),
        id: id.to_string(),
    })
}

// ═══════════════════════════════════════════
// Create
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageApplicationInput {
    pub package_id: Uuid,
    pub amount_applied: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdhocApplicationInput {
    #[serde(default)]
    pub treatment_id: Option<Uuid>,
    pub treatment_name: String,
    pub amount_applied: f64,
    pub treatment_unit: String,
}

/// Body of `POST /api/applications/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateApplicationRequest {
    pub patient_id: Uuid,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub draft_id: Option<Uuid>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub applications_to_save: Vec<PackageApplicationInput>,
    #[serde(default)]
    pub adhoc_applications: Vec<AdhocApplicationInput>,
    pub signature: String,
}

impl CreateApplicationRequest {
    /// Split a draft into package and adhoc lines, ready to submit.
    pub fn from_draft(draft: &ApplicationDraft, signature: impl Into<String>) -> Self {
        let mut applications_to_save = Vec::new();
        let mut adhoc_applications = Vec::new();
        for line in &draft.lines {
            match (line.kind, line.package_id) {
                (ApplicationKind::Package, Some(package_id)) => {
                    applications_to_save.push(PackageApplicationInput {
                        package_id,
                        amount_applied: line.amount,
                    })
                }
                _ => adhoc_applications.push(AdhocApplicationInput {
                    treatment_id: line.treatment_id,
                    treatment_name: line.medication_name.clone(),
                    amount_applied: line.amount,
                    treatment_unit: line.unit.clone(),
                }),
            }
        }
        Self {
            patient_id: draft.patient_id,
            session_id: draft.session_id,
            draft_id: Some(draft.id),
            weight: draft.weight,
            applications_to_save,
            adhoc_applications,
            signature: signature.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedApplication {
    pub session_id: Uuid,
    pub package_applications: usize,
    pub adhoc_applications: usize,
}

/// The session must exist, belong to the patient and still be open.
fn require_open_session(conn: &Connection, session_id: &Uuid, patient_id: &Uuid) -> Result<(), DatabaseError> {
    let session = db::require_session(conn, session_id)?;
    if session.patient_id != Some(*patient_id) {
        return Err(DatabaseError::ConstraintViolation(format!(
            "session {session_id} does not belong to patient {patient_id}"
        )));
    }
    if session.status == ApplicationStatus::Completed {
        return Err(DatabaseError::ConstraintViolation(format!(
            "session {session_id} is already completed"
        )));
    }
    Ok(())
}

fn resolve_session(
    conn: &Connection,
    request: &CreateApplicationRequest,
    now: &DateTime<Utc>,
    day: (&DateTime<Utc>, &DateTime<Utc>),
) -> Result<Uuid, DatabaseError> {
    if let Some(session_id) = request.session_id {
        require_open_session(conn, &session_id, &request.patient_id)?;
        return Ok(session_id);
    }

    if let Some(open) = db::latest_patient_session_between(conn, &request.patient_id, day.0, day.1)?
        .filter(|s| s.status != ApplicationStatus::Completed)
    {
        return Ok(open.id);
    }

    let session = Session {
        id: Uuid::new_v4(),
        patient_id: Some(request.patient_id),
        status: ApplicationStatus::InAttendance,
        check_in_time: Some(*now),
        weight: None,
        created_at: *now,
    };
    db::insert_session(conn, &session)?;
    tracing::info!(patient_id = %request.patient_id, session_id = %session.id, "Created session for unscheduled attendance");
    Ok(session.id)
}

/// Record a signed attendance in one transaction: package balances are
/// drawn down, adhoc items stored, the session closed with weight and
/// signature, and the draft (if any) discarded. Any failure rolls back
/// everything.
pub fn create_application(
    conn: &mut Connection,
    request: &CreateApplicationRequest,
    now: &DateTime<Utc>,
    day: (&DateTime<Utc>, &DateTime<Utc>),
) -> Result<CreatedApplication, ApplicationError> {
    signature::validate_signature(&request.signature)?;
    validate_weight(request.weight)?;
    if request.applications_to_save.is_empty() && request.adhoc_applications.is_empty() {
        return Err(invalid("applications", "[]").into());
    }
    for app in &request.applications_to_save {
        validate_amount("applications_to_save.amount_applied", app.amount_applied)?;
    }
    for app in &request.adhoc_applications {
        validate_amount("adhoc_applications.amount_applied", app.amount_applied)?;
        if app.treatment_name.trim().is_empty() {
            return Err(invalid("adhoc_applications.treatment_name", "").into());
        }
    }
    db::require_patient(conn, &request.patient_id)?;

    let tx = conn.transaction().map_err(DatabaseError::from)?;
    let session_id = resolve_session(&tx, request, now, day)?;

    for app in &request.applications_to_save {
        let remaining =
            db::consume_package_balance(&tx, &app.package_id, &request.patient_id, app.amount_applied)?;
        db::insert_application(
            &tx,
            &Application {
                id: Uuid::new_v4(),
                session_id,
                package_id: app.package_id,
                amount_applied: app.amount_applied,
            },
        )?;
        tracing::debug!(package_id = %app.package_id, remaining, "Package balance drawn");
    }

    for app in &request.adhoc_applications {
        db::insert_adhoc_application(
            &tx,
            &AdhocApplication {
                id: Uuid::new_v4(),
                session_id,
                treatment_id: app.treatment_id,
                treatment_name: app.treatment_name.trim().to_string(),
                amount_applied: app.amount_applied,
                treatment_unit: app.treatment_unit.clone(),
            },
        )?;
    }

    db::complete_session(&tx, &session_id, request.weight, &request.signature)?;
    if let Some(draft_id) = request.draft_id {
        if !db::delete_draft(&tx, &draft_id)? {
            tracing::warn!(%draft_id, "Draft already gone at submit");
        }
    }
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        patient_id = %request.patient_id,
        %session_id,
        package_applications = request.applications_to_save.len(),
        adhoc_applications = request.adhoc_applications.len(),
        "Attendance completed"
    );
    Ok(CreatedApplication {
        session_id,
        package_applications: request.applications_to_save.len(),
        adhoc_applications: request.adhoc_applications.len(),
    })
}

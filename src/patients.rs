//! Patient profile and details view.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, AppliedItem, DatabaseError};
use crate::ledger::{self, BalanceSummary};
use crate::models::enums::ApplicationStatus;
use crate::models::Patient;

const UNNAMED_TREATMENT: &str = "Tratamento";

static BARE_CPF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3})(\d{3})(\d{3})(\d{2})$").expect("static regex"));

/// `"12345678901"` → `"123.456.789-01"`. Anything else is returned as-is.
pub fn format_cpf(cpf: &str) -> String {
    BARE_CPF.replace(cpf.trim(), "$1.$2.$3-$4").into_owned()
}

pub fn balance_caption(balance: f64) -> &'static str {
    if ledger::has_outstanding_debt(balance) {
        "Pagamentos pendentes"
    } else {
        "Tudo em dia"
    }
}

/// Consumption of one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageProgress {
    pub package_id: Uuid,
    pub medication_name: String,
    pub unit: String,
    pub total_amount: f64,
    pub remaining_amount: f64,
    pub consumed: f64,
    pub percent: f64,
}

impl PackageProgress {
    pub fn new(
        package_id: Uuid,
        medication_name: Option<&str>,
        unit: &str,
        total_amount: f64,
        remaining_amount: f64,
    ) -> Self {
        let consumed = total_amount - remaining_amount;
        let percent = if total_amount > 0.0 {
            consumed / total_amount * 100.0
        } else {
            0.0
        };
        Self {
            package_id,
            medication_name: medication_name
                .filter(|n| !n.is_empty())
                .unwrap_or(UNNAMED_TREATMENT)
                .to_string(),
            unit: unit.to_string(),
            total_amount,
            remaining_amount,
            consumed,
            percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistoryEntry {
    /// 1-based; the oldest session is number 1.
    pub number: usize,
    pub session_id: Uuid,
    pub status: ApplicationStatus,
    pub weight: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<AppliedItem>,
}

/// Payload of `GET /api/patients/:id/details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDetails {
    pub patient: Patient,
    pub formatted_cpf: Option<String>,
    pub balance: BalanceSummary,
    pub balance_caption: String,
    pub packages: Vec<PackageProgress>,
    /// Newest first.
    pub sessions: Vec<SessionHistoryEntry>,
}

pub fn fetch_patient_details(conn: &Connection, patient_id: &Uuid) -> Result<PatientDetails, DatabaseError> {
    let patient = db::require_patient(conn, patient_id)?;

    let balance = BalanceSummary::from_amounts(&db::get_ledger_amounts(conn, patient_id)?);

    let packages = db::get_package_summaries(conn, patient_id)?
        .iter()
        .map(|p| {
            PackageProgress::new(
                p.package_id,
                p.medication_name.as_deref(),
                &p.unit,
                p.total_amount,
                p.remaining_amount,
            )
        })
        .collect();

    let sessions = db::get_patient_sessions(conn, patient_id)?;
    let total = sessions.len();
    let mut history = Vec::with_capacity(total);
    for (index, session) in sessions.into_iter().enumerate() {
        history.push(SessionHistoryEntry {
            number: total - index,
            items: db::get_session_items(conn, &session.id)?,
            session_id: session.id,
            status: session.status,
            weight: session.weight,
            created_at: session.created_at,
        });
    }

    Ok(PatientDetails {
        formatted_cpf: patient.cpf.as_deref().map(format_cpf),
        balance_caption: balance_caption(balance.balance).to_string(),
        patient,
        balance,
        packages,
        sessions: history,
    })
}

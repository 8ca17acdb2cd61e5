use std::collections::HashMap;

use uuid::Uuid;

use super::types::{QueueEntry, QueuePatient, QueueRow, QueueSnapshot};
use crate::ledger;
use crate::models::enums::TreatmentStatus;

pub const UNNAMED_PATIENT: &str = "Nome não informado";
pub const MISSING_CPF: &str = "CPF não informado";
pub const NO_ACTIVE_TREATMENT: &str = "Sem tratamento ativo";

/// Build the queue entry for one session of a known patient.
pub fn derive_entry(row: &QueueRow, patient: &QueuePatient) -> QueueEntry {
    let active: Vec<_> = patient.packages.iter().filter(|p| p.is_active()).collect();

    let medications: Vec<&str> = active
        .iter()
        .filter_map(|p| p.medication_name.as_deref())
        .filter(|name| !name.is_empty())
        .collect();
    let treatment_label = if medications.is_empty() {
        NO_ACTIVE_TREATMENT.to_string()
    } else {
        medications.join(" + ")
    };

    let balance = ledger::balance(&patient.ledger_amounts);
    tracing::debug!(
        patient_id = %patient.id,
        ledger_items = patient.ledger_amounts.len(),
        balance,
        "Derived queue entry"
    );

    QueueEntry {
        patient_id: patient.id,
        name: non_blank(patient.full_name.as_deref()).unwrap_or(UNNAMED_PATIENT).to_string(),
        cpf: non_blank(patient.cpf.as_deref()).unwrap_or(MISSING_CPF).to_string(),
        treatment_label,
        treatment_status: if active.is_empty() {
            TreatmentStatus::Inactive
        } else {
            TreatmentStatus::Active
        },
        application_status: row.status,
        has_flagged_medication: active.iter().any(|p| p.is_flagged()),
        has_outstanding_debt: ledger::has_outstanding_debt(balance),
        session_id: row.session_id,
        check_in_time: row.check_in_time,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Turn same-day rows (ascending by creation time) into one entry per patient.
///
/// Later rows overwrite earlier ones, so each patient keeps the most recent
/// session. Rows without a patient are counted and reported, not dropped
/// silently. Entries come out in order of each patient's first appearance.
pub fn build_snapshot(rows: &[QueueRow]) -> QueueSnapshot {
    let mut order: Vec<Uuid> = Vec::new();
    let mut latest: HashMap<Uuid, QueueEntry> = HashMap::new();
    let mut orphaned_sessions = 0u32;

    for row in rows {
        let Some(patient) = &row.patient else {
            orphaned_sessions += 1;
            tracing::warn!(
                session_id = %row.session_id,
                created_at = %row.created_at,
                "Queue session has no linked patient; skipping"
            );
            continue;
        };

        let entry = derive_entry(row, patient);
        if latest.insert(entry.patient_id, entry).is_none() {
            order.push(patient.id);
        }
    }

    let entries = order
        .into_iter()
        .filter_map(|id| latest.remove(&id))
        .collect();

    QueueSnapshot { entries, orphaned_sessions }
}

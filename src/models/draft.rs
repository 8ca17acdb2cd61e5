use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ApplicationKind;

/// One medication the operator registered for the current attendance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftLine {
    pub kind: ApplicationKind,
    /// Set for `package` lines.
    pub package_id: Option<Uuid>,
    pub treatment_id: Option<Uuid>,
    pub medication_name: String,
    pub amount: f64,
    pub unit: String,
    /// Package balance before this application; 0 for adhoc lines.
    #[serde(default)]
    pub previous_balance: f64,
}

/// Pending application held between registration and signature confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub session_id: Option<Uuid>,
    pub weight: Option<f64>,
    pub lines: Vec<DraftLine>,
    pub created_at: DateTime<Utc>,
}

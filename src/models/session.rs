use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ApplicationStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// `None` when the patient link was lost (deleted patient).
    pub patient_id: Option<Uuid>,
    pub status: ApplicationStatus,
    pub check_in_time: Option<DateTime<Utc>>,
    pub weight: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub session_id: Uuid,
    pub package_id: Uuid,
    pub amount_applied: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdhocApplication {
    pub id: Uuid,
    pub session_id: Uuid,
    pub treatment_id: Option<Uuid>,
    pub treatment_name: String,
    pub amount_applied: f64,
    pub treatment_unit: String,
}

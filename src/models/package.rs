use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Treatment type that flags a patient as priority in the waiting queue.
pub const FLAGGED_TREATMENT_TYPE: &str = "Aplicação Longa";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: Uuid,
    pub medication_id: Option<Uuid>,
    pub treatment_type: String,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientPackage {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub treatment_id: Uuid,
    pub total_amount: f64,
    pub remaining_amount: f64,
    pub created_at: DateTime<Utc>,
}

/// A package joined with its treatment and medication name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSummary {
    pub package_id: Uuid,
    pub treatment_id: Uuid,
    pub treatment_type: String,
    pub unit: String,
    pub medication_name: Option<String>,
    pub total_amount: f64,
    pub remaining_amount: f64,
}

impl PackageSummary {
    pub fn is_active(&self) -> bool {
        self.remaining_amount > 0.0
    }

    pub fn is_flagged(&self) -> bool {
        self.treatment_type == FLAGGED_TREATMENT_TYPE
    }
}

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{ApplicationStatus, TreatmentStatus};
use crate::models::PackageSummary;

/// One patient's line in the day's attendance queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub patient_id: Uuid,
    pub name: String,
    pub cpf: String,
    pub treatment_label: String,
    pub treatment_status: TreatmentStatus,
    pub application_status: ApplicationStatus,
    pub has_flagged_medication: bool,
    pub has_outstanding_debt: bool,
    pub session_id: Uuid,
    pub check_in_time: Option<DateTime<Utc>>,
}

/// Patient side of a queue row, as joined from packages and ledger.
#[derive(Debug, Clone)]
pub struct QueuePatient {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub cpf: Option<String>,
    pub packages: Vec<PackageSummary>,
    pub ledger_amounts: Vec<f64>,
}

/// A same-day session joined with its patient. `patient` is `None` when
/// the session lost its patient link.
#[derive(Debug, Clone)]
pub struct QueueRow {
    pub session_id: Uuid,
    pub status: ApplicationStatus,
    pub check_in_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub patient: Option<QueuePatient>,
}

/// Deduplicated queue for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub entries: Vec<QueueEntry>,
    /// Same-day sessions skipped because their patient is missing.
    pub orphaned_sessions: u32,
}

/// Set of statuses the operator chose to see. Empty means "show all".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueFilter {
    statuses: BTreeSet<ApplicationStatus>,
}

impl Default for QueueFilter {
    fn default() -> Self {
        Self::from_statuses(ApplicationStatus::default_filters())
    }
}

impl QueueFilter {
    /// A filter that lets every entry through.
    pub fn all() -> Self {
        Self { statuses: BTreeSet::new() }
    }

    pub fn from_statuses(statuses: impl IntoIterator<Item = ApplicationStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }

    /// Parse a comma-separated status list (`"waiting,scheduled"`).
    pub fn parse(raw: &str) -> Result<Self, crate::db::DatabaseError> {
        let statuses = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<ApplicationStatus>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_statuses(statuses))
    }

    /// Add the status if absent, remove it if present.
    pub fn toggle(&mut self, status: ApplicationStatus) {
        if !self.statuses.remove(&status) {
            self.statuses.insert(status);
        }
    }

    pub fn clear(&mut self) {
        self.statuses.clear();
    }

    pub fn is_active(&self, status: ApplicationStatus) -> bool {
        self.statuses.contains(&status)
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn matches(&self, entry: &QueueEntry) -> bool {
        self.statuses.is_empty() || self.is_active(entry.application_status)
    }

    pub fn statuses(&self) -> impl Iterator<Item = ApplicationStatus> + '_ {
        self.statuses.iter().copied()
    }
}

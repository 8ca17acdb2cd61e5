use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{LedgerEntryType, PaymentMethod};

/// One row of the append-only ledger. Charges are positive, payments negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub amount: f64,
    #[serde(rename = "type")]
    pub entry_type: LedgerEntryType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub payment_methods: Vec<PaymentMethodLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodLine {
    pub method: PaymentMethod,
    pub amount_paid: f64,
    pub installments: Option<u8>,
}

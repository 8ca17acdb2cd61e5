//! Seed helpers shared by the repository and domain tests.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use super::*;
use crate::models::enums::{ApplicationStatus, LedgerEntryType};
use crate::models::*;

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub fn seed_patient(conn: &Connection, name: Option<&str>, cpf: Option<&str>) -> Uuid {
    let id = Uuid::new_v4();
    insert_patient(
        conn,
        &Patient {
            id,
            full_name: name.map(String::from),
            cpf: cpf.map(String::from),
            created_at: at(2026, 1, 1, 8, 0),
        },
    )
    .expect("insert patient");
    id
}

pub fn seed_treatment(
    conn: &Connection,
    medication_name: Option<&str>,
    treatment_type: &str,
    unit: &str,
) -> Uuid {
    let medication_id = medication_name.map(|name| {
        let id = Uuid::new_v4();
        insert_medication(conn, &Medication { id, name: name.into() }).expect("insert medication");
        id
    });
    let id = Uuid::new_v4();
    insert_treatment(
        conn,
        &Treatment {
            id,
            medication_id,
            treatment_type: treatment_type.into(),
            unit: unit.into(),
        },
    )
    .expect("insert treatment");
    id
}

pub fn seed_package(
    conn: &Connection,
    patient_id: Uuid,
    treatment_id: Uuid,
    total: f64,
    remaining: f64,
) -> Uuid {
    let id = Uuid::new_v4();
    insert_package(
        conn,
        &PatientPackage {
            id,
            patient_id,
            treatment_id,
            total_amount: total,
            remaining_amount: remaining,
            created_at: at(2026, 1, 2, 8, 0),
        },
    )
    .expect("insert package");
    id
}

pub fn seed_session(
    conn: &Connection,
    patient_id: Option<Uuid>,
    status: ApplicationStatus,
    created_at: DateTime<Utc>,
    check_in_time: Option<DateTime<Utc>>,
) -> Uuid {
    let id = Uuid::new_v4();
    insert_session(
        conn,
        &Session {
            id,
            patient_id,
            status,
            check_in_time,
            weight: None,
            created_at,
        },
    )
    .expect("insert session");
    id
}

pub fn seed_ledger(conn: &Connection, patient_id: Uuid, amount: f64) -> Uuid {
    let id = Uuid::new_v4();
    let entry_type = if amount < 0.0 {
        LedgerEntryType::Payment
    } else {
        LedgerEntryType::Charge
    };
    insert_ledger_entry(
        conn,
        &LedgerEntry {
            id,
            patient_id,
            amount,
            entry_type,
            description: format!("Lançamento {amount}"),
            created_at: at(2026, 1, 3, 8, 0),
            payment_methods: Vec::new(),
        },
    )
    .expect("insert ledger entry");
    id
}

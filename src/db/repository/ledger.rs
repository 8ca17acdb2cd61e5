use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::enums::{LedgerEntryType, PaymentMethod};
use crate::models::{LedgerEntry, PaymentMethodLine};

/// Insert a ledger row and its payment method breakdown.
/// Callers needing atomicity wrap this in a transaction.
pub fn insert_ledger_entry(conn: &Connection, entry: &LedgerEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO financial_ledger (id, patient_id, amount, type, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.id.to_string(),
            entry.patient_id.to_string(),
            entry.amount,
            entry.entry_type.as_str(),
            entry.description,
            format_timestamp(&entry.created_at),
        ],
    )?;

    for line in &entry.payment_methods {
        conn.execute(
            "INSERT INTO ledger_payment_methods (id, ledger_id, method, amount_paid, installments)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                entry.id.to_string(),
                line.method.as_str(),
                line.amount_paid,
                line.installments,
            ],
        )?;
    }
    Ok(())
}

/// Signed amounts of every ledger row of a patient.
pub fn get_ledger_amounts(conn: &Connection, patient_id: &Uuid) -> Result<Vec<f64>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT amount FROM financial_ledger WHERE patient_id = ?1")?;
    let amounts = stmt
        .query_map(params![patient_id.to_string()], |row| row.get::<_, f64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(amounts)
}

/// Full ledger of a patient, newest first, with payment method lines attached.
pub fn get_ledger_entries(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<LedgerEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, amount, type, description, created_at
         FROM financial_ledger WHERE patient_id = ?1
         ORDER BY created_at DESC",
    )?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut method_stmt = conn.prepare(
        "SELECT method, amount_paid, installments
         FROM ledger_payment_methods WHERE ledger_id = ?1",
    )?;

    let mut entries = Vec::with_capacity(rows.len());
    for (id, amount, entry_type, description, created_at) in rows {
        let raw_methods = method_stmt
            .query_map(params![id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Option<u8>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let payment_methods = raw_methods
            .into_iter()
            .map(|(method, amount_paid, installments)| {
                Ok(PaymentMethodLine {
                    method: PaymentMethod::from_str(&method)?,
                    amount_paid,
                    installments,
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        entries.push(LedgerEntry {
            id: parse_uuid("financial_ledger.id", &id)?,
            patient_id: *patient_id,
            amount,
            entry_type: LedgerEntryType::from_str(&entry_type)?,
            description,
            created_at: parse_timestamp("financial_ledger.created_at", &created_at)?,
            payment_methods,
        });
    }
    Ok(entries)
}

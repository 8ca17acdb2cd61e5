use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::Patient;

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, full_name, cpf, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            patient.id.to_string(),
            patient.full_name,
            patient.cpf,
            format_timestamp(&patient.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, full_name, cpf, created_at FROM patients WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, full_name, cpf, created_at)) => Ok(Some(Patient {
            id: parse_uuid("patients.id", &id)?,
            full_name,
            cpf,
            created_at: parse_timestamp("patients.created_at", &created_at)?,
        })),
        None => Ok(None),
    }
}

/// Like `get_patient`, but a missing row is an error.
pub fn require_patient(conn: &Connection, id: &Uuid) -> Result<Patient, DatabaseError> {
    get_patient(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Patient".into(),
        id: id.to_string(),
    })
}

/// Total number of sessions ever recorded for a patient.
pub fn count_patient_sessions(conn: &Connection, patient_id: &Uuid) -> Result<u32, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sessions WHERE patient_id = ?1",
        params![patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

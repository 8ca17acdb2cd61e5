use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use chrono::{DateTime, Utc};

use crate::db::{format_timestamp, DatabaseError};
use crate::models::ApplicationDraft;

pub fn insert_draft(conn: &Connection, draft: &ApplicationDraft) -> Result<(), DatabaseError> {
    let payload = serde_json::to_string(draft)?;
    conn.execute(
        "INSERT INTO application_drafts (id, patient_id, session_id, payload, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            draft.id.to_string(),
            draft.patient_id.to_string(),
            draft.session_id.map(|id| id.to_string()),
            payload,
            format_timestamp(&draft.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_draft(conn: &Connection, id: &Uuid) -> Result<Option<ApplicationDraft>, DatabaseError> {
    let payload = conn
        .query_row(
            "SELECT payload FROM application_drafts WHERE id = ?1",
            params![id.to_string()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    match payload {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Returns whether a draft was removed.
pub fn delete_draft(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM application_drafts WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(deleted > 0)
}

/// Drop drafts created before `cutoff`. Returns how many were removed.
pub fn delete_drafts_created_before(conn: &Connection, cutoff: &DateTime<Utc>) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM application_drafts WHERE created_at < ?1",
        params![format_timestamp(cutoff)],
    )?;
    Ok(deleted)
}

/// Drop every draft held for the patient, plus any draft pointing at
/// `session_id` regardless of patient.
pub fn delete_superseded_drafts(
    conn: &Connection,
    patient_id: &Uuid,
    session_id: Option<&Uuid>,
) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM application_drafts WHERE patient_id = ?1 OR (?2 IS NOT NULL AND session_id = ?2)",
        params![patient_id.to_string(), session_id.map(|id| id.to_string())],
    )?;
    Ok(deleted)
}

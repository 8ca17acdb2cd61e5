use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::enums::ApplicationStatus;
use crate::models::Session;

const SESSION_COLUMNS: &str = "id, patient_id, status, check_in_time, weight, created_at";

struct SessionRow {
    id: String,
    patient_id: Option<String>,
    status: String,
    check_in_time: Option<String>,
    weight: Option<f64>,
    created_at: String,
}

fn session_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<SessionRow, rusqlite::Error> {
    Ok(SessionRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        status: row.get(2)?,
        check_in_time: row.get(3)?,
        weight: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn session_from_row(row: SessionRow) -> Result<Session, DatabaseError> {
    Ok(Session {
        id: parse_uuid("sessions.id", &row.id)?,
        patient_id: row
            .patient_id
            .as_deref()
            .map(|s| parse_uuid("sessions.patient_id", s))
            .transpose()?,
        status: ApplicationStatus::from_str(&row.status)?,
        check_in_time: row
            .check_in_time
            .as_deref()
            .map(|s| parse_timestamp("sessions.check_in_time", s))
            .transpose()?,
        weight: row.weight,
        created_at: parse_timestamp("sessions.created_at", &row.created_at)?,
    })
}

pub fn insert_session(conn: &Connection, session: &Session) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sessions (id, patient_id, status, check_in_time, weight, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            session.id.to_string(),
            session.patient_id.map(|id| id.to_string()),
            session.status.as_str(),
            session.check_in_time.as_ref().map(format_timestamp),
            session.weight,
            format_timestamp(&session.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_session(conn: &Connection, id: &Uuid) -> Result<Option<Session>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
            params![id.to_string()],
            session_row_from_rusqlite,
        )
        .optional()?;
    row.map(session_from_row).transpose()
}

pub fn require_session(conn: &Connection, id: &Uuid) -> Result<Session, DatabaseError> {
    get_session(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Session".into(),
        id: id.to_string(),
    })
}

/// Sessions of a patient, newest first.
pub fn get_patient_sessions(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Session>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE patient_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], session_row_from_rusqlite)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(session_from_row).collect()
}

/// Most recent session of a patient created inside `[from, to]`.
pub fn latest_patient_session_between(
    conn: &Connection,
    patient_id: &Uuid,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> Result<Option<Session>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE patient_id = ?1 AND created_at >= ?2 AND created_at <= ?3
                 ORDER BY created_at DESC LIMIT 1"
            ),
            params![patient_id.to_string(), format_timestamp(from), format_timestamp(to)],
            session_row_from_rusqlite,
        )
        .optional()?;
    row.map(session_from_row).transpose()
}

pub fn set_session_status(
    conn: &Connection,
    id: &Uuid,
    status: ApplicationStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE sessions SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Session".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Move a session to `waiting` and stamp its arrival.
pub fn check_in_session(
    conn: &Connection,
    id: &Uuid,
    at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE sessions SET status = 'waiting', check_in_time = ?1 WHERE id = ?2",
        params![format_timestamp(at), id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Session".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Close a session with the measured weight and the patient's signature.
pub fn complete_session(
    conn: &Connection,
    id: &Uuid,
    weight: Option<f64>,
    signature: &str,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE sessions SET status = 'completed', weight = ?1, signature = ?2 WHERE id = ?3",
        params![weight, signature, id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Session".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn get_session_signature(conn: &Connection, id: &Uuid) -> Result<Option<String>, DatabaseError> {
    let signature = conn
        .query_row(
            "SELECT signature FROM sessions WHERE id = ?1",
            params![id.to_string()],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(signature.flatten())
}

pub fn delete_session(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Session".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Package and adhoc applications already recorded for a session.
pub fn count_session_applications(conn: &Connection, id: &Uuid) -> Result<u32, DatabaseError> {
    let count = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM applications WHERE session_id = ?1)
              + (SELECT COUNT(*) FROM adhoc_applications WHERE session_id = ?1)",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn session_round_trip_keeps_optional_fields() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let id = seed_session(
            &conn,
            Some(patient),
            ApplicationStatus::Waiting,
            at(2026, 3, 2, 8, 0),
            Some(at(2026, 3, 2, 9, 15)),
        );

        let session = require_session(&conn, &id).unwrap();
        assert_eq!(session.patient_id, Some(patient));
        assert_eq!(session.status, ApplicationStatus::Waiting);
        assert_eq!(session.check_in_time, Some(at(2026, 3, 2, 9, 15)));
    }

    #[test]
    fn check_in_sets_waiting_and_time() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let id = seed_session(&conn, Some(patient), ApplicationStatus::Scheduled, at(2026, 3, 2, 7, 0), None);

        check_in_session(&conn, &id, &at(2026, 3, 2, 9, 0)).unwrap();
        let session = require_session(&conn, &id).unwrap();
        assert_eq!(session.status, ApplicationStatus::Waiting);
        assert_eq!(session.check_in_time, Some(at(2026, 3, 2, 9, 0)));
    }

    #[test]
    fn updates_on_missing_session_are_not_found() {
        let conn = open_memory_database().unwrap();
        let id = Uuid::new_v4();
        assert!(matches!(
            set_session_status(&conn, &id, ApplicationStatus::Waiting),
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(delete_session(&conn, &id), Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn latest_session_respects_window() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        seed_session(&conn, Some(patient), ApplicationStatus::Completed, at(2026, 3, 1, 9, 0), None);
        let today = seed_session(&conn, Some(patient), ApplicationStatus::Scheduled, at(2026, 3, 2, 9, 0), None);

        let found = latest_patient_session_between(
            &conn,
            &patient,
            &at(2026, 3, 2, 0, 0),
            &at(2026, 3, 2, 23, 59),
        )
        .unwrap()
        .unwrap();
        assert_eq!(found.id, today);

        let none = latest_patient_session_between(
            &conn,
            &patient,
            &at(2026, 3, 3, 0, 0),
            &at(2026, 3, 3, 23, 59),
        )
        .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn patient_sessions_newest_first() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let old = seed_session(&conn, Some(patient), ApplicationStatus::Completed, at(2026, 2, 1, 9, 0), None);
        let new = seed_session(&conn, Some(patient), ApplicationStatus::Completed, at(2026, 3, 1, 9, 0), None);

        let ids: Vec<Uuid> = get_patient_sessions(&conn, &patient)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![new, old]);
    }
}

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::derive::build_snapshot;
use super::types::{QueuePatient, QueueRow, QueueSnapshot};
use crate::db::{self, format_timestamp, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::enums::ApplicationStatus;

/// UTC bounds of a calendar day in the clinic's local time zone.
pub fn local_day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    let end = day.and_hms_milli_opt(23, 59, 59, 999).unwrap_or_default();
    let to_utc = |naive: chrono::NaiveDateTime| {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    };
    (to_utc(start), to_utc(end))
}

pub fn today_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
    local_day_bounds(Local::now().date_naive())
}

/// Sessions created inside `[from, to]`, ascending by creation time,
/// joined with their patient's packages and ledger amounts.
pub fn load_queue_rows(
    conn: &Connection,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> Result<Vec<QueueRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.status, s.check_in_time, s.created_at, p.id, p.full_name, p.cpf
         FROM sessions s
         LEFT JOIN patients p ON p.id = s.patient_id
         WHERE s.created_at >= ?1 AND s.created_at <= ?2
         ORDER BY s.created_at ASC, s.rowid ASC",
    )?;
    let raw = stmt
        .query_map(params![format_timestamp(from), format_timestamp(to)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut patients: HashMap<Uuid, QueuePatient> = HashMap::new();
    let mut rows = Vec::with_capacity(raw.len());

    for (session_id, status, check_in, created_at, patient_id, full_name, cpf) in raw {
        let patient = match patient_id {
            Some(raw_id) => {
                let id = parse_uuid("patients.id", &raw_id)?;
                if !patients.contains_key(&id) {
                    let loaded = QueuePatient {
                        id,
                        full_name,
                        cpf,
                        packages: db::get_package_summaries(conn, &id)?,
                        ledger_amounts: db::get_ledger_amounts(conn, &id)?,
                    };
                    patients.insert(id, loaded);
                }
                patients.get(&id).cloned()
            }
            None => None,
        };

        rows.push(QueueRow {
            session_id: parse_uuid("sessions.id", &session_id)?,
            status: ApplicationStatus::from_str(&status)?,
            check_in_time: check_in
                .as_deref()
                .map(|s| parse_timestamp("sessions.check_in_time", s))
                .transpose()?,
            created_at: parse_timestamp("sessions.created_at", &created_at)?,
            patient,
        });
    }

    Ok(rows)
}

/// Deduplicated queue for the window.
pub fn fetch_queue(
    conn: &Connection,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> Result<QueueSnapshot, DatabaseError> {
    let rows = load_queue_rows(conn, from, to)?;
    Ok(build_snapshot(&rows))
}

/// Like `fetch_queue`, but a failed load yields an empty queue.
/// The error is logged; recovery is a manual reload.
pub fn fetch_queue_or_empty(
    conn: &Connection,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> QueueSnapshot {
    match fetch_queue(conn, from, to) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load attendance queue");
            QueueSnapshot::default()
        }
    }
}

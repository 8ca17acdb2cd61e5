use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{format_timestamp, DatabaseError};
use crate::models::enums::ApplicationKind;
use crate::models::{AdhocApplication, Application};

/// One administered item as shown in a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedItem {
    pub kind: ApplicationKind,
    pub medication_name: String,
    pub amount_applied: f64,
    pub unit: String,
}

pub fn insert_application(conn: &Connection, app: &Application) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO applications (id, session_id, package_id, amount_applied, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            app.id.to_string(),
            app.session_id.to_string(),
            app.package_id.to_string(),
            app.amount_applied,
            format_timestamp(&Utc::now()),
        ],
    )?;
    Ok(())
}

pub fn insert_adhoc_application(
    conn: &Connection,
    app: &AdhocApplication,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO adhoc_applications (id, session_id, treatment_id, treatment_name,
         amount_applied, treatment_unit, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            app.id.to_string(),
            app.session_id.to_string(),
            app.treatment_id.map(|id| id.to_string()),
            app.treatment_name,
            app.amount_applied,
            app.treatment_unit,
            format_timestamp(&Utc::now()),
        ],
    )?;
    Ok(())
}

/// Package applications first, then adhoc ones, each in insertion order.
pub fn get_session_items(
    conn: &Connection,
    session_id: &Uuid,
) -> Result<Vec<AppliedItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(m.name, 'Desconhecido'), a.amount_applied, COALESCE(t.unit, '')
         FROM applications a
         LEFT JOIN patient_packages pp ON pp.id = a.package_id
         LEFT JOIN treatments t ON t.id = pp.treatment_id
         LEFT JOIN medications m ON m.id = t.medication_id
         WHERE a.session_id = ?1
         ORDER BY a.created_at ASC",
    )?;
    let mut items = stmt
        .query_map(params![session_id.to_string()], |row| {
            Ok(AppliedItem {
                kind: ApplicationKind::Package,
                medication_name: row.get(0)?,
                amount_applied: row.get(1)?,
                unit: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT treatment_name, amount_applied, treatment_unit
         FROM adhoc_applications WHERE session_id = ?1
         ORDER BY created_at ASC",
    )?;
    let adhoc = stmt
        .query_map(params![session_id.to_string()], |row| {
            Ok(AppliedItem {
                kind: ApplicationKind::Adhoc,
                medication_name: row.get(0)?,
                amount_applied: row.get(1)?,
                unit: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    items.extend(adhoc);

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::repository::count_session_applications;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::ApplicationStatus;

    #[test]
    fn session_items_list_package_then_adhoc() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let treatment = seed_treatment(&conn, Some("Ferro"), "Aplicação Longa", "Aplicação");
        let pkg = seed_package(&conn, patient, treatment, 10.0, 9.0);
        let session = seed_session(&conn, Some(patient), ApplicationStatus::InAttendance, at(2026, 3, 2, 9, 0), None);

        insert_adhoc_application(
            &conn,
            &AdhocApplication {
                id: Uuid::new_v4(),
                session_id: session,
                treatment_id: None,
                treatment_name: "Vitamina D".into(),
                amount_applied: 2.0,
                treatment_unit: "ml".into(),
            },
        )
        .unwrap();
        insert_application(
            &conn,
            &Application {
                id: Uuid::new_v4(),
                session_id: session,
                package_id: pkg,
                amount_applied: 1.0,
            },
        )
        .unwrap();

        let items = get_session_items(&conn, &session).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, ApplicationKind::Package);
        assert_eq!(items[0].medication_name, "Ferro");
        assert_eq!(items[1].kind, ApplicationKind::Adhoc);
        assert_eq!(items[1].unit, "ml");
        assert_eq!(count_session_applications(&conn, &session).unwrap(), 2);
    }
}

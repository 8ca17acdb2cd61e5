use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::enums::ApplicationStatus;
use crate::models::Session;

/// Where the operator goes after opening a waiting patient's attendance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceRoute {
    /// No application recorded yet: register medications.
    Registration,
    /// Applications already recorded: collect the patient's signature.
    Signature,
}

impl AttendanceRoute {
    pub fn path(&self, patient_id: &Uuid) -> String {
        match self {
            Self::Registration => format!("/register-application/{patient_id}"),
            Self::Signature => format!("/patient-signature/{patient_id}"),
        }
    }
}

fn conflict(session: &Session, action: &str) -> DatabaseError {
    DatabaseError::ConstraintViolation(format!(
        "cannot {action} session {} in status {}",
        session.id, session.status
    ))
}

/// `scheduled → waiting`, stamping the arrival time.
pub fn check_in(conn: &Connection, session_id: &Uuid, now: &DateTime<Utc>) -> Result<(), DatabaseError> {
    let session = db::require_session(conn, session_id)?;
    if session.status != ApplicationStatus::Scheduled {
        return Err(conflict(&session, "check in"));
    }
    db::check_in_session(conn, session_id, now)?;
    tracing::info!(%session_id, "Patient checked in");
    Ok(())
}

/// Take a patient out of today's queue. Sessions with recorded
/// applications are part of the clinical record and stay.
pub fn remove_from_queue(conn: &Connection, session_id: &Uuid) -> Result<(), DatabaseError> {
    let session = db::require_session(conn, session_id)?;
    if session.status == ApplicationStatus::Completed
        || db::count_session_applications(conn, session_id)? > 0
    {
        return Err(conflict(&session, "remove"));
    }
    db::delete_session(conn, session_id)?;
    tracing::info!(%session_id, "Session removed from queue");
    Ok(())
}

/// `waiting → in_attendance`. Repeating it on a session already in
/// attendance is a no-op.
pub fn start_attendance(conn: &Connection, session_id: &Uuid) -> Result<(), DatabaseError> {
    let session = db::require_session(conn, session_id)?;
    match session.status {
        ApplicationStatus::Waiting => {
            db::set_session_status(conn, session_id, ApplicationStatus::InAttendance)?;
            tracing::info!(%session_id, "Attendance started");
            Ok(())
        }
        ApplicationStatus::InAttendance => Ok(()),
        _ => Err(conflict(&session, "start attendance for")),
    }
}

/// Put a walk-in patient straight into today's waiting line.
pub fn add_to_queue(
    conn: &Connection,
    patient_id: &Uuid,
    now: &DateTime<Utc>,
    day: (&DateTime<Utc>, &DateTime<Utc>),
) -> Result<Uuid, DatabaseError> {
    db::require_patient(conn, patient_id)?;

    if let Some(existing) = db::latest_patient_session_between(conn, patient_id, day.0, day.1)? {
        if existing.status != ApplicationStatus::Completed {
            return Err(DatabaseError::ConstraintViolation(format!(
                "patient {patient_id} is already in today's queue (session {})",
                existing.id
            )));
        }
    }

    let session = Session {
        id: Uuid::new_v4(),
        patient_id: Some(*patient_id),
        status: ApplicationStatus::Waiting,
        check_in_time: Some(*now),
        weight: None,
        created_at: *now,
    };
    db::insert_session(conn, &session)?;
    tracing::info!(%patient_id, session_id = %session.id, "Patient added to queue");
    Ok(session.id)
}

/// Next screen plus the application count it was decided from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendancePlan {
    pub route: AttendanceRoute,
    pub application_count: u32,
}

/// Decide the next screen from the applications already recorded.
/// A failed lookup sends the operator to registration with a zero count.
pub fn attendance_route(conn: &Connection, session_id: &Uuid) -> AttendancePlan {
    let application_count = match db::count_session_applications(conn, session_id) {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(%session_id, error = %e, "Application count failed; routing to registration");
            0
        }
    };
    let route = if application_count > 0 {
        AttendanceRoute::Signature
    } else {
        AttendanceRoute::Registration
    };
    AttendancePlan { route, application_count }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Application;

    #[test]
    fn check_in_only_from_scheduled() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let session = seed_session(&conn, Some(patient), ApplicationStatus::Scheduled, at(2026, 3, 2, 7, 0), None);

        check_in(&conn, &session, &at(2026, 3, 2, 9, 0)).unwrap();
        let stored = db::require_session(&conn, &session).unwrap();
        assert_eq!(stored.status, ApplicationStatus::Waiting);

        assert!(matches!(
            check_in(&conn, &session, &at(2026, 3, 2, 9, 5)),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn start_attendance_is_idempotent() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let session = seed_session(&conn, Some(patient), ApplicationStatus::Waiting, at(2026, 3, 2, 7, 0), None);

        start_attendance(&conn, &session).unwrap();
        start_attendance(&conn, &session).unwrap();
        assert_eq!(
            db::require_session(&conn, &session).unwrap().status,
            ApplicationStatus::InAttendance
        );
    }

    #[test]
    fn start_attendance_rejects_scheduled() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let session = seed_session(&conn, Some(patient), ApplicationStatus::Scheduled, at(2026, 3, 2, 7, 0), None);
        assert!(start_attendance(&conn, &session).is_err());
    }

    #[test]
    fn remove_deletes_session_without_applications() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let session = seed_session(&conn, Some(patient), ApplicationStatus::Waiting, at(2026, 3, 2, 7, 0), None);

        remove_from_queue(&conn, &session).unwrap();
        assert!(db::get_session(&conn, &session).unwrap().is_none());
    }

    #[test]
    fn remove_keeps_session_with_applications() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let treatment = seed_treatment(&conn, Some("Ferro"), "Aplicação Longa", "Aplicação");
        let pkg = seed_package(&conn, patient, treatment, 10.0, 10.0);
        let session = seed_session(&conn, Some(patient), ApplicationStatus::InAttendance, at(2026, 3, 2, 7, 0), None);
        db::insert_application(
            &conn,
            &Application { id: Uuid::new_v4(), session_id: session, package_id: pkg, amount_applied: 1.0 },
        )
        .unwrap();

        assert!(remove_from_queue(&conn, &session).is_err());
        let plan = attendance_route(&conn, &session);
        assert_eq!(plan.route, AttendanceRoute::Signature);
        assert_eq!(plan.application_count, 1);
    }

    #[test]
    fn add_to_queue_rejects_duplicate_same_day() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let day = (at(2026, 3, 2, 0, 0), at(2026, 3, 2, 23, 59));

        let session = add_to_queue(&conn, &patient, &at(2026, 3, 2, 9, 0), (&day.0, &day.1)).unwrap();
        let stored = db::require_session(&conn, &session).unwrap();
        assert_eq!(stored.status, ApplicationStatus::Waiting);
        assert_eq!(stored.check_in_time, Some(at(2026, 3, 2, 9, 0)));

        assert!(add_to_queue(&conn, &patient, &at(2026, 3, 2, 9, 30), (&day.0, &day.1)).is_err());
        assert!(add_to_queue(&conn, &Uuid::new_v4(), &at(2026, 3, 2, 9, 30), (&day.0, &day.1)).is_err());
    }

    #[test]
    fn fresh_session_routes_to_registration() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let session = seed_session(&conn, Some(patient), ApplicationStatus::Waiting, at(2026, 3, 2, 7, 0), None);
        assert_eq!(attendance_route(&conn, &session).route, AttendanceRoute::Registration);
        assert_eq!(
            AttendanceRoute::Registration.path(&patient),
            format!("/register-application/{patient}")
        );
    }

    #[test]
    fn failed_count_routes_to_registration_with_zero() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let session = seed_session(&conn, Some(patient), ApplicationStatus::InAttendance, at(2026, 3, 2, 7, 0), None);
        conn.execute_batch("PRAGMA foreign_keys = OFF; DROP TABLE adhoc_applications;").unwrap();

        let plan = attendance_route(&conn, &session);
        assert_eq!(plan, AttendancePlan { route: AttendanceRoute::Registration, application_count: 0 });
    }
}

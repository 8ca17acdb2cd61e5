use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::*;

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medications (id, name) VALUES (?1, ?2)",
        params![med.id.to_string(), med.name],
    )?;
    Ok(())
}

pub fn insert_treatment(conn: &Connection, treatment: &Treatment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO treatments (id, medication_id, type, unit) VALUES (?1, ?2, ?3, ?4)",
        params![
            treatment.id.to_string(),
            treatment.medication_id.map(|id| id.to_string()),
            treatment.treatment_type,
            treatment.unit,
        ],
    )?;
    Ok(())
}

pub fn insert_package(conn: &Connection, pkg: &PatientPackage) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_packages (id, patient_id, treatment_id, total_amount, remaining_amount, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            pkg.id.to_string(),
            pkg.patient_id.to_string(),
            pkg.treatment_id.to_string(),
            pkg.total_amount,
            pkg.remaining_amount,
            format_timestamp(&pkg.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_package(conn: &Connection, id: &Uuid) -> Result<Option<PatientPackage>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, treatment_id, total_amount, remaining_amount, created_at
             FROM patient_packages WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((id, patient_id, treatment_id, total_amount, remaining_amount, created_at)) = row else {
        return Ok(None);
    };
    Ok(Some(PatientPackage {
        id: parse_uuid("patient_packages.id", &id)?,
        patient_id: parse_uuid("patient_packages.patient_id", &patient_id)?,
        treatment_id: parse_uuid("patient_packages.treatment_id", &treatment_id)?,
        total_amount,
        remaining_amount,
        created_at: parse_timestamp("patient_packages.created_at", &created_at)?,
    }))
}

/// All packages of a patient joined with treatment and medication, oldest first.
pub fn get_package_summaries(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PackageSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT pp.id, pp.treatment_id, t.type, t.unit, m.name, pp.total_amount, pp.remaining_amount
         FROM patient_packages pp
         JOIN treatments t ON t.id = pp.treatment_id
         LEFT JOIN medications m ON m.id = t.medication_id
         WHERE pp.patient_id = ?1
         ORDER BY pp.created_at ASC",
    )?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, treatment_id, treatment_type, unit, medication_name, total, remaining)| {
            Ok(PackageSummary {
                package_id: parse_uuid("patient_packages.id", &id)?,
                treatment_id: parse_uuid("patient_packages.treatment_id", &treatment_id)?,
                treatment_type,
                unit,
                medication_name,
                total_amount: total,
                remaining_amount: remaining,
            })
        })
        .collect()
}

/// Draw `amount` from a package balance. Fails without writing when the
/// package does not belong to the patient or the balance is insufficient.
pub fn consume_package_balance(
    conn: &Connection,
    package_id: &Uuid,
    patient_id: &Uuid,
    amount: f64,
) -> Result<f64, DatabaseError> {
    let pkg = get_package(conn, package_id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "PatientPackage".into(),
        id: package_id.to_string(),
    })?;
    if pkg.patient_id != *patient_id {
        return Err(DatabaseError::ConstraintViolation(format!(
            "package {package_id} does not belong to patient {patient_id}"
        )));
    }
    if amount > pkg.remaining_amount + f64::EPSILON {
        return Err(DatabaseError::ConstraintViolation(format!(
            "insufficient package balance: {} remaining, {} requested",
            pkg.remaining_amount, amount
        )));
    }

    let remaining = pkg.remaining_amount - amount;
    conn.execute(
        "UPDATE patient_packages SET remaining_amount = ?1 WHERE id = ?2",
        params![remaining, package_id.to_string()],
    )?;
    Ok(remaining)
}

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::{debug, warn};

use super::errors::RepositoryError;
use super::sql::{new_id, now_rfc3339, Filters};
use crate::database::DatabasePool;
use crate::models::appointment::{AppointmentFilter, AppointmentRecord, NewAppointment};

const COLUMNS: &str = "id, clinic_id, patient_id, doctor_id, appointment_date, start_time, end_time, \
                       status, reason, notes, created_at, updated_at";

/// Repository trait for appointments
#[async_trait]
pub trait AppointmentRepositoryTrait: Send + Sync {
    /// Book an appointment in `scheduled` state; fails with `Conflict` when the doctor
    /// already has a live appointment at the same date and start time
    async fn create(&self, appointment: NewAppointment) -> Result<AppointmentRecord, RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<AppointmentRecord>, RepositoryError>;

    async fn list(&self, filter: AppointmentFilter) -> Result<(Vec<AppointmentRecord>, usize), RepositoryError>;

    /// Save edits to a `scheduled` appointment, re-checking the double-booking rule.
    /// Status is never written here; an appointment that has moved on since it was
    /// read fails with `StaleState`.
    async fn update(&self, record: AppointmentRecord) -> Result<Option<AppointmentRecord>, RepositoryError>;

    /// Move an appointment to `status` if it is currently `expected`
    async fn set_status(&self, id: &str, expected: &str, status: &str) -> Result<AppointmentRecord, RepositoryError>;

    /// Start times already taken by non-cancelled appointments
    async fn booked_start_times(&self, doctor_id: &str, date: &str) -> Result<Vec<String>, RepositoryError>;
}

/// SQLite repository for appointments
#[derive(Debug, Clone)]
pub struct AppointmentRepository {
    pool: DatabasePool,
}

impl AppointmentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<AppointmentRecord> {
    Ok(AppointmentRecord {
        id: row.get("id")?,
        clinic_id: row.get("clinic_id")?,
        patient_id: row.get("patient_id")?,
        doctor_id: row.get("doctor_id")?,
        appointment_date: row.get("appointment_date")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        status: row.get("status")?,
        reason: row.get("reason")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn ensure_slot_free(
    tx: &Transaction<'_>,
    doctor_id: &str,
    date: &str,
    start_time: &str,
    exclude_id: &str,
) -> Result<(), RepositoryError> {
    let taken: Option<String> = tx
        .query_row(
            "SELECT id FROM appointments
             WHERE doctor_id = ?1 AND appointment_date = ?2 AND start_time = ?3
               AND status != 'cancelled' AND id != ?4
             LIMIT 1",
            params![doctor_id, date, start_time, exclude_id],
            |row| row.get(0),
        )
        .optional()?;

    match taken {
        Some(existing) => {
            warn!(
                "Doctor {} already booked on {} at {} (appointment {})",
                doctor_id, date, start_time, existing
            );
            Err(RepositoryError::Conflict(format!(
                "Doctor already has an appointment on {} at {}",
                date, start_time
            )))
        }
        None => Ok(()),
    }
}

#[async_trait]
impl AppointmentRepositoryTrait for AppointmentRepository {
    async fn create(&self, appointment: NewAppointment) -> Result<AppointmentRecord, RepositoryError> {
        let now = now_rfc3339();
        let record = AppointmentRecord {
            id: new_id(),
            clinic_id: appointment.clinic_id,
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            appointment_date: appointment.appointment_date,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
            status: "scheduled".to_string(),
            reason: appointment.reason,
            notes: appointment.notes,
            created_at: now.clone(),
            updated_at: now,
        };
        debug!(
            "Booking appointment {} for doctor {} on {} {}",
            record.id, record.doctor_id, record.appointment_date, record.start_time
        );

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_slot_free(&tx, &record.doctor_id, &record.appointment_date, &record.start_time, &record.id)?;

        tx.execute(
            &format!(
                "INSERT INTO appointments ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                COLUMNS
            ),
            params![
                record.id,
                record.clinic_id,
                record.patient_id,
                record.doctor_id,
                record.appointment_date,
                record.start_time,
                record.end_time,
                record.status,
                record.reason,
                record.notes,
                record.created_at,
                record.updated_at,
            ],
        )?;
        tx.commit()?;
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<AppointmentRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let appointment = conn
            .query_row(&format!("SELECT {} FROM appointments WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(appointment)
    }

    async fn list(&self, filter: AppointmentFilter) -> Result<(Vec<AppointmentRecord>, usize), RepositoryError> {
        let mut filters = Filters::new();
        filters
            .eq_text("clinic_id", filter.clinic_id.as_deref())
            .eq_text("doctor_id", filter.doctor_id.as_deref())
            .eq_text("patient_id", filter.patient_id.as_deref())
            .eq_text("appointment_date", filter.date.as_deref())
            .eq_text("status", filter.status.as_deref());

        let conn = self.pool.get()?;
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM appointments{}", filters.where_sql()),
            params_from_iter(filters.values()),
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM appointments{} ORDER BY appointment_date, start_time LIMIT ? OFFSET ?",
            COLUMNS,
            filters.where_sql()
        ))?;
        let appointments = stmt
            .query_map(params_from_iter(filters.paged_values(filter.limit, filter.offset)), map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((appointments, total as usize))
    }

    async fn update(&self, record: AppointmentRecord) -> Result<Option<AppointmentRecord>, RepositoryError> {
        debug!("Updating appointment: {}", record.id);
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
            .query_row("SELECT status FROM appointments WHERE id = ?1", params![record.id], |row| row.get(0))
            .optional()?;
        match current.as_deref() {
            None => return Ok(None),
            Some("scheduled") => {}
            Some(status) => {
                return Err(RepositoryError::StaleState(format!(
                    "Appointment {} is {}, expected scheduled",
                    record.id, status
                )))
            }
        }

        ensure_slot_free(&tx, &record.doctor_id, &record.appointment_date, &record.start_time, &record.id)?;

        tx.execute(
            "UPDATE appointments SET doctor_id = ?1, appointment_date = ?2, start_time = ?3, end_time = ?4,
                    reason = ?5, notes = ?6, updated_at = ?7
             WHERE id = ?8 AND status = 'scheduled'",
            params![
                record.doctor_id,
                record.appointment_date,
                record.start_time,
                record.end_time,
                record.reason,
                record.notes,
                now_rfc3339(),
                record.id,
            ],
        )?;

        let saved = tx
            .query_row(
                &format!("SELECT {} FROM appointments WHERE id = ?1", COLUMNS),
                params![record.id],
                map_row,
            )
            .optional()?;
        tx.commit()?;
        Ok(saved)
    }

    async fn set_status(&self, id: &str, expected: &str, status: &str) -> Result<AppointmentRecord, RepositoryError> {
        debug!("Appointment {}: {} -> {}", id, expected, status);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            params![status, now_rfc3339(), id, expected],
        )?;

        let current = conn
            .query_row(&format!("SELECT {} FROM appointments WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound(format!("Appointment {}", id)))?;

        if changed == 0 {
            return Err(RepositoryError::StaleState(format!(
                "Appointment {} is {}, expected {}",
                id, current.status, expected
            )));
        }
        Ok(current)
    }

    async fn booked_start_times(&self, doctor_id: &str, date: &str) -> Result<Vec<String>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT start_time FROM appointments
             WHERE doctor_id = ?1 AND appointment_date = ?2 AND status != 'cancelled'
             ORDER BY start_time",
        )?;
        let times = stmt
            .query_map(params![doctor_id, date], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(times)
    }
}

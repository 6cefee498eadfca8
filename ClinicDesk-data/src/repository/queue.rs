//! Patient queue storage
//!
//! Tokens are issued per doctor and day as `MAX(token_number) + 1`. The read and
//! the insert share one `IMMEDIATE` transaction, so a second writer waits for
//! the first to commit, and `UNIQUE(doctor_id, queue_date, token_number)` backs
//! this up at the schema level.

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use super::errors::RepositoryError;
use super::sql::{new_id, now_rfc3339};
use crate::database::DatabasePool;
use crate::models::queue::{NewQueueEntry, QueueEntryRecord, QueueStatusCount};

const COLUMNS: &str = "id, clinic_id, doctor_id, patient_id, appointment_id, queue_date, token_number, status, \
                       checked_in_at, called_at, completed_at";

/// Repository trait for the patient queue
#[async_trait]
pub trait QueueRepositoryTrait: Send + Sync {
    /// Add a patient to a doctor's queue with the next free token.
    ///
    /// Fails with `Conflict` when the patient is already waiting or in consultation
    /// with that doctor on that date, and with `StaleState` when the linked
    /// appointment is not `scheduled`.
    async fn check_in(&self, entry: NewQueueEntry) -> Result<QueueEntryRecord, RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<QueueEntryRecord>, RepositoryError>;

    /// Entries for a doctor and date ordered by token
    async fn list(&self, doctor_id: &str, queue_date: &str) -> Result<Vec<QueueEntryRecord>, RepositoryError>;

    /// Complete whoever is in consultation and call the lowest waiting token.
    /// Returns `None`, changing nothing, when nobody is waiting.
    async fn call_next(&self, doctor_id: &str, queue_date: &str) -> Result<Option<QueueEntryRecord>, RepositoryError>;

    /// Move an entry from `expected` to `status`, stamping `called_at`/`completed_at`.
    ///
    /// Returning to `waiting` fails with `Conflict` if the patient has since taken
    /// another live token; calling an entry in completes the current consultation.
    async fn update_status(&self, id: &str, expected: &str, status: &str) -> Result<QueueEntryRecord, RepositoryError>;

    /// Entry counts per status
    async fn status_counts(&self, doctor_id: &str, queue_date: &str) -> Result<Vec<QueueStatusCount>, RepositoryError>;
}

/// SQLite repository for the patient queue
#[derive(Debug, Clone)]
pub struct QueueRepository {
    pool: DatabasePool,
}

impl QueueRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<QueueEntryRecord> {
    Ok(QueueEntryRecord {
        id: row.get("id")?,
        clinic_id: row.get("clinic_id")?,
        doctor_id: row.get("doctor_id")?,
        patient_id: row.get("patient_id")?,
        appointment_id: row.get("appointment_id")?,
        queue_date: row.get("queue_date")?,
        token_number: row.get("token_number")?,
        status: row.get("status")?,
        checked_in_at: row.get("checked_in_at")?,
        called_at: row.get("called_at")?,
        completed_at: row.get("completed_at")?,
    })
}

fn fetch(tx: &Transaction<'_>, id: &str) -> Result<Option<QueueEntryRecord>, RepositoryError> {
    let entry = tx
        .query_row(&format!("SELECT {} FROM patient_queue WHERE id = ?1", COLUMNS), params![id], map_row)
        .optional()?;
    Ok(entry)
}

/// Fail with `Conflict` when the patient already holds a live token with this doctor
/// and date. `except` skips the entry being requeued.
fn ensure_not_queued(
    tx: &Transaction<'_>,
    doctor_id: &str,
    queue_date: &str,
    patient_id: &str,
    except: Option<&str>,
) -> Result<(), RepositoryError> {
    let active: Option<u32> = tx
        .query_row(
            "SELECT token_number FROM patient_queue
             WHERE doctor_id = ?1 AND queue_date = ?2 AND patient_id = ?3
               AND status IN ('waiting', 'in_consultation')
               AND id != COALESCE(?4, '')",
            params![doctor_id, queue_date, patient_id, except],
            |row| row.get(0),
        )
        .optional()?;
    match active {
        Some(token) => {
            warn!(
                "Patient {} already queued for doctor {} on {} with token {}",
                patient_id, doctor_id, queue_date, token
            );
            Err(RepositoryError::Conflict(format!(
                "Patient is already in the queue with token {}",
                token
            )))
        }
        None => Ok(()),
    }
}

/// Complete every entry in consultation with this doctor and date, returning how many
fn finish_consultations(
    tx: &Transaction<'_>,
    doctor_id: &str,
    queue_date: &str,
    now: &str,
) -> Result<usize, RepositoryError> {
    let current: Vec<(String, Option<String>)> = {
        let mut stmt = tx.prepare(
            "SELECT id, appointment_id FROM patient_queue
             WHERE doctor_id = ?1 AND queue_date = ?2 AND status = 'in_consultation'",
        )?;
        let rows = stmt
            .query_map(params![doctor_id, queue_date], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    for (id, appointment_id) in &current {
        tx.execute(
            "UPDATE patient_queue SET status = 'completed', completed_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        complete_appointment(tx, appointment_id.as_deref(), now)?;
    }
    Ok(current.len())
}

/// Mark the linked appointment completed once its consultation is over
fn complete_appointment(tx: &Transaction<'_>, appointment_id: Option<&str>, now: &str) -> Result<(), RepositoryError> {
    if let Some(appointment_id) = appointment_id {
        tx.execute(
            "UPDATE appointments SET status = 'completed', updated_at = ?1 WHERE id = ?2 AND status = 'checked_in'",
            params![now, appointment_id],
        )?;
    }
    Ok(())
}

#[async_trait]
impl QueueRepositoryTrait for QueueRepository {
    async fn check_in(&self, entry: NewQueueEntry) -> Result<QueueEntryRecord, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        ensure_not_queued(&tx, &entry.doctor_id, &entry.queue_date, &entry.patient_id, None)?;

        let now = now_rfc3339();
        if let Some(appointment_id) = entry.appointment_id.as_deref() {
            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM appointments WHERE id = ?1 AND patient_id = ?2",
                    params![appointment_id, entry.patient_id],
                    |row| row.get(0),
                )
                .optional()?;
            match status.as_deref() {
                None => {
                    return Err(RepositoryError::NotFound(format!(
                        "Appointment {} for this patient",
                        appointment_id
                    )))
                }
                Some("scheduled") => {
                    tx.execute(
                        "UPDATE appointments SET status = 'checked_in', updated_at = ?1 WHERE id = ?2",
                        params![now, appointment_id],
                    )?;
                }
                Some(other) => {
                    return Err(RepositoryError::StaleState(format!(
                        "Appointment {} is {}, only scheduled appointments can be checked in",
                        appointment_id, other
                    )))
                }
            }
        }

        let last: Option<u32> = tx.query_row(
            "SELECT MAX(token_number) FROM patient_queue WHERE doctor_id = ?1 AND queue_date = ?2",
            params![entry.doctor_id, entry.queue_date],
            |row| row.get(0),
        )?;

        let record = QueueEntryRecord {
            id: new_id(),
            clinic_id: entry.clinic_id,
            doctor_id: entry.doctor_id,
            patient_id: entry.patient_id,
            appointment_id: entry.appointment_id,
            queue_date: entry.queue_date,
            token_number: last.unwrap_or(0) + 1,
            status: "waiting".to_string(),
            checked_in_at: now,
            called_at: None,
            completed_at: None,
        };

        tx.execute(
            &format!(
                "INSERT INTO patient_queue ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                COLUMNS
            ),
            params![
                record.id,
                record.clinic_id,
                record.doctor_id,
                record.patient_id,
                record.appointment_id,
                record.queue_date,
                record.token_number,
                record.status,
                record.checked_in_at,
                record.called_at,
                record.completed_at,
            ],
        )?;
        tx.commit()?;

        info!(
            "Checked in patient {} for doctor {} on {} with token {}",
            record.patient_id, record.doctor_id, record.queue_date, record.token_number
        );
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<QueueEntryRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let entry = conn
            .query_row(&format!("SELECT {} FROM patient_queue WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(entry)
    }

    async fn list(&self, doctor_id: &str, queue_date: &str) -> Result<Vec<QueueEntryRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM patient_queue WHERE doctor_id = ?1 AND queue_date = ?2 ORDER BY token_number",
            COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![doctor_id, queue_date], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn call_next(&self, doctor_id: &str, queue_date: &str) -> Result<Option<QueueEntryRecord>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let next: Option<String> = tx
            .query_row(
                "SELECT id FROM patient_queue
                 WHERE doctor_id = ?1 AND queue_date = ?2 AND status = 'waiting'
                 ORDER BY token_number LIMIT 1",
                params![doctor_id, queue_date],
                |row| row.get(0),
            )
            .optional()?;
        let Some(next_id) = next else {
            debug!("No waiting patients for doctor {} on {}", doctor_id, queue_date);
            return Ok(None);
        };

        let now = now_rfc3339();
        let finished = finish_consultations(&tx, doctor_id, queue_date, &now)?;

        tx.execute(
            "UPDATE patient_queue SET status = 'in_consultation', called_at = ?1 WHERE id = ?2",
            params![now, next_id],
        )?;
        let called = fetch(&tx, &next_id)?;
        tx.commit()?;

        if let Some(entry) = &called {
            info!(
                "Doctor {} called token {} (completed {} in consultation)",
                doctor_id,
                entry.token_number,
                finished
            );
        }
        Ok(called)
    }

    async fn update_status(&self, id: &str, expected: &str, status: &str) -> Result<QueueEntryRecord, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = now_rfc3339();

        let current = fetch(&tx, id)?.ok_or_else(|| RepositoryError::NotFound(format!("Queue entry {}", id)))?;
        if current.status != expected {
            return Err(RepositoryError::StaleState(format!(
                "Queue entry {} is {}, expected {}",
                id, current.status, expected
            )));
        }
        match status {
            "waiting" => ensure_not_queued(&tx, &current.doctor_id, &current.queue_date, &current.patient_id, Some(id))?,
            // one consultation at a time, as with call-next
            "in_consultation" => {
                finish_consultations(&tx, &current.doctor_id, &current.queue_date, &now)?;
            }
            _ => {}
        }

        let changed = match status {
            "in_consultation" => tx.execute(
                "UPDATE patient_queue SET status = ?1, called_at = ?2 WHERE id = ?3 AND status = ?4",
                params![status, now, id, expected],
            )?,
            "completed" => tx.execute(
                "UPDATE patient_queue SET status = ?1, completed_at = ?2 WHERE id = ?3 AND status = ?4",
                params![status, now, id, expected],
            )?,
            _ => tx.execute(
                "UPDATE patient_queue SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![status, id, expected],
            )?,
        };

        let entry = fetch(&tx, id)?.ok_or_else(|| RepositoryError::NotFound(format!("Queue entry {}", id)))?;
        if changed == 0 {
            return Err(RepositoryError::StaleState(format!(
                "Queue entry {} is {}, expected {}",
                id, entry.status, expected
            )));
        }

        if status == "completed" {
            complete_appointment(&tx, entry.appointment_id.as_deref(), &now)?;
        }
        tx.commit()?;

        debug!("Queue entry {}: {} -> {}", id, expected, status);
        Ok(entry)
    }

    async fn status_counts(&self, doctor_id: &str, queue_date: &str) -> Result<Vec<QueueStatusCount>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM patient_queue
             WHERE doctor_id = ?1 AND queue_date = ?2
             GROUP BY status ORDER BY status",
        )?;
        let counts = stmt
            .query_map(params![doctor_id, queue_date], |row| {
                Ok(QueueStatusCount {
                    status: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }
}

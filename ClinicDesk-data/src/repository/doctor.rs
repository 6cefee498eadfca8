use async_trait::async_trait;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

use super::errors::RepositoryError;
use super::sql::{new_id, now_rfc3339, Filters};
use crate::database::DatabasePool;
use crate::models::doctor::{DoctorFields, DoctorFilter, DoctorRecord, NewTimeSlot, TimeSlotRecord};

const COLUMNS: &str = "id, clinic_id, name, specialization, registration_number, phone, email, \
                       consultation_fee, active, created_at, updated_at";

/// Repository trait for doctors and their weekly schedules
#[async_trait]
pub trait DoctorRepositoryTrait: Send + Sync {
    async fn create(&self, fields: DoctorFields) -> Result<DoctorRecord, RepositoryError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<DoctorRecord>, RepositoryError>;
    async fn list(&self, filter: DoctorFilter) -> Result<Vec<DoctorRecord>, RepositoryError>;
    async fn update(&self, id: &str, fields: DoctorFields) -> Result<Option<DoctorRecord>, RepositoryError>;
    async fn deactivate(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Weekly slots ordered by day and start time
    async fn get_time_slots(&self, doctor_id: &str) -> Result<Vec<TimeSlotRecord>, RepositoryError>;

    /// Replace every slot of the doctor atomically
    async fn replace_time_slots(
        &self,
        doctor_id: &str,
        slots: Vec<NewTimeSlot>,
    ) -> Result<Vec<TimeSlotRecord>, RepositoryError>;
}

/// SQLite repository for doctors
#[derive(Debug, Clone)]
pub struct DoctorRepository {
    pool: DatabasePool,
}

impl DoctorRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<DoctorRecord> {
    Ok(DoctorRecord {
        id: row.get("id")?,
        clinic_id: row.get("clinic_id")?,
        name: row.get("name")?,
        specialization: row.get("specialization")?,
        registration_number: row.get("registration_number")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        consultation_fee: row.get("consultation_fee")?,
        active: row.get("active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn map_slot(row: &Row<'_>) -> rusqlite::Result<TimeSlotRecord> {
    Ok(TimeSlotRecord {
        id: row.get("id")?,
        doctor_id: row.get("doctor_id")?,
        day_of_week: row.get("day_of_week")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        slot_minutes: row.get("slot_minutes")?,
    })
}

const SLOT_QUERY: &str = "SELECT id, doctor_id, day_of_week, start_time, end_time, slot_minutes
                          FROM doctor_time_slots WHERE doctor_id = ?1
                          ORDER BY day_of_week, start_time";

#[async_trait]
impl DoctorRepositoryTrait for DoctorRepository {
    async fn create(&self, fields: DoctorFields) -> Result<DoctorRecord, RepositoryError> {
        let now = now_rfc3339();
        let record = DoctorRecord {
            id: new_id(),
            clinic_id: fields.clinic_id,
            name: fields.name,
            specialization: fields.specialization,
            registration_number: fields.registration_number,
            phone: fields.phone,
            email: fields.email,
            consultation_fee: fields.consultation_fee,
            active: fields.active,
            created_at: now.clone(),
            updated_at: now,
        };
        debug!("Creating doctor {} in clinic {}", record.id, record.clinic_id);

        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO doctors ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                COLUMNS
            ),
            params![
                record.id,
                record.clinic_id,
                record.name,
                record.specialization,
                record.registration_number,
                record.phone,
                record.email,
                record.consultation_fee,
                record.active,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<DoctorRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let doctor = conn
            .query_row(&format!("SELECT {} FROM doctors WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(doctor)
    }

    async fn list(&self, filter: DoctorFilter) -> Result<Vec<DoctorRecord>, RepositoryError> {
        let mut filters = Filters::new();
        filters
            .eq_text("clinic_id", filter.clinic_id.as_deref())
            .eq_bool("active", filter.active);

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM doctors{} ORDER BY name",
            COLUMNS,
            filters.where_sql()
        ))?;
        let doctors = stmt
            .query_map(params_from_iter(filters.values()), map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(doctors)
    }

    async fn update(&self, id: &str, fields: DoctorFields) -> Result<Option<DoctorRecord>, RepositoryError> {
        debug!("Updating doctor: {}", id);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE doctors SET clinic_id = ?1, name = ?2, specialization = ?3, registration_number = ?4,
                    phone = ?5, email = ?6, consultation_fee = ?7, active = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                fields.clinic_id,
                fields.name,
                fields.specialization,
                fields.registration_number,
                fields.phone,
                fields.email,
                fields.consultation_fee,
                fields.active,
                now_rfc3339(),
                id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        let doctor = conn
            .query_row(&format!("SELECT {} FROM doctors WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(doctor)
    }

    async fn deactivate(&self, id: &str) -> Result<bool, RepositoryError> {
        debug!("Deactivating doctor: {}", id);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE doctors SET active = 0, updated_at = ?1 WHERE id = ?2",
            params![now_rfc3339(), id],
        )?;
        Ok(changed > 0)
    }

    async fn get_time_slots(&self, doctor_id: &str) -> Result<Vec<TimeSlotRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(SLOT_QUERY)?;
        let slots = stmt
            .query_map(params![doctor_id], map_slot)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(slots)
    }

    async fn replace_time_slots(
        &self,
        doctor_id: &str,
        slots: Vec<NewTimeSlot>,
    ) -> Result<Vec<TimeSlotRecord>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = tx.execute("DELETE FROM doctor_time_slots WHERE doctor_id = ?1", params![doctor_id])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO doctor_time_slots (id, doctor_id, day_of_week, start_time, end_time, slot_minutes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for slot in &slots {
                insert.execute(params![
                    new_id(),
                    doctor_id,
                    slot.day_of_week,
                    slot.start_time,
                    slot.end_time,
                    slot.slot_minutes,
                ])?;
            }
        }

        let saved = {
            let mut stmt = tx.prepare(SLOT_QUERY)?;
            let rows = stmt
                .query_map(params![doctor_id], map_slot)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        tx.commit()?;

        info!(
            "Replaced time slots for doctor {}: removed {}, inserted {}",
            doctor_id,
            removed,
            saved.len()
        );
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;

    fn fields(clinic_id: &str, name: &str) -> DoctorFields {
        DoctorFields {
            clinic_id: clinic_id.to_string(),
            name: name.to_string(),
            specialization: Some("General Medicine".to_string()),
            registration_number: Some("MMC-2011-4455".to_string()),
            phone: None,
            email: None,
            consultation_fee: Some(500.0),
            active: true,
        }
    }

    fn slot(day: u8, start: &str, end: &str) -> NewTimeSlot {
        NewTimeSlot {
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            slot_minutes: 15,
        }
    }

    #[tokio::test]
    async fn test_list_filters_by_clinic_and_active() {
        let pool = DatabasePool::in_memory().unwrap();
        let clinic_a = fixtures::seed_clinic(&pool);
        let clinic_b = fixtures::seed_clinic(&pool);
        let repo = DoctorRepository::new(pool);

        let first = repo.create(fields(&clinic_a, "Dr. Mehta")).await.unwrap();
        repo.create(fields(&clinic_a, "Dr. Rao")).await.unwrap();
        repo.create(fields(&clinic_b, "Dr. Iyer")).await.unwrap();
        assert!(repo.deactivate(&first.id).await.unwrap());

        let active_in_a = repo
            .list(DoctorFilter {
                clinic_id: Some(clinic_a.clone()),
                active: Some(true),
            })
            .await
            .unwrap();
        assert_eq!(active_in_a.len(), 1);
        assert_eq!(active_in_a[0].name, "Dr. Rao");

        assert_eq!(repo.list(DoctorFilter::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_clinic_is_rejected() {
        let repo = DoctorRepository::new(DatabasePool::in_memory().unwrap());
        let err = repo.create(fields("no-such-clinic", "Dr. Nobody")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_replace_time_slots() {
        let pool = DatabasePool::in_memory().unwrap();
        let clinic = fixtures::seed_clinic(&pool);
        let repo = DoctorRepository::new(pool);
        let doctor = repo.create(fields(&clinic, "Dr. Mehta")).await.unwrap();

        repo.replace_time_slots(&doctor.id, vec![slot(0, "09:00", "12:00"), slot(2, "17:00", "20:00")])
            .await
            .unwrap();

        let saved = repo
            .replace_time_slots(&doctor.id, vec![slot(4, "10:00", "13:00"), slot(1, "09:00", "11:00")])
            .await
            .unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].day_of_week, 1);
        assert_eq!(saved[1].day_of_week, 4);
        assert_eq!(repo.get_time_slots(&doctor.id).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_failed_replace_rolls_back() {
        let pool = DatabasePool::in_memory().unwrap();
        let clinic = fixtures::seed_clinic(&pool);
        let repo = DoctorRepository::new(pool);
        let doctor = repo.create(fields(&clinic, "Dr. Mehta")).await.unwrap();
        repo.replace_time_slots(&doctor.id, vec![slot(0, "09:00", "12:00")])
            .await
            .unwrap();

        // day 9 violates the CHECK constraint after the delete already ran
        let result = repo
            .replace_time_slots(&doctor.id, vec![slot(1, "09:00", "10:00"), slot(9, "09:00", "10:00")])
            .await;
        assert!(result.is_err());

        let slots = repo.get_time_slots(&doctor.id).await.unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].day_of_week, 0);
    }
}

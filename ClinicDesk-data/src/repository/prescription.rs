use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::errors::RepositoryError;
use super::sql::{new_id, now_rfc3339};
use crate::database::DatabasePool;
use crate::models::prescription::{PrescriptionFields, PrescriptionRecord};

const COLUMNS: &str = "id, clinic_id, patient_id, doctor_id, appointment_id, diagnosis, medicines, advice, \
                       follow_up_date, created_at, updated_at";

/// Repository trait for prescriptions
#[async_trait]
pub trait PrescriptionRepositoryTrait: Send + Sync {
    async fn create(&self, fields: PrescriptionFields) -> Result<PrescriptionRecord, RepositoryError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<PrescriptionRecord>, RepositoryError>;
    /// A patient's prescriptions, newest first
    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<PrescriptionRecord>, RepositoryError>;
    async fn update(&self, id: &str, fields: PrescriptionFields) -> Result<Option<PrescriptionRecord>, RepositoryError>;
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// SQLite repository for prescriptions
#[derive(Debug, Clone)]
pub struct PrescriptionRepository {
    pool: DatabasePool,
}

impl PrescriptionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<PrescriptionRecord> {
    Ok(PrescriptionRecord {
        id: row.get("id")?,
        clinic_id: row.get("clinic_id")?,
        patient_id: row.get("patient_id")?,
        doctor_id: row.get("doctor_id")?,
        appointment_id: row.get("appointment_id")?,
        diagnosis: row.get("diagnosis")?,
        medicines: row.get("medicines")?,
        advice: row.get("advice")?,
        follow_up_date: row.get("follow_up_date")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[async_trait]
impl PrescriptionRepositoryTrait for PrescriptionRepository {
    async fn create(&self, fields: PrescriptionFields) -> Result<PrescriptionRecord, RepositoryError> {
        let now = now_rfc3339();
        let record = PrescriptionRecord {
            id: new_id(),
            clinic_id: fields.clinic_id,
            patient_id: fields.patient_id,
            doctor_id: fields.doctor_id,
            appointment_id: fields.appointment_id,
            diagnosis: fields.diagnosis,
            medicines: fields.medicines,
            advice: fields.advice,
            follow_up_date: fields.follow_up_date,
            created_at: now.clone(),
            updated_at: now,
        };
        debug!("Creating prescription {} for patient {}", record.id, record.patient_id);

        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO prescriptions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                COLUMNS
            ),
            params![
                record.id,
                record.clinic_id,
                record.patient_id,
                record.doctor_id,
                record.appointment_id,
                record.diagnosis,
                record.medicines,
                record.advice,
                record.follow_up_date,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<PrescriptionRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let prescription = conn
            .query_row(&format!("SELECT {} FROM prescriptions WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(prescription)
    }

    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<PrescriptionRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM prescriptions WHERE patient_id = ?1 ORDER BY created_at DESC",
            COLUMNS
        ))?;
        let prescriptions = stmt
            .query_map(params![patient_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prescriptions)
    }

    async fn update(&self, id: &str, fields: PrescriptionFields) -> Result<Option<PrescriptionRecord>, RepositoryError> {
        debug!("Updating prescription: {}", id);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE prescriptions SET doctor_id = ?1, appointment_id = ?2, diagnosis = ?3, medicines = ?4,
                    advice = ?5, follow_up_date = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                fields.doctor_id,
                fields.appointment_id,
                fields.diagnosis,
                fields.medicines,
                fields.advice,
                fields.follow_up_date,
                now_rfc3339(),
                id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        let prescription = conn
            .query_row(&format!("SELECT {} FROM prescriptions WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(prescription)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute("DELETE FROM prescriptions WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::Seeded;

    fn fields(seed: &Seeded, diagnosis: &str) -> PrescriptionFields {
        PrescriptionFields {
            clinic_id: seed.clinic_id.clone(),
            patient_id: seed.patient_id.clone(),
            doctor_id: seed.doctor_id.clone(),
            appointment_id: None,
            diagnosis: Some(diagnosis.to_string()),
            medicines: r#"[{"name":"Paracetamol 500mg","dosage":"1 tab","frequency":"TDS","duration_days":3}]"#
                .to_string(),
            advice: None,
            follow_up_date: None,
        }
    }

    #[tokio::test]
    async fn test_prescription_crud() {
        let pool = DatabasePool::in_memory().unwrap();
        let seed = Seeded::new(&pool);
        let repo = PrescriptionRepository::new(pool);

        let created = repo.create(fields(&seed, "Viral fever")).await.unwrap();
        repo.create(fields(&seed, "Follow-up")).await.unwrap();
        assert_eq!(repo.list_by_patient(&seed.patient_id).await.unwrap().len(), 2);

        let mut changed = fields(&seed, "Dengue ruled out");
        changed.advice = Some("Plenty of fluids".to_string());
        let updated = repo.update(&created.id, changed).await.unwrap().unwrap();
        assert_eq!(updated.diagnosis.as_deref(), Some("Dengue ruled out"));
        assert_eq!(updated.medicines, created.medicines);

        assert!(repo.delete(&created.id).await.unwrap());
        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());
    }
}

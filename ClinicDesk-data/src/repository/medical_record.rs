use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::errors::RepositoryError;
use super::sql::now_rfc3339;
use crate::database::DatabasePool;
use crate::models::medical_record::{MedicalRecordEntry, NewMedicalRecord};

const COLUMNS: &str = "id, patient_id, record_type, title, file_name, stored_path, content_type, size_bytes, \
                       uploaded_by, created_at";

/// Repository trait for uploaded medical record metadata
#[async_trait]
pub trait MedicalRecordRepositoryTrait: Send + Sync {
    async fn create(&self, record: NewMedicalRecord) -> Result<MedicalRecordEntry, RepositoryError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<MedicalRecordEntry>, RepositoryError>;
    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<MedicalRecordEntry>, RepositoryError>;
    /// Remove the row and hand it back so the caller can remove the file
    async fn delete(&self, id: &str) -> Result<Option<MedicalRecordEntry>, RepositoryError>;
}

/// SQLite repository for medical record metadata
#[derive(Debug, Clone)]
pub struct MedicalRecordRepository {
    pool: DatabasePool,
}

impl MedicalRecordRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<MedicalRecordEntry> {
    Ok(MedicalRecordEntry {
        id: row.get("id")?,
        patient_id: row.get("patient_id")?,
        record_type: row.get("record_type")?,
        title: row.get("title")?,
        file_name: row.get("file_name")?,
        stored_path: row.get("stored_path")?,
        content_type: row.get("content_type")?,
        size_bytes: row.get::<_, i64>("size_bytes")? as u64,
        uploaded_by: row.get("uploaded_by")?,
        created_at: row.get("created_at")?,
    })
}

#[async_trait]
impl MedicalRecordRepositoryTrait for MedicalRecordRepository {
    async fn create(&self, record: NewMedicalRecord) -> Result<MedicalRecordEntry, RepositoryError> {
        let entry = MedicalRecordEntry {
            id: record.id,
            patient_id: record.patient_id,
            record_type: record.record_type,
            title: record.title,
            file_name: record.file_name,
            stored_path: record.stored_path,
            content_type: record.content_type,
            size_bytes: record.size_bytes,
            uploaded_by: record.uploaded_by,
            created_at: now_rfc3339(),
        };
        debug!("Recording upload {} ({} bytes) for patient {}", entry.id, entry.size_bytes, entry.patient_id);

        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO medical_records ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                COLUMNS
            ),
            params![
                entry.id,
                entry.patient_id,
                entry.record_type,
                entry.title,
                entry.file_name,
                entry.stored_path,
                entry.content_type,
                entry.size_bytes as i64,
                entry.uploaded_by,
                entry.created_at,
            ],
        )?;
        Ok(entry)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<MedicalRecordEntry>, RepositoryError> {
        let conn = self.pool.get()?;
        let entry = conn
            .query_row(&format!("SELECT {} FROM medical_records WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(entry)
    }

    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<MedicalRecordEntry>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM medical_records WHERE patient_id = ?1 ORDER BY created_at DESC",
            COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![patient_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn delete(&self, id: &str) -> Result<Option<MedicalRecordEntry>, RepositoryError> {
        let conn = self.pool.get()?;
        let entry = conn
            .query_row(&format!("SELECT {} FROM medical_records WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        if entry.is_some() {
            conn.execute("DELETE FROM medical_records WHERE id = ?1", params![id])?;
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::Seeded;
    use crate::repository::sql::new_id;

    #[tokio::test]
    async fn test_record_metadata_round_trip() {
        let pool = DatabasePool::in_memory().unwrap();
        let seed = Seeded::new(&pool);
        let repo = MedicalRecordRepository::new(pool);

        let id = new_id();
        let created = repo
            .create(NewMedicalRecord {
                id: id.clone(),
                patient_id: seed.patient_id.clone(),
                record_type: "lab_report".to_string(),
                title: "CBC".to_string(),
                file_name: "cbc.pdf".to_string(),
                stored_path: format!("uploads/{}/{}.pdf", seed.patient_id, id),
                content_type: "application/pdf".to_string(),
                size_bytes: 48_213,
                uploaded_by: None,
            })
            .await
            .unwrap();

        let listed = repo.list_by_patient(&seed.patient_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].size_bytes, 48_213);

        let deleted = repo.delete(&created.id).await.unwrap().unwrap();
        assert_eq!(deleted.stored_path, created.stored_path);
        assert!(repo.delete(&created.id).await.unwrap().is_none());
    }
}

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::errors::RepositoryError;
use super::sql::{new_id, now_rfc3339};
use crate::database::DatabasePool;
use crate::models::clinic::{ClinicFields, ClinicRecord};

const COLUMNS: &str = "id, name, address, phone, email, hfr_id, created_at, updated_at";

/// Repository trait for clinics
#[async_trait]
pub trait ClinicRepositoryTrait: Send + Sync {
    async fn create(&self, fields: ClinicFields) -> Result<ClinicRecord, RepositoryError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<ClinicRecord>, RepositoryError>;
    async fn list(&self) -> Result<Vec<ClinicRecord>, RepositoryError>;
    /// Overwrite all writable columns; `None` when the clinic does not exist
    async fn update(&self, id: &str, fields: ClinicFields) -> Result<Option<ClinicRecord>, RepositoryError>;
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// SQLite repository for clinics
#[derive(Debug, Clone)]
pub struct ClinicRepository {
    pool: DatabasePool,
}

impl ClinicRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ClinicRecord> {
    Ok(ClinicRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        address: row.get("address")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        hfr_id: row.get("hfr_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[async_trait]
impl ClinicRepositoryTrait for ClinicRepository {
    async fn create(&self, fields: ClinicFields) -> Result<ClinicRecord, RepositoryError> {
        let now = now_rfc3339();
        let record = ClinicRecord {
            id: new_id(),
            name: fields.name,
            address: fields.address,
            phone: fields.phone,
            email: fields.email,
            hfr_id: fields.hfr_id,
            created_at: now.clone(),
            updated_at: now,
        };
        debug!("Creating clinic: {}", record.id);

        let conn = self.pool.get()?;
        conn.execute(
            &format!("INSERT INTO clinics ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", COLUMNS),
            params![
                record.id,
                record.name,
                record.address,
                record.phone,
                record.email,
                record.hfr_id,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ClinicRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let clinic = conn
            .query_row(&format!("SELECT {} FROM clinics WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(clinic)
    }

    async fn list(&self) -> Result<Vec<ClinicRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM clinics ORDER BY name", COLUMNS))?;
        let clinics = stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?;
        Ok(clinics)
    }

    async fn update(&self, id: &str, fields: ClinicFields) -> Result<Option<ClinicRecord>, RepositoryError> {
        debug!("Updating clinic: {}", id);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE clinics SET name = ?1, address = ?2, phone = ?3, email = ?4, hfr_id = ?5, updated_at = ?6
             WHERE id = ?7",
            params![fields.name, fields.address, fields.phone, fields.email, fields.hfr_id, now_rfc3339(), id],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        let clinic = conn
            .query_row(&format!("SELECT {} FROM clinics WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(clinic)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        debug!("Deleting clinic: {}", id);
        let conn = self.pool.get()?;
        let changed = conn.execute("DELETE FROM clinics WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

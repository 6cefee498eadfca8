use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

use super::errors::RepositoryError;
use super::sql::{contains_pattern, new_id, now_rfc3339, Filters};
use crate::database::DatabasePool;
use crate::models::patient::{PatientFields, PatientFilter, PatientRecord};

const COLUMNS: &str = "id, clinic_id, uhid, first_name, last_name, gender, date_of_birth, phone, email, \
                       address, blood_group, abha_number, abha_address, created_at, updated_at";

/// Repository trait for patients
#[async_trait]
pub trait PatientRepositoryTrait: Send + Sync {
    /// Register a patient, assigning the next UHID that starts with `uhid_prefix`
    async fn create(&self, fields: PatientFields, uhid_prefix: &str) -> Result<PatientRecord, RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<PatientRecord>, RepositoryError>;

    /// Search patients, returning one page plus the total match count
    async fn search(&self, filter: PatientFilter) -> Result<(Vec<PatientRecord>, usize), RepositoryError>;

    async fn update(&self, id: &str, fields: PatientFields) -> Result<Option<PatientRecord>, RepositoryError>;

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// SQLite repository for patients
#[derive(Debug, Clone)]
pub struct PatientRepository {
    pool: DatabasePool,
}

impl PatientRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

pub(crate) fn map_row(row: &Row<'_>) -> rusqlite::Result<PatientRecord> {
    Ok(PatientRecord {
        id: row.get("id")?,
        clinic_id: row.get("clinic_id")?,
        uhid: row.get("uhid")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        gender: row.get("gender")?,
        date_of_birth: row.get("date_of_birth")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        address: row.get("address")?,
        blood_group: row.get("blood_group")?,
        abha_number: row.get("abha_number")?,
        abha_address: row.get("abha_address")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[async_trait]
impl PatientRepositoryTrait for PatientRepository {
    async fn create(&self, fields: PatientFields, uhid_prefix: &str) -> Result<PatientRecord, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Highest sequence already issued under this prefix
        let last: Option<i64> = tx.query_row(
            "SELECT MAX(CAST(substr(uhid, length(?1) + 1) AS INTEGER))
             FROM patients WHERE substr(uhid, 1, length(?1)) = ?1",
            params![uhid_prefix],
            |row| row.get(0),
        )?;
        let uhid = format!("{}{:04}", uhid_prefix, last.unwrap_or(0) + 1);

        let now = now_rfc3339();
        let record = PatientRecord {
            id: new_id(),
            clinic_id: fields.clinic_id,
            uhid,
            first_name: fields.first_name,
            last_name: fields.last_name,
            gender: fields.gender,
            date_of_birth: fields.date_of_birth,
            phone: fields.phone,
            email: fields.email,
            address: fields.address,
            blood_group: fields.blood_group,
            abha_number: None,
            abha_address: None,
            created_at: now.clone(),
            updated_at: now,
        };

        tx.execute(
            &format!(
                "INSERT INTO patients ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                COLUMNS
            ),
            params![
                record.id,
                record.clinic_id,
                record.uhid,
                record.first_name,
                record.last_name,
                record.gender,
                record.date_of_birth,
                record.phone,
                record.email,
                record.address,
                record.blood_group,
                record.abha_number,
                record.abha_address,
                record.created_at,
                record.updated_at,
            ],
        )?;
        tx.commit()?;

        info!("Registered patient {} with UHID {}", record.id, record.uhid);
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<PatientRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let patient = conn
            .query_row(&format!("SELECT {} FROM patients WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(patient)
    }

    async fn search(&self, filter: PatientFilter) -> Result<(Vec<PatientRecord>, usize), RepositoryError> {
        let mut filters = Filters::new();
        filters.eq_text("clinic_id", filter.clinic_id.as_deref());

        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = contains_pattern(query);
            filters.clause(
                "(first_name || ' ' || last_name LIKE ? ESCAPE '\\' OR phone LIKE ? ESCAPE '\\' \
                 OR uhid LIKE ? ESCAPE '\\')",
                vec![
                    Value::Text(pattern.clone()),
                    Value::Text(pattern.clone()),
                    Value::Text(pattern),
                ],
            );
        }
        debug!("Searching patients: {}", filters.where_sql());

        let conn = self.pool.get()?;
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM patients{}", filters.where_sql()),
            params_from_iter(filters.values()),
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM patients{} ORDER BY created_at DESC, uhid DESC LIMIT ? OFFSET ?",
            COLUMNS,
            filters.where_sql()
        ))?;
        let patients = stmt
            .query_map(params_from_iter(filters.paged_values(filter.limit, filter.offset)), map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((patients, total as usize))
    }

    async fn update(&self, id: &str, fields: PatientFields) -> Result<Option<PatientRecord>, RepositoryError> {
        debug!("Updating patient: {}", id);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE patients SET clinic_id = ?1, first_name = ?2, last_name = ?3, gender = ?4,
                    date_of_birth = ?5, phone = ?6, email = ?7, address = ?8, blood_group = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                fields.clinic_id,
                fields.first_name,
                fields.last_name,
                fields.gender,
                fields.date_of_birth,
                fields.phone,
                fields.email,
                fields.address,
                fields.blood_group,
                now_rfc3339(),
                id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        let patient = conn
            .query_row(&format!("SELECT {} FROM patients WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(patient)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        debug!("Deleting patient: {}", id);
        let conn = self.pool.get()?;
        let changed = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

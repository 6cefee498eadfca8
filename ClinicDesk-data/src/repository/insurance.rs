use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::debug;

use super::errors::RepositoryError;
use super::sql::{new_id, now_rfc3339, Filters};
use crate::database::DatabasePool;
use crate::models::insurance::{InsurancePolicyFields, InsurancePolicyRecord};

const COLUMNS: &str = "id, patient_id, provider_name, policy_number, valid_from, valid_until, coverage_amount, \
                       status, created_at, updated_at";

/// Repository trait for insurance policies
#[async_trait]
pub trait InsuranceRepositoryTrait: Send + Sync {
    async fn create(&self, fields: InsurancePolicyFields) -> Result<InsurancePolicyRecord, RepositoryError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<InsurancePolicyRecord>, RepositoryError>;
    /// A patient's policies, optionally only those valid on `active_on`
    async fn list_by_patient(
        &self,
        patient_id: &str,
        active_on: Option<&str>,
    ) -> Result<Vec<InsurancePolicyRecord>, RepositoryError>;
    async fn update(&self, id: &str, fields: InsurancePolicyFields)
        -> Result<Option<InsurancePolicyRecord>, RepositoryError>;
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// SQLite repository for insurance policies
#[derive(Debug, Clone)]
pub struct InsuranceRepository {
    pool: DatabasePool,
}

impl InsuranceRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<InsurancePolicyRecord> {
    Ok(InsurancePolicyRecord {
        id: row.get("id")?,
        patient_id: row.get("patient_id")?,
        provider_name: row.get("provider_name")?,
        policy_number: row.get("policy_number")?,
        valid_from: row.get("valid_from")?,
        valid_until: row.get("valid_until")?,
        coverage_amount: row.get("coverage_amount")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[async_trait]
impl InsuranceRepositoryTrait for InsuranceRepository {
    async fn create(&self, fields: InsurancePolicyFields) -> Result<InsurancePolicyRecord, RepositoryError> {
        let now = now_rfc3339();
        let record = InsurancePolicyRecord {
            id: new_id(),
            patient_id: fields.patient_id,
            provider_name: fields.provider_name,
            policy_number: fields.policy_number,
            valid_from: fields.valid_from,
            valid_until: fields.valid_until,
            coverage_amount: fields.coverage_amount,
            status: fields.status,
            created_at: now.clone(),
            updated_at: now,
        };
        debug!("Creating insurance policy {} for patient {}", record.id, record.patient_id);

        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO insurance_policies ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                COLUMNS
            ),
            params![
                record.id,
                record.patient_id,
                record.provider_name,
                record.policy_number,
                record.valid_from,
                record.valid_until,
                record.coverage_amount,
                record.status,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<InsurancePolicyRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let policy = conn
            .query_row(
                &format!("SELECT {} FROM insurance_policies WHERE id = ?1", COLUMNS),
                params![id],
                map_row,
            )
            .optional()?;
        Ok(policy)
    }

    async fn list_by_patient(
        &self,
        patient_id: &str,
        active_on: Option<&str>,
    ) -> Result<Vec<InsurancePolicyRecord>, RepositoryError> {
        let mut filters = Filters::new();
        filters.eq_text("patient_id", Some(patient_id));
        if let Some(date) = active_on {
            filters.clause(
                "valid_from <= ? AND valid_until >= ? AND status = 'active'",
                vec![Value::Text(date.to_string()), Value::Text(date.to_string())],
            );
        }

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM insurance_policies{} ORDER BY valid_until DESC",
            COLUMNS,
            filters.where_sql()
        ))?;
        let policies = stmt
            .query_map(params_from_iter(filters.values()), map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(policies)
    }

    async fn update(
        &self,
        id: &str,
        fields: InsurancePolicyFields,
    ) -> Result<Option<InsurancePolicyRecord>, RepositoryError> {
        debug!("Updating insurance policy: {}", id);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE insurance_policies SET provider_name = ?1, policy_number = ?2, valid_from = ?3,
                    valid_until = ?4, coverage_amount = ?5, status = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                fields.provider_name,
                fields.policy_number,
                fields.valid_from,
                fields.valid_until,
                fields.coverage_amount,
                fields.status,
                now_rfc3339(),
                id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        let policy = conn
            .query_row(
                &format!("SELECT {} FROM insurance_policies WHERE id = ?1", COLUMNS),
                params![id],
                map_row,
            )
            .optional()?;
        Ok(policy)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute("DELETE FROM insurance_policies WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

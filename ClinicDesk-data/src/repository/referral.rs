use async_trait::async_trait;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::debug;

use super::errors::RepositoryError;
use super::sql::{new_id, now_rfc3339, Filters};
use crate::database::DatabasePool;
use crate::models::referral::{ReferralFields, ReferralFilter, ReferralRecord};

const COLUMNS: &str = "id, clinic_id, patient_id, referring_doctor_id, referred_to_name, referred_to_specialty, \
                       referred_to_facility, reason, status, notes, created_at, updated_at";

/// Repository trait for referrals
#[async_trait]
pub trait ReferralRepositoryTrait: Send + Sync {
    async fn create(&self, fields: ReferralFields) -> Result<ReferralRecord, RepositoryError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<ReferralRecord>, RepositoryError>;
    async fn list(&self, filter: ReferralFilter) -> Result<Vec<ReferralRecord>, RepositoryError>;
    async fn update(&self, id: &str, fields: ReferralFields) -> Result<Option<ReferralRecord>, RepositoryError>;
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// SQLite repository for referrals
#[derive(Debug, Clone)]
pub struct ReferralRepository {
    pool: DatabasePool,
}

impl ReferralRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ReferralRecord> {
    Ok(ReferralRecord {
        id: row.get("id")?,
        clinic_id: row.get("clinic_id")?,
        patient_id: row.get("patient_id")?,
        referring_doctor_id: row.get("referring_doctor_id")?,
        referred_to_name: row.get("referred_to_name")?,
        referred_to_specialty: row.get("referred_to_specialty")?,
        referred_to_facility: row.get("referred_to_facility")?,
        reason: row.get("reason")?,
        status: row.get("status")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[async_trait]
impl ReferralRepositoryTrait for ReferralRepository {
    async fn create(&self, fields: ReferralFields) -> Result<ReferralRecord, RepositoryError> {
        let now = now_rfc3339();
        let record = ReferralRecord {
            id: new_id(),
            clinic_id: fields.clinic_id,
            patient_id: fields.patient_id,
            referring_doctor_id: fields.referring_doctor_id,
            referred_to_name: fields.referred_to_name,
            referred_to_specialty: fields.referred_to_specialty,
            referred_to_facility: fields.referred_to_facility,
            reason: fields.reason,
            status: fields.status,
            notes: fields.notes,
            created_at: now.clone(),
            updated_at: now,
        };
        debug!("Creating referral {} for patient {}", record.id, record.patient_id);

        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO referrals ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                COLUMNS
            ),
            params![
                record.id,
                record.clinic_id,
                record.patient_id,
                record.referring_doctor_id,
                record.referred_to_name,
                record.referred_to_specialty,
                record.referred_to_facility,
                record.reason,
                record.status,
                record.notes,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ReferralRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let referral = conn
            .query_row(&format!("SELECT {} FROM referrals WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(referral)
    }

    async fn list(&self, filter: ReferralFilter) -> Result<Vec<ReferralRecord>, RepositoryError> {
        let mut filters = Filters::new();
        filters
            .eq_text("clinic_id", filter.clinic_id.as_deref())
            .eq_text("patient_id", filter.patient_id.as_deref())
            .eq_text("status", filter.status.as_deref());

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM referrals{} ORDER BY created_at DESC",
            COLUMNS,
            filters.where_sql()
        ))?;
        let referrals = stmt
            .query_map(params_from_iter(filters.values()), map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(referrals)
    }

    async fn update(&self, id: &str, fields: ReferralFields) -> Result<Option<ReferralRecord>, RepositoryError> {
        debug!("Updating referral {} (status {})", id, fields.status);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE referrals SET referring_doctor_id = ?1, referred_to_name = ?2, referred_to_specialty = ?3,
                    referred_to_facility = ?4, reason = ?5, status = ?6, notes = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                fields.referring_doctor_id,
                fields.referred_to_name,
                fields.referred_to_specialty,
                fields.referred_to_facility,
                fields.reason,
                fields.status,
                fields.notes,
                now_rfc3339(),
                id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        let referral = conn
            .query_row(&format!("SELECT {} FROM referrals WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(referral)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute("DELETE FROM referrals WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

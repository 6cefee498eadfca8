//! ABHA OTP sessions and linked accounts

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

use super::errors::RepositoryError;
use super::sql::{new_id, now_rfc3339};
use crate::database::DatabasePool;
use crate::models::abha::{AbhaAccountFields, AbhaAccountRecord, AbhaSessionRecord, NewAbhaSession};

const SESSION_COLUMNS: &str = "id, patient_id, flow, login_hint, txn_id, status, error, created_at, updated_at, expires_at";
const ACCOUNT_COLUMNS: &str = "id, patient_id, abha_number, abha_address, full_name, gender, date_of_birth, mobile, \
                               kyc_verified, linked_at, updated_at";

/// Repository trait for ABHA sessions and accounts
#[async_trait]
pub trait AbhaRepositoryTrait: Send + Sync {
    /// Open a session in `pending` state
    async fn create_session(&self, session: NewAbhaSession) -> Result<AbhaSessionRecord, RepositoryError>;

    async fn get_session(&self, id: &str) -> Result<Option<AbhaSessionRecord>, RepositoryError>;

    /// Record the ABDM transaction id and move the session to `otp_sent`
    async fn mark_otp_sent(&self, id: &str, txn_id: &str) -> Result<AbhaSessionRecord, RepositoryError>;

    /// Set a terminal status (`failed`, `expired`) with an optional reason
    async fn set_session_status(&self, id: &str, status: &str, error: Option<String>) -> Result<(), RepositoryError>;

    /// Mark the session verified and upsert the account by ABHA number, linking it to
    /// `account.patient_id` when present. Runs as one transaction.
    async fn complete_verification(
        &self,
        session_id: &str,
        account: AbhaAccountFields,
    ) -> Result<AbhaAccountRecord, RepositoryError>;

    async fn get_account_by_patient(&self, patient_id: &str) -> Result<Option<AbhaAccountRecord>, RepositoryError>;

    /// Detach the account from the patient; `false` when nothing was linked
    async fn unlink(&self, patient_id: &str) -> Result<bool, RepositoryError>;
}

/// SQLite repository for ABHA data
#[derive(Debug, Clone)]
pub struct AbhaRepository {
    pool: DatabasePool,
}

impl AbhaRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_session(row: &Row<'_>) -> rusqlite::Result<AbhaSessionRecord> {
    Ok(AbhaSessionRecord {
        id: row.get("id")?,
        patient_id: row.get("patient_id")?,
        flow: row.get("flow")?,
        login_hint: row.get("login_hint")?,
        txn_id: row.get("txn_id")?,
        status: row.get("status")?,
        error: row.get("error")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        expires_at: row.get("expires_at")?,
    })
}

fn map_account(row: &Row<'_>) -> rusqlite::Result<AbhaAccountRecord> {
    Ok(AbhaAccountRecord {
        id: row.get("id")?,
        patient_id: row.get("patient_id")?,
        abha_number: row.get("abha_number")?,
        abha_address: row.get("abha_address")?,
        full_name: row.get("full_name")?,
        gender: row.get("gender")?,
        date_of_birth: row.get("date_of_birth")?,
        mobile: row.get("mobile")?,
        kyc_verified: row.get("kyc_verified")?,
        linked_at: row.get("linked_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[async_trait]
impl AbhaRepositoryTrait for AbhaRepository {
    async fn create_session(&self, session: NewAbhaSession) -> Result<AbhaSessionRecord, RepositoryError> {
        let now = now_rfc3339();
        let record = AbhaSessionRecord {
            id: new_id(),
            patient_id: session.patient_id,
            flow: session.flow,
            login_hint: session.login_hint,
            txn_id: None,
            status: "pending".to_string(),
            error: None,
            created_at: now.clone(),
            updated_at: now,
            expires_at: session.expires_at,
        };
        debug!("Opening ABHA {} session {}", record.flow, record.id);

        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO abha_sessions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                SESSION_COLUMNS
            ),
            params![
                record.id,
                record.patient_id,
                record.flow,
                record.login_hint,
                record.txn_id,
                record.status,
                record.error,
                record.created_at,
                record.updated_at,
                record.expires_at,
            ],
        )?;
        Ok(record)
    }

    async fn get_session(&self, id: &str) -> Result<Option<AbhaSessionRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let session = conn
            .query_row(
                &format!("SELECT {} FROM abha_sessions WHERE id = ?1", SESSION_COLUMNS),
                params![id],
                map_session,
            )
            .optional()?;
        Ok(session)
    }

    async fn mark_otp_sent(&self, id: &str, txn_id: &str) -> Result<AbhaSessionRecord, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE abha_sessions SET txn_id = ?1, status = 'otp_sent', updated_at = ?2
             WHERE id = ?3 AND status = 'pending'",
            params![txn_id, now_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::StaleState(format!("ABHA session {} is not pending", id)));
        }

        conn.query_row(
            &format!("SELECT {} FROM abha_sessions WHERE id = ?1", SESSION_COLUMNS),
            params![id],
            map_session,
        )
        .map_err(RepositoryError::from)
    }

    async fn set_session_status(&self, id: &str, status: &str, error: Option<String>) -> Result<(), RepositoryError> {
        debug!("ABHA session {} -> {}", id, status);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE abha_sessions SET status = ?1, error = ?2, updated_at = ?3 WHERE id = ?4",
            params![status, error, now_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("ABHA session {}", id)));
        }
        Ok(())
    }

    async fn complete_verification(
        &self,
        session_id: &str,
        account: AbhaAccountFields,
    ) -> Result<AbhaAccountRecord, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = now_rfc3339();

        let changed = tx.execute(
            "UPDATE abha_sessions SET status = 'verified', error = NULL, updated_at = ?1
             WHERE id = ?2 AND status = 'otp_sent'",
            params![now, session_id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::StaleState(format!(
                "ABHA session {} is not awaiting verification",
                session_id
            )));
        }

        if let Some(patient_id) = account.patient_id.as_deref() {
            // A patient holds one ABHA account; relinking replaces the previous one
            tx.execute(
                "UPDATE abha_accounts SET patient_id = NULL, updated_at = ?1
                 WHERE patient_id = ?2 AND abha_number != ?3",
                params![now, patient_id, account.abha_number],
            )?;

            // and an ABHA number belongs to one patient, so the previous holder loses it
            let previous: Option<String> = tx
                .query_row(
                    "SELECT patient_id FROM abha_accounts WHERE abha_number = ?1",
                    params![account.abha_number],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?
                .flatten();
            if let Some(previous) = previous.filter(|previous| previous != patient_id) {
                tx.execute(
                    "UPDATE patients SET abha_number = NULL, abha_address = NULL, updated_at = ?1 WHERE id = ?2",
                    params![now, previous],
                )?;
                info!("ABHA {} moved from patient {} to {}", account.abha_number, previous, patient_id);
            }
        }

        tx.execute(
            "INSERT INTO abha_accounts (id, patient_id, abha_number, abha_address, full_name, gender,
                                        date_of_birth, mobile, kyc_verified, linked_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             ON CONFLICT (abha_number) DO UPDATE SET
                patient_id = COALESCE(excluded.patient_id, abha_accounts.patient_id),
                abha_address = COALESCE(excluded.abha_address, abha_accounts.abha_address),
                full_name = COALESCE(excluded.full_name, abha_accounts.full_name),
                gender = COALESCE(excluded.gender, abha_accounts.gender),
                date_of_birth = COALESCE(excluded.date_of_birth, abha_accounts.date_of_birth),
                mobile = COALESCE(excluded.mobile, abha_accounts.mobile),
                kyc_verified = MAX(excluded.kyc_verified, abha_accounts.kyc_verified),
                updated_at = excluded.updated_at",
            params![
                new_id(),
                account.patient_id,
                account.abha_number,
                account.abha_address,
                account.full_name,
                account.gender,
                account.date_of_birth,
                account.mobile,
                account.kyc_verified,
                now,
            ],
        )?;

        let saved = tx.query_row(
            &format!("SELECT {} FROM abha_accounts WHERE abha_number = ?1", ACCOUNT_COLUMNS),
            params![account.abha_number],
            map_account,
        )?;

        if let Some(patient_id) = saved.patient_id.as_deref() {
            tx.execute(
                "UPDATE patients SET abha_number = ?1, abha_address = ?2, updated_at = ?3 WHERE id = ?4",
                params![saved.abha_number, saved.abha_address, now, patient_id],
            )?;
        }
        tx.commit()?;

        info!(
            "ABHA session {} verified for account {} (patient: {:?})",
            session_id, saved.abha_number, saved.patient_id
        );
        Ok(saved)
    }

    async fn get_account_by_patient(&self, patient_id: &str) -> Result<Option<AbhaAccountRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let account = conn
            .query_row(
                &format!("SELECT {} FROM abha_accounts WHERE patient_id = ?1", ACCOUNT_COLUMNS),
                params![patient_id],
                map_account,
            )
            .optional()?;
        Ok(account)
    }

    async fn unlink(&self, patient_id: &str) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let now = now_rfc3339();

        let changed = tx.execute(
            "UPDATE abha_accounts SET patient_id = NULL, updated_at = ?1 WHERE patient_id = ?2",
            params![now, patient_id],
        )?;
        tx.execute(
            "UPDATE patients SET abha_number = NULL, abha_address = NULL, updated_at = ?1 WHERE id = ?2",
            params![now, patient_id],
        )?;
        tx.commit()?;

        info!("Unlinked ABHA account from patient {}: {}", patient_id, changed > 0);
        Ok(changed > 0)
    }
}

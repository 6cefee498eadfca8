use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::errors::RepositoryError;
use super::sql::{new_id, now_rfc3339};
use crate::database::DatabasePool;
use crate::models::user::{NewUser, UserRecord};

const COLUMNS: &str = "id, username, password_hash, full_name, role, clinic_id, doctor_id, active, created_at";

/// Repository trait for application users
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// Create a user
    async fn create(&self, user: NewUser) -> Result<UserRecord, RepositoryError>;

    /// Find a user by login name
    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepositoryError>;

    /// Find a user by id
    async fn get_by_id(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError>;

    /// All users ordered by username
    async fn list(&self) -> Result<Vec<UserRecord>, RepositoryError>;

    /// Number of active users with a role
    async fn count_by_role(&self, role: &str) -> Result<usize, RepositoryError>;

    /// Enable or disable a user
    async fn set_active(&self, id: &str, active: bool) -> Result<bool, RepositoryError>;
}

/// SQLite repository for users
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: DatabasePool,
}

impl UserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get("id")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        full_name: row.get("full_name")?,
        role: row.get("role")?,
        clinic_id: row.get("clinic_id")?,
        doctor_id: row.get("doctor_id")?,
        active: row.get("active")?,
        created_at: row.get("created_at")?,
    })
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
        let record = UserRecord {
            id: new_id(),
            username: user.username,
            password_hash: user.password_hash,
            full_name: user.full_name,
            role: user.role,
            clinic_id: user.clinic_id,
            doctor_id: user.doctor_id,
            active: true,
            created_at: now_rfc3339(),
        };
        debug!("Creating user {} with role {}", record.username, record.role);

        let conn = self.pool.get()?;
        conn.execute(
            &format!("INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)", COLUMNS),
            params![
                record.id,
                record.username,
                record.password_hash,
                record.full_name,
                record.role,
                record.clinic_id,
                record.doctor_id,
                record.active,
                record.created_at,
            ],
        )?;
        Ok(record)
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?1", COLUMNS),
                params![username],
                map_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(&format!("SELECT {} FROM users WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY username", COLUMNS))?;
        let users = stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    async fn count_by_role(&self, role: &str) -> Result<usize, RepositoryError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?1 AND active = 1",
            params![role],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute("UPDATE users SET active = ?1 WHERE id = ?2", params![active, id])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, role: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            full_name: "Front Desk".to_string(),
            role: role.to_string(),
            clinic_id: None,
            doctor_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let repo = UserRepository::new(DatabasePool::in_memory().unwrap());
        let created = repo.create(new_user("reception1", "receptionist")).await.unwrap();

        let found = repo.get_by_username("reception1").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(found.active);
        assert_eq!(repo.count_by_role("receptionist").await.unwrap(), 1);
        assert_eq!(repo.count_by_role("admin").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let repo = UserRepository::new(DatabasePool::in_memory().unwrap());
        repo.create(new_user("dup", "admin")).await.unwrap();

        let err = repo.create(new_user("dup", "doctor")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_invalid_role_is_rejected_by_schema() {
        let repo = UserRepository::new(DatabasePool::in_memory().unwrap());
        let err = repo.create(new_user("nurse", "nurse")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deactivated_user_not_counted() {
        let repo = UserRepository::new(DatabasePool::in_memory().unwrap());
        let admin = repo.create(new_user("root", "admin")).await.unwrap();

        assert!(repo.set_active(&admin.id, false).await.unwrap());
        assert_eq!(repo.count_by_role("admin").await.unwrap(), 0);
        assert!(!repo.set_active("missing", false).await.unwrap());
    }
}

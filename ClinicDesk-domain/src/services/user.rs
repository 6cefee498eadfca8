use async_trait::async_trait;
use tracing::{error, info, warn};

use clinic_desk_data::models::user::NewUser;
use clinic_desk_data::repository::UserRepositoryTrait;

use super::{validate_request, ServiceError};
use crate::auth::logging::log_user_created;
use crate::auth::password::{hash_password, verify_password};
use crate::entities::conversions::convert_to_domain_user;
use crate::entities::user::{CreateUserRequest, Role, User};

/// Trait for user account operations
#[async_trait]
pub trait UserServiceTrait: Send + Sync {
    /// Check credentials; `Unauthorized` for unknown users, wrong passwords and inactive accounts
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, ServiceError>;

    async fn get_user(&self, id: &str) -> Result<User, ServiceError>;

    async fn list_users(&self) -> Result<Vec<User>, ServiceError>;

    /// Create a user with a hashed password; `created_by` is recorded in the auth log
    async fn create_user(&self, request: CreateUserRequest, created_by: Option<&str>) -> Result<User, ServiceError>;

    async fn set_active(&self, id: &str, active: bool) -> Result<User, ServiceError>;

    /// Create an admin with these credentials unless an active admin already exists.
    /// Returns whether a user was created.
    async fn ensure_admin(&self, username: &str, password: &str) -> Result<bool, ServiceError>;
}

/// User service backed by a user repository
pub struct UserService<R: UserRepositoryTrait> {
    repository: R,
}

impl<R: UserRepositoryTrait> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: UserRepositoryTrait> UserServiceTrait for UserService<R> {
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        let record = self
            .repository
            .get_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Unknown username".to_string()))?;

        let matches = verify_password(password, &record.password_hash).map_err(|e| {
            error!("Stored password hash for {} is unusable: {}", username, e);
            ServiceError::Internal("Stored password hash is malformed".to_string())
        })?;

        if !matches {
            return Err(ServiceError::Unauthorized("Wrong password".to_string()));
        }
        if !record.active {
            return Err(ServiceError::Unauthorized("User is inactive".to_string()));
        }

        Ok(convert_to_domain_user(record)?)
    }

    async fn get_user(&self, id: &str) -> Result<User, ServiceError> {
        let record = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User with ID {} not found", id)))?;
        Ok(convert_to_domain_user(record)?)
    }

    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        let records = self.repository.list().await?;
        records
            .into_iter()
            .map(|r| convert_to_domain_user(r).map_err(ServiceError::from))
            .collect()
    }

    async fn create_user(&self, request: CreateUserRequest, created_by: Option<&str>) -> Result<User, ServiceError> {
        validate_request(&request)?;

        if request.role == Role::Doctor && request.doctor_id.is_none() {
            return Err(ServiceError::Validation(
                "doctor_id: Doctor users must be linked to a doctor profile".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password).map_err(|e| {
            error!("Failed to hash password: {}", e);
            ServiceError::Internal("Failed to hash password".to_string())
        })?;

        let record = self
            .repository
            .create(NewUser {
                username: request.username.trim().to_string(),
                password_hash,
                full_name: request.full_name,
                role: request.role.to_string(),
                clinic_id: request.clinic_id,
                doctor_id: request.doctor_id,
            })
            .await?;

        log_user_created(created_by, &record.username, &record.role);
        Ok(convert_to_domain_user(record)?)
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<User, ServiceError> {
        if !self.repository.set_active(id, active).await? {
            return Err(ServiceError::NotFound(format!("User with ID {} not found", id)));
        }
        info!("User {} active={}", id, active);
        self.get_user(id).await
    }

    async fn ensure_admin(&self, username: &str, password: &str) -> Result<bool, ServiceError> {
        if self.repository.count_by_role(Role::Admin.as_str()).await? > 0 {
            return Ok(false);
        }

        if self.repository.get_by_username(username).await?.is_some() {
            warn!("Cannot bootstrap admin: username {} is taken by a non-admin user", username);
            return Ok(false);
        }

        self.create_user(
            CreateUserRequest {
                username: username.to_string(),
                password: password.to_string(),
                full_name: "Administrator".to_string(),
                role: Role::Admin,
                clinic_id: None,
                doctor_id: None,
            },
            None,
        )
        .await?;

        info!("Bootstrapped admin user {}", username);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_desk_data::database::DatabasePool;
    use clinic_desk_data::repository::UserRepository;

    fn service() -> UserService<UserRepository> {
        UserService::new(UserRepository::new(DatabasePool::in_memory().unwrap()))
    }

    fn request(username: &str, role: Role) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            password: "front-desk-123".to_string(),
            full_name: "Priya Sharma".to_string(),
            role,
            clinic_id: None,
            doctor_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_authenticate() {
        let service = service();
        let user = service.create_user(request("priya", Role::Receptionist), None).await.unwrap();
        assert_eq!(user.role, Role::Receptionist);
        assert!(user.active);

        let authed = service.authenticate("priya", "front-desk-123").await.unwrap();
        assert_eq!(authed.id, user.id);
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_unauthorized() {
        let service = service();
        let user = service.create_user(request("priya", Role::Receptionist), None).await.unwrap();

        assert!(matches!(
            service.authenticate("priya", "wrong-password").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            service.authenticate("nobody", "front-desk-123").await,
            Err(ServiceError::Unauthorized(_))
        ));

        service.set_active(&user.id, false).await.unwrap();
        assert!(matches!(
            service.authenticate("priya", "front-desk-123").await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let service = service();
        service.create_user(request("priya", Role::Receptionist), None).await.unwrap();
        assert!(matches!(
            service.create_user(request("priya", Role::Admin), None).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let service = service();
        let mut short = request("ab", Role::Receptionist);
        short.password = "short".to_string();
        let err = service.create_user(short, None).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("username"));
        assert!(message.contains("password"));

        assert!(matches!(
            service.create_user(request("drno", Role::Doctor), None).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_admin_only_once() {
        let service = service();
        assert!(service.ensure_admin("admin", "admin-password").await.unwrap());
        assert!(!service.ensure_admin("admin2", "admin-password").await.unwrap());

        let users = service.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
    }
}

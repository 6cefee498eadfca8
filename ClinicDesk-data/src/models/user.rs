use serde::{Deserialize, Serialize};

/// Storage model for an application user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub full_name: String,
    /// One of `admin`, `doctor`, `receptionist`
    pub role: String,
    pub clinic_id: Option<String>,
    pub doctor_id: Option<String>,
    pub active: bool,
    pub created_at: String,
}

/// Input data for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub clinic_id: Option<String>,
    pub doctor_id: Option<String>,
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Application roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages clinics, doctors and users
    Admin,
    /// Clinical staff
    Doctor,
    /// Front desk: registration, appointments, queue
    Receptionist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Receptionist => "receptionist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "receptionist" => Ok(Role::Receptionist),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// An application user, without credentials
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Unique identifier
    pub id: String,

    /// Login name
    pub username: String,

    /// Display name
    pub full_name: String,

    /// Role granted to the user
    pub role: Role,

    /// Clinic the user works at
    pub clinic_id: Option<String>,

    /// Doctor profile of the user, for doctors
    pub doctor_id: Option<String>,

    /// Whether the user may log in
    pub active: bool,

    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// Request payload for creating a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,

    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Full name must be between 1 and 100 characters"))]
    pub full_name: String,

    pub role: Role,

    pub clinic_id: Option<String>,

    pub doctor_id: Option<String>,
}

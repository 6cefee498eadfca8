// ClinicDesk Domain
// Business rules for the ClinicDesk clinic management backend

// Services that implement business logic
pub mod services;

// Authentication and role checks
pub mod auth;

// Domain entities
pub mod entities;

// ABDM (ABHA) gateway client
pub mod abdm;

// Health checks and system status
pub mod health;

// Re-export the database module from the data crate for convenience
pub use clinic_desk_data::database;

// Testing utilities - only available with mock feature
#[cfg(feature = "mock")]
pub mod testing;

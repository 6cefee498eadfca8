// ClinicDesk Data
// This crate owns the SQLite database: pooling, schema and raw SQL repositories

// Database connection management
pub mod database;

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;

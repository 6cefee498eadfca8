// Database migrations module
// Schema is created idempotently on every pool initialisation

mod sqlite;
pub use sqlite::run_migrations;

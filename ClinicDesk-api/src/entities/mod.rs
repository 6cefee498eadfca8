// Public entities for the ClinicDesk API
// Envelopes shared by every handler: errors and pagination

pub mod common;

pub use common::{PublicErrorResponse, PublicPaginatedResponse};

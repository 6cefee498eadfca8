use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use clinic_desk_domain::entities::{Appointment, Patient};

/// Standardized error response format
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicErrorResponse {
    /// Machine-readable error code, e.g. `not_found`
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional details, e.g. one entry per failed field
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// Paginated response format
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[aliases(PatientPage = PublicPaginatedResponse<Patient>, AppointmentPage = PublicPaginatedResponse<Appointment>)]
pub struct PublicPaginatedResponse<T> {
    /// The data items for this page
    pub data: Vec<T>,

    /// Total number of matching items
    pub total: usize,

    /// Number of items returned
    pub count: usize,

    /// Number of items skipped
    pub offset: usize,

    /// Page size
    pub limit: usize,
}

impl<T> PublicPaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: usize, offset: usize, limit: usize) -> Self {
        Self {
            count: data.len(),
            data,
            total,
            offset,
            limit,
        }
    }

    /// Whether rows remain after this page
    pub fn has_more(&self) -> bool {
        self.offset + self.count < self.total
    }
}

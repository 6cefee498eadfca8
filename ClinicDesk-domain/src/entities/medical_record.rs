use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Metadata of an uploaded report, scan or photo
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MedicalRecord {
    pub id: String,

    pub patient_id: String,

    /// Free-form kind, e.g. `lab_report`, `xray`
    pub record_type: String,

    pub title: String,

    /// Name the file was uploaded with
    pub file_name: String,

    /// Content type of the stored file, after optimisation
    pub content_type: String,

    pub size_bytes: u64,

    /// User who uploaded it
    pub uploaded_by: Option<String>,

    pub created_at: String,
}

/// A file received from a multipart upload
#[derive(Debug, Clone, Validate)]
pub struct UploadMedicalRecord {
    #[validate(length(min = 1, max = 50, message = "Record type must be between 1 and 50 characters"))]
    pub record_type: String,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    pub file_name: String,

    /// Content type declared by the client
    pub content_type: Option<String>,

    pub bytes: Vec<u8>,
}

/// Stored file handed back for download
#[derive(Debug, Clone)]
pub struct MedicalRecordFile {
    pub record: MedicalRecord,
    pub bytes: Vec<u8>,
}

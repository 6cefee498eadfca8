use serde::{Deserialize, Serialize};

/// Metadata row for an uploaded medical record file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecordEntry {
    pub id: String,
    pub patient_id: String,
    /// e.g. `lab_report`, `scan`, `prescription`
    pub record_type: String,
    pub title: String,
    /// Name of the file as uploaded
    pub file_name: String,
    /// Where the (possibly optimized) file sits on disk
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub uploaded_by: Option<String>,
    pub created_at: String,
}

/// Input data for recording an upload; the id is chosen by the caller so the
/// file can be written under it before the row exists
#[derive(Debug, Clone)]
pub struct NewMedicalRecord {
    pub id: String,
    pub patient_id: String,
    pub record_type: String,
    pub title: String,
    pub file_name: String,
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub uploaded_by: Option<String>,
}

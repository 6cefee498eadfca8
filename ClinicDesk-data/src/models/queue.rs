use serde::{Deserialize, Serialize};

/// Storage model for a patient queue entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntryRecord {
    pub id: String,
    pub clinic_id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub appointment_id: Option<String>,
    /// `YYYY-MM-DD`
    pub queue_date: String,
    pub token_number: u32,
    pub status: String,
    pub checked_in_at: String,
    pub called_at: Option<String>,
    pub completed_at: Option<String>,
}

/// Input data for checking a patient into a queue
#[derive(Debug, Clone)]
pub struct NewQueueEntry {
    pub clinic_id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub appointment_id: Option<String>,
    pub queue_date: String,
}

/// Number of queue entries in one status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatusCount {
    pub status: String,
    pub count: usize,
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validators::validate_date;

/// Position of a queue entry in the consultation flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    InConsultation,
    Completed,
    Skipped,
    Cancelled,
}

impl QueueStatus {
    pub const ALL: [QueueStatus; 5] = [
        QueueStatus::Waiting,
        QueueStatus::InConsultation,
        QueueStatus::Completed,
        QueueStatus::Skipped,
        QueueStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Waiting => "waiting",
            QueueStatus::InConsultation => "in_consultation",
            QueueStatus::Completed => "completed",
            QueueStatus::Skipped => "skipped",
            QueueStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: QueueStatus) -> bool {
        use QueueStatus::*;
        matches!(
            (self, next),
            (Waiting, InConsultation)
                | (Waiting, Skipped)
                | (Waiting, Cancelled)
                | (InConsultation, Completed)
                | (Skipped, Waiting)
        )
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueueStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown queue status: {}", s))
    }
}

/// A checked-in patient waiting for, or seeing, a doctor
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueueEntry {
    pub id: String,

    pub clinic_id: String,

    pub doctor_id: String,

    pub patient_id: String,

    pub appointment_id: Option<String>,

    /// `YYYY-MM-DD`
    pub queue_date: String,

    /// Per doctor and day, starting at 1
    pub token_number: u32,

    pub status: QueueStatus,

    pub checked_in_at: String,

    pub called_at: Option<String>,

    pub completed_at: Option<String>,
}

/// Request payload for checking a patient in
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CheckInRequest {
    #[validate(length(min = 1, message = "Clinic id is required"))]
    pub clinic_id: String,

    #[validate(length(min = 1, message = "Doctor id is required"))]
    pub doctor_id: String,

    #[validate(length(min = 1, message = "Patient id is required"))]
    pub patient_id: String,

    /// Appointment being honoured, moved to `checked_in`
    pub appointment_id: Option<String>,

    /// Defaults to today
    #[validate(custom = "validate_date")]
    pub queue_date: Option<String>,
}

/// Request payload for calling the next token
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CallNextRequest {
    #[validate(length(min = 1, message = "Doctor id is required"))]
    pub doctor_id: String,

    /// Defaults to today
    #[validate(custom = "validate_date")]
    pub queue_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateQueueStatusRequest {
    pub status: QueueStatus,
}

/// Query parameters selecting one doctor's queue for a day
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
pub struct QueueQuery {
    #[validate(length(min = 1, message = "Doctor id is required"))]
    pub doctor_id: String,

    /// Defaults to today
    #[validate(custom = "validate_date")]
    pub date: Option<String>,
}

/// Counts for one status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QueueStatusTally {
    pub status: QueueStatus,
    pub count: usize,
}

/// Snapshot of a doctor's queue for a day
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueueSummary {
    pub doctor_id: String,

    pub queue_date: String,

    /// One tally per status, zero counts included
    pub counts: Vec<QueueStatusTally>,

    pub total: usize,

    /// Token currently in consultation
    pub current_token: Option<u32>,

    /// Lowest waiting token
    pub next_token: Option<u32>,
}

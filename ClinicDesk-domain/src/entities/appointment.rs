use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validators::{validate_date, validate_time};

/// Lifecycle of an appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    CheckedIn,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::CheckedIn => "checked_in",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// Allowed moves: scheduled -> checked_in -> completed, scheduled|checked_in -> cancelled,
    /// scheduled -> no_show
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Scheduled, CheckedIn)
                | (CheckedIn, Completed)
                | (Scheduled, Cancelled)
                | (CheckedIn, Cancelled)
                | (Scheduled, NoShow)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "checked_in" => Ok(AppointmentStatus::CheckedIn),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no_show" => Ok(AppointmentStatus::NoShow),
            other => Err(format!("Unknown appointment status: {}", other)),
        }
    }
}

/// A booked consultation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Appointment {
    pub id: String,

    pub clinic_id: String,

    pub patient_id: String,

    pub doctor_id: String,

    /// `YYYY-MM-DD`
    pub appointment_date: String,

    /// `HH:MM`
    pub start_time: String,

    /// `HH:MM`
    pub end_time: Option<String>,

    pub status: AppointmentStatus,

    /// Reason for the visit
    pub reason: Option<String>,

    pub notes: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

/// Request payload for booking an appointment
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookAppointmentRequest {
    #[validate(length(min = 1, message = "Clinic id is required"))]
    pub clinic_id: String,

    #[validate(length(min = 1, message = "Patient id is required"))]
    pub patient_id: String,

    #[validate(length(min = 1, message = "Doctor id is required"))]
    pub doctor_id: String,

    #[validate(custom = "validate_date")]
    pub appointment_date: String,

    #[validate(custom = "validate_time")]
    pub start_time: String,

    #[validate(custom = "validate_time")]
    pub end_time: Option<String>,

    #[validate(length(max = 500, message = "Reason cannot exceed 500 characters"))]
    pub reason: Option<String>,

    #[validate(length(max = 2000, message = "Notes cannot exceed 2000 characters"))]
    pub notes: Option<String>,
}

/// Request payload for rescheduling or annotating an appointment
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateAppointmentRequest {
    pub doctor_id: Option<String>,

    #[validate(custom = "validate_date")]
    pub appointment_date: Option<String>,

    #[validate(custom = "validate_time")]
    pub start_time: Option<String>,

    #[validate(custom = "validate_time")]
    pub end_time: Option<String>,

    #[validate(length(max = 500, message = "Reason cannot exceed 500 characters"))]
    pub reason: Option<String>,

    #[validate(length(max = 2000, message = "Notes cannot exceed 2000 characters"))]
    pub notes: Option<String>,
}

/// Request payload for a status transition
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
}

/// Query parameters for listing appointments
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AppointmentListQuery {
    pub clinic_id: Option<String>,

    pub doctor_id: Option<String>,

    pub patient_id: Option<String>,

    /// `YYYY-MM-DD`
    pub date: Option<String>,

    pub status: Option<AppointmentStatus>,

    /// Page size (default 20, max 100)
    pub limit: Option<usize>,

    pub offset: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn test_allowed_transitions() {
        assert!(Scheduled.can_transition_to(CheckedIn));
        assert!(CheckedIn.can_transition_to(Completed));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(CheckedIn.can_transition_to(Cancelled));
        assert!(Scheduled.can_transition_to(NoShow));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!CheckedIn.can_transition_to(NoShow));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Scheduled));
        assert!(!NoShow.can_transition_to(CheckedIn));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [Scheduled, CheckedIn, Completed, Cancelled, NoShow] {
            assert_eq!(status.as_str().parse::<AppointmentStatus>().unwrap(), status);
        }
    }
}

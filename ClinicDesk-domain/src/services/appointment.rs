use async_trait::async_trait;
use tracing::{info, warn};

use clinic_desk_data::models::appointment::{AppointmentFilter, NewAppointment};
use clinic_desk_data::repository::{AppointmentRepositoryTrait, DoctorRepositoryTrait};

use super::{page_limit, validate_request, ServiceError};
use crate::entities::appointment::{
    Appointment, AppointmentListQuery, AppointmentStatus, BookAppointmentRequest, UpdateAppointmentRequest,
};
use crate::entities::conversions::convert_to_domain_appointment;

/// Trait for booking and tracking appointments
#[async_trait]
pub trait AppointmentServiceTrait: Send + Sync {
    async fn book_appointment(&self, request: BookAppointmentRequest) -> Result<Appointment, ServiceError>;
    async fn get_appointment(&self, id: &str) -> Result<Appointment, ServiceError>;
    async fn list_appointments(&self, query: AppointmentListQuery) -> Result<(Vec<Appointment>, usize), ServiceError>;

    /// Reschedule or edit notes of a scheduled appointment
    async fn update_appointment(&self, id: &str, request: UpdateAppointmentRequest)
        -> Result<Appointment, ServiceError>;

    async fn update_status(&self, id: &str, status: AppointmentStatus) -> Result<Appointment, ServiceError>;

    async fn cancel_appointment(&self, id: &str) -> Result<Appointment, ServiceError> {
        self.update_status(id, AppointmentStatus::Cancelled).await
    }
}

pub struct AppointmentService<A: AppointmentRepositoryTrait, D: DoctorRepositoryTrait> {
    appointments: A,
    doctors: D,
}

impl<A: AppointmentRepositoryTrait, D: DoctorRepositoryTrait> AppointmentService<A, D> {
    pub fn new(appointments: A, doctors: D) -> Self {
        Self { appointments, doctors }
    }

    async fn load(&self, id: &str) -> Result<Appointment, ServiceError> {
        let record = self
            .appointments
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Appointment with ID {} not found", id)))?;
        Ok(convert_to_domain_appointment(record)?)
    }

    /// The doctor must exist, be active and practise at `clinic_id`
    async fn ensure_bookable(&self, doctor_id: &str, clinic_id: &str) -> Result<(), ServiceError> {
        let doctor = self
            .doctors
            .get_by_id(doctor_id)
            .await?
            .ok_or_else(|| ServiceError::Validation(format!("doctor_id: Doctor {} does not exist", doctor_id)))?;

        if doctor.clinic_id != clinic_id {
            return Err(ServiceError::Validation(format!(
                "doctor_id: Doctor {} does not practise at clinic {}",
                doctor_id, clinic_id
            )));
        }
        if !doctor.active {
            return Err(ServiceError::InvalidState(format!(
                "Doctor {} is not accepting appointments",
                doctor_id
            )));
        }
        Ok(())
    }
}

fn check_times(start: &str, end: Option<&str>) -> Result<(), ServiceError> {
    // Both are zero-padded HH:MM, so string order is time order
    match end {
        Some(end) if end <= start => Err(ServiceError::Validation(
            "end_time: End time must be after start time".to_string(),
        )),
        _ => Ok(()),
    }
}

#[async_trait]
impl<A, D> AppointmentServiceTrait for AppointmentService<A, D>
where
    A: AppointmentRepositoryTrait,
    D: DoctorRepositoryTrait,
{
    async fn book_appointment(&self, request: BookAppointmentRequest) -> Result<Appointment, ServiceError> {
        validate_request(&request)?;
        check_times(&request.start_time, request.end_time.as_deref())?;
        self.ensure_bookable(&request.doctor_id, &request.clinic_id).await?;

        let record = self
            .appointments
            .create(NewAppointment {
                clinic_id: request.clinic_id,
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                appointment_date: request.appointment_date,
                start_time: request.start_time,
                end_time: request.end_time,
                reason: request.reason,
                notes: request.notes,
            })
            .await
            .map_err(|e| {
                warn!("Booking rejected: {}", e);
                e
            })?;

        info!(
            "Booked appointment {} with doctor {} on {} at {}",
            record.id, record.doctor_id, record.appointment_date, record.start_time
        );
        Ok(convert_to_domain_appointment(record)?)
    }

    async fn get_appointment(&self, id: &str) -> Result<Appointment, ServiceError> {
        self.load(id).await
    }

    async fn list_appointments(&self, query: AppointmentListQuery) -> Result<(Vec<Appointment>, usize), ServiceError> {
        let filter = AppointmentFilter {
            clinic_id: query.clinic_id,
            doctor_id: query.doctor_id,
            patient_id: query.patient_id,
            date: query.date,
            status: query.status.map(|status| status.as_str().to_string()),
            limit: Some(page_limit(query.limit)),
            offset: query.offset,
        };

        let (records, total) = self.appointments.list(filter).await?;
        let appointments = records
            .into_iter()
            .map(convert_to_domain_appointment)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((appointments, total))
    }

    async fn update_appointment(
        &self,
        id: &str,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, ServiceError> {
        validate_request(&request)?;

        let mut record = self
            .appointments
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Appointment with ID {} not found", id)))?;

        if record.status != AppointmentStatus::Scheduled.as_str() {
            return Err(ServiceError::InvalidState(format!(
                "Appointment {} is {} and can no longer be changed",
                id, record.status
            )));
        }

        if let Some(doctor_id) = request.doctor_id {
            if doctor_id != record.doctor_id {
                self.ensure_bookable(&doctor_id, &record.clinic_id).await?;
                record.doctor_id = doctor_id;
            }
        }
        let rescheduled = request.start_time.is_some() && request.end_time.is_none();
        if let Some(date) = request.appointment_date {
            record.appointment_date = date;
        }
        if let Some(start) = request.start_time {
            record.start_time = start;
        }
        if let Some(end) = request.end_time {
            record.end_time = Some(end);
        } else if rescheduled {
            // An old end time may now precede the new start
            record.end_time = None;
        }
        check_times(&record.start_time, record.end_time.as_deref())?;
        record.reason = request.reason.or(record.reason);
        record.notes = request.notes.or(record.notes);

        let saved = self
            .appointments
            .update(record)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Appointment with ID {} not found", id)))?;
        info!("Updated appointment {}", id);
        Ok(convert_to_domain_appointment(saved)?)
    }

    async fn update_status(&self, id: &str, status: AppointmentStatus) -> Result<Appointment, ServiceError> {
        let current = self.load(id).await?;
        if !current.status.can_transition_to(status) {
            warn!("Appointment {}: refused {} -> {}", id, current.status, status);
            return Err(ServiceError::InvalidState(format!(
                "Cannot move appointment from {} to {}",
                current.status, status
            )));
        }

        let record = self
            .appointments
            .set_status(id, current.status.as_str(), status.as_str())
            .await?;
        info!("Appointment {}: {} -> {}", id, current.status, status);
        Ok(convert_to_domain_appointment(record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Fixture;
    use clinic_desk_data::repository::{AppointmentRepository, DoctorRepository};

    fn service(fixture: &Fixture) -> AppointmentService<AppointmentRepository, DoctorRepository> {
        AppointmentService::new(
            AppointmentRepository::new(fixture.pool.clone()),
            DoctorRepository::new(fixture.pool.clone()),
        )
    }

    fn booking(fixture: &Fixture, start: &str) -> BookAppointmentRequest {
        BookAppointmentRequest {
            clinic_id: fixture.clinic_id.clone(),
            patient_id: fixture.patient_id.clone(),
            doctor_id: fixture.doctor_id.clone(),
            appointment_date: "2026-04-06".to_string(),
            start_time: start.to_string(),
            end_time: None,
            reason: Some("Follow-up".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_double_booking_is_conflict() {
        let fixture = Fixture::new().await;
        let service = service(&fixture);

        let first = service.book_appointment(booking(&fixture, "10:00")).await.unwrap();
        assert_eq!(first.status, AppointmentStatus::Scheduled);

        let err = service.book_appointment(booking(&fixture, "10:00")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // A cancelled appointment frees the slot
        service.cancel_appointment(&first.id).await.unwrap();
        service.book_appointment(booking(&fixture, "10:00")).await.unwrap();
    }

    #[tokio::test]
    async fn test_status_machine() {
        let fixture = Fixture::new().await;
        let service = service(&fixture);
        let appointment = service.book_appointment(booking(&fixture, "11:00")).await.unwrap();

        let err = service
            .update_status(&appointment.id, AppointmentStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let checked_in = service
            .update_status(&appointment.id, AppointmentStatus::CheckedIn)
            .await
            .unwrap();
        assert_eq!(checked_in.status, AppointmentStatus::CheckedIn);

        let err = service
            .update_status(&appointment.id, AppointmentStatus::NoShow)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let done = service
            .update_status(&appointment.id, AppointmentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);

        assert!(matches!(
            service.cancel_appointment(&appointment.id).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_reschedule_and_end_time_rules() {
        let fixture = Fixture::new().await;
        let service = service(&fixture);

        let mut bad = booking(&fixture, "12:00");
        bad.end_time = Some("11:45".to_string());
        assert!(matches!(
            service.book_appointment(bad).await,
            Err(ServiceError::Validation(_))
        ));

        let taken = service.book_appointment(booking(&fixture, "09:00")).await.unwrap();
        let mut with_end = booking(&fixture, "09:30");
        with_end.end_time = Some("09:45".to_string());
        let moving = service.book_appointment(with_end).await.unwrap();

        let err = service
            .update_appointment(
                &moving.id,
                UpdateAppointmentRequest {
                    start_time: Some(taken.start_time.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let moved = service
            .update_appointment(
                &moving.id,
                UpdateAppointmentRequest {
                    start_time: Some("14:00".to_string()),
                    notes: Some("Patient asked for afternoon".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.start_time, "14:00");
        assert_eq!(moved.end_time, None);
        assert_eq!(moved.reason.as_deref(), Some("Follow-up"));
    }

    #[tokio::test]
    async fn test_inactive_doctor_cannot_be_booked() {
        let fixture = Fixture::new().await;
        DoctorRepository::new(fixture.pool.clone())
            .deactivate(&fixture.doctor_id)
            .await
            .unwrap();

        let err = service(&fixture)
            .book_appointment(booking(&fixture, "10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let fixture = Fixture::new().await;
        let service = service(&fixture);
        let a = service.book_appointment(booking(&fixture, "09:00")).await.unwrap();
        service.book_appointment(booking(&fixture, "09:15")).await.unwrap();
        service.cancel_appointment(&a.id).await.unwrap();

        let (scheduled, total) = service
            .list_appointments(AppointmentListQuery {
                doctor_id: Some(fixture.doctor_id.clone()),
                status: Some(AppointmentStatus::Scheduled),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(scheduled[0].start_time, "09:15");
    }
}

//! Walk-in and appointment queue per doctor and day

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{info, warn};

use clinic_desk_data::models::queue::NewQueueEntry;
use clinic_desk_data::repository::QueueRepositoryTrait;

use super::{today, validate_request, ServiceError};
use crate::entities::conversions::convert_to_domain_queue_entry;
use crate::entities::queue::{
    CallNextRequest, CheckInRequest, QueueEntry, QueueQuery, QueueStatus, QueueStatusTally, QueueSummary,
};

#[async_trait]
pub trait QueueServiceTrait: Send + Sync {
    /// Issue the next token for the doctor and day
    async fn check_in(&self, request: CheckInRequest) -> Result<QueueEntry, ServiceError>;

    async fn list_queue(&self, query: QueueQuery) -> Result<Vec<QueueEntry>, ServiceError>;

    /// Call the lowest waiting token; `NotFound` when nobody is waiting
    async fn call_next(&self, request: CallNextRequest) -> Result<QueueEntry, ServiceError>;

    async fn update_status(&self, id: &str, status: QueueStatus) -> Result<QueueEntry, ServiceError>;

    async fn summary(&self, query: QueueQuery) -> Result<QueueSummary, ServiceError>;
}

pub struct QueueService<R: QueueRepositoryTrait> {
    repository: R,
}

impl<R: QueueRepositoryTrait> QueueService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: QueueRepositoryTrait> QueueServiceTrait for QueueService<R> {
    async fn check_in(&self, request: CheckInRequest) -> Result<QueueEntry, ServiceError> {
        validate_request(&request)?;

        let record = self
            .repository
            .check_in(NewQueueEntry {
                clinic_id: request.clinic_id,
                doctor_id: request.doctor_id,
                patient_id: request.patient_id,
                appointment_id: request.appointment_id,
                queue_date: request.queue_date.unwrap_or_else(today),
            })
            .await
            .map_err(|e| {
                warn!("Check-in refused: {}", e);
                e
            })?;
        Ok(convert_to_domain_queue_entry(record)?)
    }

    async fn list_queue(&self, query: QueueQuery) -> Result<Vec<QueueEntry>, ServiceError> {
        validate_request(&query)?;
        let date = query.date.unwrap_or_else(today);

        let records = self.repository.list(&query.doctor_id, &date).await?;
        Ok(records
            .into_iter()
            .map(convert_to_domain_queue_entry)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn call_next(&self, request: CallNextRequest) -> Result<QueueEntry, ServiceError> {
        validate_request(&request)?;
        let date = request.queue_date.unwrap_or_else(today);

        match self.repository.call_next(&request.doctor_id, &date).await? {
            Some(record) => Ok(convert_to_domain_queue_entry(record)?),
            None => Err(ServiceError::NotFound(format!(
                "No patients waiting for doctor {} on {}",
                request.doctor_id, date
            ))),
        }
    }

    async fn update_status(&self, id: &str, status: QueueStatus) -> Result<QueueEntry, ServiceError> {
        let current = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Queue entry with ID {} not found", id)))?;
        let current = convert_to_domain_queue_entry(current)?;

        if !current.status.can_transition_to(status) {
            return Err(ServiceError::InvalidState(format!(
                "Cannot move token {} from {} to {}",
                current.token_number, current.status, status
            )));
        }

        let record = self
            .repository
            .update_status(id, current.status.as_str(), status.as_str())
            .await?;
        info!("Token {} ({}): {} -> {}", record.token_number, id, current.status, status);
        Ok(convert_to_domain_queue_entry(record)?)
    }

    async fn summary(&self, query: QueueQuery) -> Result<QueueSummary, ServiceError> {
        validate_request(&query)?;
        let date = query.date.unwrap_or_else(today);

        let entries = self
            .repository
            .list(&query.doctor_id, &date)
            .await?
            .into_iter()
            .map(convert_to_domain_queue_entry)
            .collect::<Result<Vec<_>, _>>()?;

        let mut by_status: HashMap<QueueStatus, usize> = HashMap::new();
        for entry in &entries {
            *by_status.entry(entry.status).or_default() += 1;
        }

        let counts = QueueStatus::ALL
            .iter()
            .map(|status| QueueStatusTally {
                status: *status,
                count: by_status.get(status).copied().unwrap_or(0),
            })
            .collect();

        // Entries arrive ordered by token
        let current_token = entries
            .iter()
            .filter(|e| e.status == QueueStatus::InConsultation)
            .map(|e| e.token_number)
            .last();
        let next_token = entries
            .iter()
            .find(|e| e.status == QueueStatus::Waiting)
            .map(|e| e.token_number);

        Ok(QueueSummary {
            doctor_id: query.doctor_id,
            queue_date: date,
            total: entries.len(),
            counts,
            current_token,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Fixture;
    use clinic_desk_data::models::appointment::NewAppointment;
    use clinic_desk_data::repository::{AppointmentRepository, AppointmentRepositoryTrait, QueueRepository};

    const DAY: &str = "2026-05-04";

    fn check_in(fixture: &Fixture, patient_id: &str) -> CheckInRequest {
        CheckInRequest {
            clinic_id: fixture.clinic_id.clone(),
            doctor_id: fixture.doctor_id.clone(),
            patient_id: patient_id.to_string(),
            appointment_id: None,
            queue_date: Some(DAY.to_string()),
        }
    }

    fn query(fixture: &Fixture) -> QueueQuery {
        QueueQuery {
            doctor_id: fixture.doctor_id.clone(),
            date: Some(DAY.to_string()),
        }
    }

    fn count(summary: &QueueSummary, status: QueueStatus) -> usize {
        summary
            .counts
            .iter()
            .find(|tally| tally.status == status)
            .map(|tally| tally.count)
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_tokens_and_call_next_flow() {
        let fixture = Fixture::new().await;
        let service = QueueService::new(QueueRepository::new(fixture.pool.clone()));
        let second_patient = fixture.add_patient("Ira").await;

        let first = service.check_in(check_in(&fixture, &fixture.patient_id)).await.unwrap();
        let second = service.check_in(check_in(&fixture, &second_patient)).await.unwrap();
        assert_eq!((first.token_number, second.token_number), (1, 2));
        assert_eq!(first.status, QueueStatus::Waiting);

        let call = CallNextRequest {
            doctor_id: fixture.doctor_id.clone(),
            queue_date: Some(DAY.to_string()),
        };
        let called = service.call_next(call.clone()).await.unwrap();
        assert_eq!(called.token_number, 1);
        assert!(called.called_at.is_some());

        let called = service.call_next(call.clone()).await.unwrap();
        assert_eq!(called.token_number, 2);

        let summary = service.summary(query(&fixture)).await.unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(count(&summary, QueueStatus::Completed), 1);
        assert_eq!(summary.current_token, Some(2));
        assert_eq!(summary.next_token, None);

        // Empty queue: 404 and the current consultation is left alone
        assert!(matches!(service.call_next(call).await, Err(ServiceError::NotFound(_))));
        let summary = service.summary(query(&fixture)).await.unwrap();
        assert_eq!(summary.current_token, Some(2));
    }

    #[tokio::test]
    async fn test_duplicate_check_in_is_conflict() {
        let fixture = Fixture::new().await;
        let service = QueueService::new(QueueRepository::new(fixture.pool.clone()));

        service.check_in(check_in(&fixture, &fixture.patient_id)).await.unwrap();
        assert!(matches!(
            service.check_in(check_in(&fixture, &fixture.patient_id)).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let fixture = Fixture::new().await;
        let service = QueueService::new(QueueRepository::new(fixture.pool.clone()));
        let entry = service.check_in(check_in(&fixture, &fixture.patient_id)).await.unwrap();

        assert!(matches!(
            service.update_status(&entry.id, QueueStatus::Completed).await,
            Err(ServiceError::InvalidState(_))
        ));

        let skipped = service.update_status(&entry.id, QueueStatus::Skipped).await.unwrap();
        assert_eq!(skipped.status, QueueStatus::Skipped);
        let back = service.update_status(&entry.id, QueueStatus::Waiting).await.unwrap();
        assert_eq!(back.status, QueueStatus::Waiting);

        let seen = service.update_status(&entry.id, QueueStatus::InConsultation).await.unwrap();
        assert!(seen.called_at.is_some());
        let done = service.update_status(&entry.id, QueueStatus::Completed).await.unwrap();
        assert!(done.completed_at.is_some());

        assert!(matches!(
            service.update_status("missing", QueueStatus::Waiting).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_appointment_follows_queue() {
        let fixture = Fixture::new().await;
        let appointments = AppointmentRepository::new(fixture.pool.clone());
        let appointment = appointments
            .create(NewAppointment {
                clinic_id: fixture.clinic_id.clone(),
                patient_id: fixture.patient_id.clone(),
                doctor_id: fixture.doctor_id.clone(),
                appointment_date: DAY.to_string(),
                start_time: "10:00".to_string(),
                end_time: None,
                reason: None,
                notes: None,
            })
            .await
            .unwrap();

        let service = QueueService::new(QueueRepository::new(fixture.pool.clone()));
        let mut request = check_in(&fixture, &fixture.patient_id);
        request.appointment_id = Some(appointment.id.clone());
        let entry = service.check_in(request.clone()).await.unwrap();

        let status = appointments.get_by_id(&appointment.id).await.unwrap().unwrap().status;
        assert_eq!(status, "checked_in");

        service.update_status(&entry.id, QueueStatus::InConsultation).await.unwrap();
        service.update_status(&entry.id, QueueStatus::Completed).await.unwrap();
        let status = appointments.get_by_id(&appointment.id).await.unwrap().unwrap().status;
        assert_eq!(status, "completed");

        // The appointment has been used up
        assert!(matches!(
            service.check_in(request).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_queue_date_defaults_to_today() {
        let fixture = Fixture::new().await;
        let service = QueueService::new(QueueRepository::new(fixture.pool.clone()));
        let mut request = check_in(&fixture, &fixture.patient_id);
        request.queue_date = None;

        let entry = service.check_in(request).await.unwrap();
        assert_eq!(entry.queue_date, today());
    }
}

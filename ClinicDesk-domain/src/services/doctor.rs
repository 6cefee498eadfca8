//! Doctors and their weekly consultation windows

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveTime};
use tracing::info;

use clinic_desk_data::models::doctor::{DoctorFields, DoctorFilter, NewTimeSlot};
use clinic_desk_data::repository::{AppointmentRepositoryTrait, DoctorRepositoryTrait};

use super::{validate_each, validate_request, ServiceError};
use crate::entities::conversions::{convert_to_domain_doctor, convert_to_domain_time_slot};
use crate::entities::doctor::{
    AvailableSlot, CreateDoctorRequest, Doctor, DoctorAvailability, DoctorListQuery, ReplaceTimeSlotsRequest,
    TimeSlot, TimeSlotInput, UpdateDoctorRequest,
};
use crate::entities::validators::{parse_date, parse_time};

#[async_trait]
pub trait DoctorServiceTrait: Send + Sync {
    async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, ServiceError>;
    async fn get_doctor(&self, id: &str) -> Result<Doctor, ServiceError>;
    async fn list_doctors(&self, query: DoctorListQuery) -> Result<Vec<Doctor>, ServiceError>;
    async fn update_doctor(&self, id: &str, request: UpdateDoctorRequest) -> Result<Doctor, ServiceError>;
    /// Doctors are never deleted, only hidden from booking
    async fn deactivate_doctor(&self, id: &str) -> Result<(), ServiceError>;

    async fn get_time_slots(&self, doctor_id: &str) -> Result<Vec<TimeSlot>, ServiceError>;

    /// Replace the whole weekly schedule in one transaction
    async fn replace_time_slots(
        &self,
        doctor_id: &str,
        request: ReplaceTimeSlotsRequest,
    ) -> Result<Vec<TimeSlot>, ServiceError>;

    /// Bookable start times on `date`, flagged when already taken
    async fn get_availability(&self, doctor_id: &str, date: &str) -> Result<DoctorAvailability, ServiceError>;
}

pub struct DoctorService<D: DoctorRepositoryTrait, A: AppointmentRepositoryTrait> {
    doctors: D,
    appointments: A,
}

impl<D: DoctorRepositoryTrait, A: AppointmentRepositoryTrait> DoctorService<D, A> {
    pub fn new(doctors: D, appointments: A) -> Self {
        Self { doctors, appointments }
    }

    async fn load(&self, id: &str) -> Result<clinic_desk_data::models::doctor::DoctorRecord, ServiceError> {
        self.doctors
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Doctor with ID {} not found", id)))
    }
}

fn minutes(time: NaiveTime) -> u32 {
    chrono::Timelike::num_seconds_from_midnight(&time) / 60
}

/// Check a weekly schedule: each window is well formed and no two windows on a day overlap
pub fn validate_time_slots(slots: &[TimeSlotInput]) -> Result<(), ServiceError> {
    validate_each("slots", slots)?;

    let mut windows: Vec<(u8, u32, u32, usize)> = Vec::with_capacity(slots.len());
    for (index, slot) in slots.iter().enumerate() {
        let (start, end) = match (parse_time(&slot.start_time), parse_time(&slot.end_time)) {
            (Some(start), Some(end)) => (minutes(start), minutes(end)),
            _ => return Err(ServiceError::Validation(format!("slots[{}]: invalid time", index))),
        };
        if start >= end {
            return Err(ServiceError::Validation(format!(
                "slots[{}]: start_time must be before end_time",
                index
            )));
        }
        if end - start < slot.slot_minutes {
            return Err(ServiceError::Validation(format!(
                "slots[{}]: window is shorter than one {} minute slot",
                index, slot.slot_minutes
            )));
        }
        windows.push((slot.day_of_week, start, end, index));
    }

    windows.sort();
    for pair in windows.windows(2) {
        let (day_a, _, end_a, index_a) = pair[0];
        let (day_b, start_b, _, index_b) = pair[1];
        if day_a == day_b && start_b < end_a {
            return Err(ServiceError::Validation(format!(
                "slots[{}] overlaps slots[{}] on day {}",
                index_b, index_a, day_a
            )));
        }
    }

    Ok(())
}

/// Expand windows into consecutive `slot_minutes` appointments that end within the window
pub fn expand_slots(slots: &[TimeSlot], booked: &[String]) -> Vec<AvailableSlot> {
    let mut result = Vec::new();
    for slot in slots {
        let (Some(start), Some(end)) = (parse_time(&slot.start_time), parse_time(&slot.end_time)) else {
            continue;
        };
        let step = Duration::minutes(i64::from(slot.slot_minutes.max(1)));
        let mut cursor = start;
        while cursor + step <= end && cursor + step > cursor {
            let start_time = cursor.format("%H:%M").to_string();
            result.push(AvailableSlot {
                available: !booked.contains(&start_time),
                start_time,
                end_time: (cursor + step).format("%H:%M").to_string(),
            });
            cursor += step;
        }
    }
    result.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    result
}

#[async_trait]
impl<D, A> DoctorServiceTrait for DoctorService<D, A>
where
    D: DoctorRepositoryTrait,
    A: AppointmentRepositoryTrait,
{
    async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, ServiceError> {
        validate_request(&request)?;

        let record = self
            .doctors
            .create(DoctorFields {
                clinic_id: request.clinic_id,
                name: request.name,
                specialization: request.specialization,
                registration_number: request.registration_number,
                phone: request.phone,
                email: request.email,
                consultation_fee: request.consultation_fee,
                active: true,
            })
            .await?;

        info!("Created doctor {} at clinic {}", record.id, record.clinic_id);
        Ok(convert_to_domain_doctor(record))
    }

    async fn get_doctor(&self, id: &str) -> Result<Doctor, ServiceError> {
        Ok(convert_to_domain_doctor(self.load(id).await?))
    }

    async fn list_doctors(&self, query: DoctorListQuery) -> Result<Vec<Doctor>, ServiceError> {
        let records = self
            .doctors
            .list(DoctorFilter {
                clinic_id: query.clinic_id,
                active: query.active,
            })
            .await?;
        Ok(records.into_iter().map(convert_to_domain_doctor).collect())
    }

    async fn update_doctor(&self, id: &str, request: UpdateDoctorRequest) -> Result<Doctor, ServiceError> {
        validate_request(&request)?;

        let current = self.load(id).await?;
        let fields = DoctorFields {
            clinic_id: current.clinic_id,
            name: request.name.unwrap_or(current.name),
            specialization: request.specialization.or(current.specialization),
            registration_number: request.registration_number.or(current.registration_number),
            phone: request.phone.or(current.phone),
            email: request.email.or(current.email),
            consultation_fee: request.consultation_fee.or(current.consultation_fee),
            active: request.active.unwrap_or(current.active),
        };

        let record = self
            .doctors
            .update(id, fields)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Doctor with ID {} not found", id)))?;
        Ok(convert_to_domain_doctor(record))
    }

    async fn deactivate_doctor(&self, id: &str) -> Result<(), ServiceError> {
        if !self.doctors.deactivate(id).await? {
            return Err(ServiceError::NotFound(format!("Doctor with ID {} not found", id)));
        }
        info!("Deactivated doctor {}", id);
        Ok(())
    }

    async fn get_time_slots(&self, doctor_id: &str) -> Result<Vec<TimeSlot>, ServiceError> {
        self.load(doctor_id).await?;
        let records = self.doctors.get_time_slots(doctor_id).await?;
        Ok(records.into_iter().map(convert_to_domain_time_slot).collect())
    }

    async fn replace_time_slots(
        &self,
        doctor_id: &str,
        request: ReplaceTimeSlotsRequest,
    ) -> Result<Vec<TimeSlot>, ServiceError> {
        validate_time_slots(&request.slots)?;
        self.load(doctor_id).await?;

        let slots = request
            .slots
            .into_iter()
            .map(|slot| NewTimeSlot {
                day_of_week: slot.day_of_week,
                start_time: slot.start_time,
                end_time: slot.end_time,
                slot_minutes: slot.slot_minutes,
            })
            .collect();

        let records = self.doctors.replace_time_slots(doctor_id, slots).await?;
        info!("Replaced time slots of doctor {} ({} windows)", doctor_id, records.len());
        Ok(records.into_iter().map(convert_to_domain_time_slot).collect())
    }

    async fn get_availability(&self, doctor_id: &str, date: &str) -> Result<DoctorAvailability, ServiceError> {
        let day = parse_date(date)
            .ok_or_else(|| ServiceError::Validation(format!("date: Invalid date {}, expected YYYY-MM-DD", date)))?;
        let doctor = self.load(doctor_id).await?;
        let day_of_week = day.weekday().num_days_from_monday() as u8;

        let slots = if doctor.active {
            let windows: Vec<TimeSlot> = self
                .doctors
                .get_time_slots(doctor_id)
                .await?
                .into_iter()
                .filter(|slot| slot.day_of_week == day_of_week)
                .map(convert_to_domain_time_slot)
                .collect();
            let booked = self.appointments.booked_start_times(doctor_id, date).await?;
            expand_slots(&windows, &booked)
        } else {
            Vec::new()
        };

        Ok(DoctorAvailability {
            doctor_id: doctor_id.to_string(),
            date: date.to_string(),
            day_of_week,
            slots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Fixture;
    use clinic_desk_data::models::appointment::NewAppointment;
    use clinic_desk_data::repository::{AppointmentRepository, DoctorRepository};

    fn slot(day: u8, start: &str, end: &str, minutes: u32) -> TimeSlotInput {
        TimeSlotInput {
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            slot_minutes: minutes,
        }
    }

    fn service(fixture: &Fixture) -> DoctorService<DoctorRepository, AppointmentRepository> {
        DoctorService::new(
            DoctorRepository::new(fixture.pool.clone()),
            AppointmentRepository::new(fixture.pool.clone()),
        )
    }

    #[test]
    fn test_overlapping_slots_rejected() {
        let err = validate_time_slots(&[slot(0, "09:00", "12:00", 15), slot(0, "11:30", "13:00", 15)]).unwrap_err();
        assert!(err.to_string().contains("overlaps"));

        // Same hours on different days are fine, as are back-to-back windows
        validate_time_slots(&[
            slot(0, "09:00", "12:00", 15),
            slot(1, "09:00", "12:00", 15),
            slot(0, "12:00", "13:00", 15),
        ])
        .unwrap();
    }

    #[test]
    fn test_inverted_or_short_window_rejected() {
        assert!(validate_time_slots(&[slot(2, "12:00", "09:00", 15)]).is_err());
        assert!(validate_time_slots(&[slot(2, "09:00", "09:10", 15)]).is_err());
        assert!(validate_time_slots(&[slot(7, "09:00", "10:00", 15)]).is_err());
    }

    #[test]
    fn test_expand_slots_marks_booked() {
        let windows = vec![TimeSlot {
            id: "s1".to_string(),
            day_of_week: 0,
            start_time: "09:00".to_string(),
            end_time: "10:10".to_string(),
            slot_minutes: 20,
        }];
        let expanded = expand_slots(&windows, &["09:20".to_string()]);

        let starts: Vec<&str> = expanded.iter().map(|s| s.start_time.as_str()).collect();
        assert_eq!(starts, vec!["09:00", "09:20", "09:40"]);
        assert_eq!(expanded[2].end_time, "10:00");
        assert!(expanded[0].available);
        assert!(!expanded[1].available);
    }

    #[tokio::test]
    async fn test_replace_and_availability() {
        let fixture = Fixture::new().await;
        let service = service(&fixture);

        // 2026-03-16 is a Monday
        service
            .replace_time_slots(
                &fixture.doctor_id,
                ReplaceTimeSlotsRequest {
                    slots: vec![slot(0, "09:00", "10:00", 30), slot(2, "17:00", "18:00", 15)],
                },
            )
            .await
            .unwrap();

        AppointmentRepository::new(fixture.pool.clone())
            .create(NewAppointment {
                clinic_id: fixture.clinic_id.clone(),
                patient_id: fixture.patient_id.clone(),
                doctor_id: fixture.doctor_id.clone(),
                appointment_date: "2026-03-16".to_string(),
                start_time: "09:30".to_string(),
                end_time: None,
                reason: None,
                notes: None,
            })
            .await
            .unwrap();

        let availability = service.get_availability(&fixture.doctor_id, "2026-03-16").await.unwrap();
        assert_eq!(availability.day_of_week, 0);
        assert_eq!(
            availability.slots,
            vec![
                AvailableSlot {
                    start_time: "09:00".to_string(),
                    end_time: "09:30".to_string(),
                    available: true
                },
                AvailableSlot {
                    start_time: "09:30".to_string(),
                    end_time: "10:00".to_string(),
                    available: false
                },
            ]
        );

        // Tuesday has no windows
        let tuesday = service.get_availability(&fixture.doctor_id, "2026-03-17").await.unwrap();
        assert!(tuesday.slots.is_empty());

        // Replacing again drops the old schedule
        let slots = service
            .replace_time_slots(
                &fixture.doctor_id,
                ReplaceTimeSlotsRequest {
                    slots: vec![slot(4, "10:00", "11:00", 10)],
                },
            )
            .await
            .unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(service.get_time_slots(&fixture.doctor_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deactivated_doctor_has_no_availability() {
        let fixture = Fixture::new().await;
        let service = service(&fixture);
        service
            .replace_time_slots(
                &fixture.doctor_id,
                ReplaceTimeSlotsRequest {
                    slots: vec![slot(0, "09:00", "10:00", 30)],
                },
            )
            .await
            .unwrap();

        service.deactivate_doctor(&fixture.doctor_id).await.unwrap();
        let doctor = service.get_doctor(&fixture.doctor_id).await.unwrap();
        assert!(!doctor.active);

        let availability = service.get_availability(&fixture.doctor_id, "2026-03-16").await.unwrap();
        assert!(availability.slots.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_doctor_not_found() {
        let fixture = Fixture::new().await;
        let service = service(&fixture);
        assert!(matches!(
            service.get_time_slots("missing").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.get_availability("missing", "2026-03-16").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}

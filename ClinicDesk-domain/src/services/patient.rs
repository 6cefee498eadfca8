use std::env;

use async_trait::async_trait;
use tracing::info;

use clinic_desk_data::models::patient::{PatientFields, PatientFilter};
use clinic_desk_data::repository::PatientRepositoryTrait;

use super::{page_limit, validate_request, ServiceError};
use crate::entities::conversions::convert_to_domain_patient;
use crate::entities::patient::{Patient, PatientSearchQuery, RegisterPatientRequest, UpdatePatientRequest};

/// Default first characters of every UHID
pub const DEFAULT_UHID_PREFIX: &str = "UH";

/// UHID prefix for patients registered today: `{UHID_PREFIX}{YYYYMMDD}`
pub fn uhid_prefix_for_today() -> String {
    let prefix = env::var("UHID_PREFIX")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_UHID_PREFIX.to_string());
    format!("{}{}", prefix.trim(), chrono::Local::now().format("%Y%m%d"))
}

/// Trait for patient registration and lookup
#[async_trait]
pub trait PatientServiceTrait: Send + Sync {
    async fn register_patient(&self, request: RegisterPatientRequest) -> Result<Patient, ServiceError>;
    async fn get_patient(&self, id: &str) -> Result<Patient, ServiceError>;
    /// One page of matches and the total number of matches
    async fn search_patients(&self, query: PatientSearchQuery) -> Result<(Vec<Patient>, usize), ServiceError>;
    async fn update_patient(&self, id: &str, request: UpdatePatientRequest) -> Result<Patient, ServiceError>;
    async fn delete_patient(&self, id: &str) -> Result<(), ServiceError>;
}

pub struct PatientService<R: PatientRepositoryTrait> {
    repository: R,
}

impl<R: PatientRepositoryTrait> PatientService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Patient with ID {} not found", id))
}

#[async_trait]
impl<R: PatientRepositoryTrait> PatientServiceTrait for PatientService<R> {
    async fn register_patient(&self, request: RegisterPatientRequest) -> Result<Patient, ServiceError> {
        validate_request(&request)?;

        let fields = PatientFields {
            clinic_id: request.clinic_id,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            gender: request.gender,
            date_of_birth: request.date_of_birth,
            phone: request.phone,
            email: request.email,
            address: request.address,
            blood_group: request.blood_group,
        };

        let record = self.repository.create(fields, &uhid_prefix_for_today()).await?;
        info!("Registered patient {} with UHID {}", record.id, record.uhid);
        Ok(convert_to_domain_patient(record))
    }

    async fn get_patient(&self, id: &str) -> Result<Patient, ServiceError> {
        let record = self.repository.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_patient(record))
    }

    async fn search_patients(&self, query: PatientSearchQuery) -> Result<(Vec<Patient>, usize), ServiceError> {
        let filter = PatientFilter {
            clinic_id: query.clinic_id,
            query: query.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            limit: Some(page_limit(query.limit)),
            offset: query.offset,
        };

        let (records, total) = self.repository.search(filter).await?;
        Ok((records.into_iter().map(convert_to_domain_patient).collect(), total))
    }

    async fn update_patient(&self, id: &str, request: UpdatePatientRequest) -> Result<Patient, ServiceError> {
        validate_request(&request)?;

        let current = self.repository.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        let fields = PatientFields {
            clinic_id: current.clinic_id,
            first_name: request.first_name.unwrap_or(current.first_name),
            last_name: request.last_name.unwrap_or(current.last_name),
            gender: request.gender.unwrap_or(current.gender),
            date_of_birth: request.date_of_birth.or(current.date_of_birth),
            phone: request.phone.or(current.phone),
            email: request.email.or(current.email),
            address: request.address.or(current.address),
            blood_group: request.blood_group.or(current.blood_group),
        };

        let record = self.repository.update(id, fields).await?.ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_patient(record))
    }

    async fn delete_patient(&self, id: &str) -> Result<(), ServiceError> {
        if !self.repository.delete(id).await? {
            return Err(not_found(id));
        }
        info!("Deleted patient {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Fixture;
    use clinic_desk_data::repository::PatientRepository;

    fn request(clinic_id: &str, first_name: &str) -> RegisterPatientRequest {
        RegisterPatientRequest {
            clinic_id: clinic_id.to_string(),
            first_name: first_name.to_string(),
            last_name: "Sharma".to_string(),
            gender: "female".to_string(),
            date_of_birth: Some("1985-11-23".to_string()),
            phone: Some("+919812345678".to_string()),
            email: None,
            address: None,
            blood_group: Some("B+".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_assigns_sequential_uhid() {
        let fixture = Fixture::new().await;
        let service = PatientService::new(PatientRepository::new(fixture.pool.clone()));

        let first = service.register_patient(request(&fixture.clinic_id, "Kavya")).await.unwrap();
        let second = service.register_patient(request(&fixture.clinic_id, "Nisha")).await.unwrap();

        let prefix = uhid_prefix_for_today();
        assert!(first.uhid.starts_with(&prefix));
        assert_eq!(first.uhid.len(), prefix.len() + 4);
        assert_eq!(&first.uhid[prefix.len()..], "0001");
        assert_eq!(&second.uhid[prefix.len()..], "0002");
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_fields() {
        let fixture = Fixture::new().await;
        let service = PatientService::new(PatientRepository::new(fixture.pool.clone()));

        let mut bad = request(&fixture.clinic_id, "Kavya");
        bad.gender = "unknown".to_string();
        bad.date_of_birth = Some("2999-01-01".to_string());
        let err = service.register_patient(bad).await.unwrap_err();
        match err {
            ServiceError::Validation(message) => {
                assert!(message.contains("gender"));
                assert!(message.contains("date_of_birth"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_update_delete() {
        let fixture = Fixture::new().await;
        let service = PatientService::new(PatientRepository::new(fixture.pool.clone()));
        let kavya = service.register_patient(request(&fixture.clinic_id, "Kavya")).await.unwrap();

        let (found, total) = service
            .search_patients(PatientSearchQuery {
                clinic_id: Some(fixture.clinic_id.clone()),
                q: Some(" kav ".to_string()),
                limit: None,
                offset: None,
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, kavya.id);

        let updated = service
            .update_patient(
                &kavya.id,
                UpdatePatientRequest {
                    address: Some("12 MG Road, Pune".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.address.as_deref(), Some("12 MG Road, Pune"));
        assert_eq!(updated.first_name, "Kavya");
        assert_eq!(updated.uhid, kavya.uhid);

        service.delete_patient(&kavya.id).await.unwrap();
        assert!(matches!(service.get_patient(&kavya.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete_patient(&kavya.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_register_at_unknown_clinic_fails() {
        let fixture = Fixture::new().await;
        let service = PatientService::new(PatientRepository::new(fixture.pool.clone()));
        assert!(service.register_patient(request("no-such-clinic", "Kavya")).await.is_err());
    }
}

use async_trait::async_trait;
use tracing::info;

use clinic_desk_data::models::insurance::InsurancePolicyFields;
use clinic_desk_data::repository::InsuranceRepositoryTrait;

use super::{validate_request, ServiceError};
use crate::entities::conversions::convert_to_domain_insurance_policy;
use crate::entities::insurance::{
    CreateInsurancePolicyRequest, InsurancePolicy, InsuranceQuery, PolicyStatus, UpdateInsurancePolicyRequest,
};

#[async_trait]
pub trait InsuranceServiceTrait: Send + Sync {
    async fn create_policy(
        &self,
        patient_id: &str,
        request: CreateInsurancePolicyRequest,
    ) -> Result<InsurancePolicy, ServiceError>;
    async fn get_policy(&self, id: &str) -> Result<InsurancePolicy, ServiceError>;
    async fn list_policies(&self, patient_id: &str, query: InsuranceQuery) -> Result<Vec<InsurancePolicy>, ServiceError>;
    async fn update_policy(
        &self,
        id: &str,
        request: UpdateInsurancePolicyRequest,
    ) -> Result<InsurancePolicy, ServiceError>;
    async fn delete_policy(&self, id: &str) -> Result<(), ServiceError>;
}

pub struct InsuranceService<R: InsuranceRepositoryTrait> {
    repository: R,
}

impl<R: InsuranceRepositoryTrait> InsuranceService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Insurance policy with ID {} not found", id))
}

fn check_validity(valid_from: &str, valid_until: &str) -> Result<(), ServiceError> {
    if valid_until < valid_from {
        return Err(ServiceError::Validation(
            "valid_until: Policy cannot end before it starts".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl<R: InsuranceRepositoryTrait> InsuranceServiceTrait for InsuranceService<R> {
    async fn create_policy(
        &self,
        patient_id: &str,
        request: CreateInsurancePolicyRequest,
    ) -> Result<InsurancePolicy, ServiceError> {
        validate_request(&request)?;
        check_validity(&request.valid_from, &request.valid_until)?;

        let record = self
            .repository
            .create(InsurancePolicyFields {
                patient_id: patient_id.to_string(),
                provider_name: request.provider_name,
                policy_number: request.policy_number,
                valid_from: request.valid_from,
                valid_until: request.valid_until,
                coverage_amount: request.coverage_amount,
                status: request.status.unwrap_or(PolicyStatus::Active).as_str().to_string(),
            })
            .await?;

        info!("Added {} policy {} for patient {}", record.provider_name, record.id, patient_id);
        Ok(convert_to_domain_insurance_policy(record)?)
    }

    async fn get_policy(&self, id: &str) -> Result<InsurancePolicy, ServiceError> {
        let record = self.repository.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_insurance_policy(record)?)
    }

    async fn list_policies(&self, patient_id: &str, query: InsuranceQuery) -> Result<Vec<InsurancePolicy>, ServiceError> {
        validate_request(&query)?;
        let records = self
            .repository
            .list_by_patient(patient_id, query.active_on.as_deref())
            .await?;
        Ok(records
            .into_iter()
            .map(convert_to_domain_insurance_policy)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_policy(
        &self,
        id: &str,
        request: UpdateInsurancePolicyRequest,
    ) -> Result<InsurancePolicy, ServiceError> {
        validate_request(&request)?;

        let current = self.repository.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        let fields = InsurancePolicyFields {
            patient_id: current.patient_id,
            provider_name: request.provider_name.unwrap_or(current.provider_name),
            policy_number: request.policy_number.unwrap_or(current.policy_number),
            valid_from: request.valid_from.unwrap_or(current.valid_from),
            valid_until: request.valid_until.unwrap_or(current.valid_until),
            coverage_amount: request.coverage_amount.or(current.coverage_amount),
            status: request.status.map(|s| s.as_str().to_string()).unwrap_or(current.status),
        };
        check_validity(&fields.valid_from, &fields.valid_until)?;

        let record = self.repository.update(id, fields).await?.ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_insurance_policy(record)?)
    }

    async fn delete_policy(&self, id: &str) -> Result<(), ServiceError> {
        if !self.repository.delete(id).await? {
            return Err(not_found(id));
        }
        info!("Deleted insurance policy {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Fixture;
    use clinic_desk_data::repository::InsuranceRepository;

    fn policy(number: &str, from: &str, until: &str) -> CreateInsurancePolicyRequest {
        CreateInsurancePolicyRequest {
            provider_name: "Star Health".to_string(),
            policy_number: number.to_string(),
            valid_from: from.to_string(),
            valid_until: until.to_string(),
            coverage_amount: Some(500000.0),
            status: None,
        }
    }

    #[tokio::test]
    async fn test_validity_window_checked() {
        let fixture = Fixture::new().await;
        let service = InsuranceService::new(InsuranceRepository::new(fixture.pool.clone()));

        let err = service
            .create_policy(&fixture.patient_id, policy("SH-1", "2026-06-01", "2026-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.starts_with("valid_until")));

        let created = service
            .create_policy(&fixture.patient_id, policy("SH-1", "2026-01-01", "2026-12-31"))
            .await
            .unwrap();
        assert_eq!(created.status, PolicyStatus::Active);

        // Moving the start past the end is caught on update too
        let err = service
            .update_policy(
                &created.id,
                UpdateInsurancePolicyRequest {
                    valid_from: Some("2027-02-01".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_active_on_filter() {
        let fixture = Fixture::new().await;
        let service = InsuranceService::new(InsuranceRepository::new(fixture.pool.clone()));
        service
            .create_policy(&fixture.patient_id, policy("SH-2025", "2025-01-01", "2025-12-31"))
            .await
            .unwrap();
        let current = service
            .create_policy(&fixture.patient_id, policy("SH-2026", "2026-01-01", "2026-12-31"))
            .await
            .unwrap();

        let all = service
            .list_policies(&fixture.patient_id, InsuranceQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let active = service
            .list_policies(
                &fixture.patient_id,
                InsuranceQuery {
                    active_on: Some("2026-07-15".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, current.id);

        service
            .update_policy(
                &current.id,
                UpdateInsurancePolicyRequest {
                    status: Some(PolicyStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let active = service
            .list_policies(
                &fixture.patient_id,
                InsuranceQuery {
                    active_on: Some("2026-07-15".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_policy_number_is_conflict() {
        let fixture = Fixture::new().await;
        let service = InsuranceService::new(InsuranceRepository::new(fixture.pool.clone()));
        service
            .create_policy(&fixture.patient_id, policy("SH-9", "2026-01-01", "2026-12-31"))
            .await
            .unwrap();
        let other_patient = fixture.add_patient("Leela").await;
        assert!(matches!(
            service
                .create_policy(&other_patient, policy("SH-9", "2026-01-01", "2026-12-31"))
                .await,
            Err(ServiceError::Conflict(_))
        ));
    }
}

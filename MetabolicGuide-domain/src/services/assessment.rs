use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::entities::conversions;
use crate::entities::{
    AssessmentRequest, MetabolicMetrics, PatientAssessment, PatientProfile, PatientRecord,
};
use crate::services::metrics::{preview_metrics, MetricsError, MetricsPreviewRequest};
use crate::services::recommendations::{RecommendationOutcome, RecommendationService};
use metabolic_guide_data::repository::{
    PatientRecordRepository, PatientRecordRepositoryTrait, RepositoryError,
};

/// Message returned when an anonymous caller tries to save
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please login to save results";

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

/// Assessment service errors
#[derive(Debug, Error)]
pub enum AssessmentServiceError {
    /// Missing or out-of-range input, or an anonymous save
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Metric arithmetic has no defined result
    #[error("Calculation error: {0}")]
    DomainError(String),

    /// Storage failure
    #[error("Storage error: {0}")]
    BackendError(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

impl From<MetricsError> for AssessmentServiceError {
    fn from(error: MetricsError) -> Self {
        AssessmentServiceError::DomainError(error.to_string())
    }
}

/// One page of saved records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RecordPage {
    pub records: Vec<PatientRecord>,
    /// Number of records matching the search, across all pages
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Records whose row text contains `term`, case-insensitively, in their
/// original order
pub fn filter_records(records: Vec<PatientRecord>, term: &str) -> Vec<PatientRecord> {
    records.into_iter().filter(|record| record.matches(term)).collect()
}

/// Trait for assessment service operations
#[async_trait]
pub trait AssessmentServiceTrait: Send + Sync {
    /// Check a form submission and turn it into a patient profile
    fn validate_request(&self, request: AssessmentRequest) -> Result<PatientProfile, AssessmentServiceError>;

    /// Validate and compute metrics and risk
    fn assess(&self, request: AssessmentRequest) -> Result<PatientAssessment, AssessmentServiceError>;

    /// Metrics for partially filled input, if all five values are usable
    fn preview(&self, request: &MetricsPreviewRequest) -> Option<MetabolicMetrics>;

    /// Recommendations for an assessment; never fails
    async fn recommend(&self, assessment: &PatientAssessment) -> RecommendationOutcome;

    /// Persist an assessment for the signed-in user
    async fn save_record(
        &self,
        user: Option<&CurrentUser>,
        assessment: &PatientAssessment,
        recommendations_html: Option<String>,
    ) -> Result<PatientRecord, AssessmentServiceError>;

    /// Saved records, newest first, optionally narrowed by a search term
    async fn list_records(
        &self,
        search: Option<&str>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<RecordPage, AssessmentServiceError>;

    /// Every saved record, newest first
    async fn all_records(&self) -> Result<Vec<PatientRecord>, AssessmentServiceError>;

    async fn get_record(&self, id: &str) -> Result<PatientRecord, AssessmentServiceError>;

    /// Name of the record storage backend
    fn storage_backend(&self) -> &'static str;

    /// Whether an external recommendation backend is configured
    fn recommendations_configured(&self) -> bool;
}

/// Assessment service for domain logic
pub struct AssessmentService<R: PatientRecordRepositoryTrait> {
    repository: R,
    recommendations: RecommendationService,
}

impl<R: PatientRecordRepositoryTrait> AssessmentService<R> {
    pub fn new(repository: R, recommendations: RecommendationService) -> Self {
        Self {
            repository,
            recommendations,
        }
    }

    /// Map repository errors to service errors
    fn map_repo_error(&self, err: RepositoryError) -> AssessmentServiceError {
        match err {
            RepositoryError::NotFound(msg) => AssessmentServiceError::NotFound(msg),
            RepositoryError::Validation(msg) => AssessmentServiceError::ValidationError(msg),
            _ => {
                error!("Record storage failed: {}", err);
                AssessmentServiceError::BackendError(err.to_string())
            }
        }
    }
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    fields
        .into_iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .map(|err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid {}", field),
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl<R: PatientRecordRepositoryTrait + Send + Sync> AssessmentServiceTrait for AssessmentService<R> {
    fn validate_request(&self, request: AssessmentRequest) -> Result<PatientProfile, AssessmentServiceError> {
        let request = request.normalized();

        if let Err(errors) = request.validate() {
            let message = validation_message(&errors);
            warn!("Assessment request rejected: {}", message);
            return Err(AssessmentServiceError::ValidationError(message));
        }

        match request {
            AssessmentRequest {
                full_name: Some(full_name),
                age: Some(age),
                gender: Some(gender),
                weight: Some(weight),
                height: Some(height),
                fasting_glucose: Some(fasting_glucose),
                triglycerides: Some(triglycerides),
                hdl: Some(hdl),
                hba1c: Some(hba1c),
                diabetes_status: Some(diabetes_status),
            } => Ok(PatientProfile {
                full_name,
                age,
                gender,
                weight,
                height,
                fasting_glucose,
                triglycerides,
                hdl,
                hba1c,
                diabetes_status,
            }),
            _ => Err(AssessmentServiceError::ValidationError(
                "All fields are required".to_string(),
            )),
        }
    }

    fn assess(&self, request: AssessmentRequest) -> Result<PatientAssessment, AssessmentServiceError> {
        let profile = self.validate_request(request)?;
        let assessment = PatientAssessment::from_profile(profile)?;
        debug!(
            "Assessed patient: bmi={} tyg={} ratio={} risk={}",
            assessment.metrics().bmi,
            assessment.metrics().tyg_index,
            assessment.metrics().tg_hdl_ratio,
            assessment.risk()
        );
        Ok(assessment)
    }

    fn preview(&self, request: &MetricsPreviewRequest) -> Option<MetabolicMetrics> {
        preview_metrics(request)
    }

    async fn recommend(&self, assessment: &PatientAssessment) -> RecommendationOutcome {
        self.recommendations.generate(assessment).await
    }

    async fn save_record(
        &self,
        user: Option<&CurrentUser>,
        assessment: &PatientAssessment,
        recommendations_html: Option<String>,
    ) -> Result<PatientRecord, AssessmentServiceError> {
        let Some(user) = user else {
            warn!("Rejected anonymous save");
            return Err(AssessmentServiceError::ValidationError(
                LOGIN_REQUIRED_MESSAGE.to_string(),
            ));
        };

        let request = conversions::convert_to_data_create_request(
            assessment,
            recommendations_html,
            &user.email,
            Utc::now(),
        );

        let saved = self
            .repository
            .insert(request, user.session_token.as_deref())
            .await
            .map_err(|e| self.map_repo_error(e))?;

        info!("Saved patient record {} for {}", saved.id, user.email);
        Ok(conversions::convert_to_domain_record(saved))
    }

    async fn list_records(
        &self,
        search: Option<&str>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<RecordPage, AssessmentServiceError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0);
        let term = search.map(str::trim).unwrap_or_default();

        let (records, total) = if term.is_empty() {
            let (page, total) = self
                .repository
                .list_paginated(limit, offset)
                .await
                .map_err(|e| self.map_repo_error(e))?;
            (
                page.into_iter()
                    .map(conversions::convert_to_domain_record)
                    .collect::<Vec<_>>(),
                total,
            )
        } else {
            let matching = filter_records(self.all_records().await?, term);
            let total = matching.len();
            (matching.into_iter().skip(offset).take(limit).collect(), total)
        };

        debug!("Listed {} of {} records (search: {:?})", records.len(), total, term);
        Ok(RecordPage {
            records,
            total,
            limit,
            offset,
        })
    }

    async fn all_records(&self) -> Result<Vec<PatientRecord>, AssessmentServiceError> {
        let records = self
            .repository
            .list()
            .await
            .map_err(|e| self.map_repo_error(e))?;
        Ok(records.into_iter().map(conversions::convert_to_domain_record).collect())
    }

    async fn get_record(&self, id: &str) -> Result<PatientRecord, AssessmentServiceError> {
        self.repository
            .get_by_id(id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .map(conversions::convert_to_domain_record)
            .ok_or_else(|| AssessmentServiceError::NotFound(id.to_string()))
    }

    fn storage_backend(&self) -> &'static str {
        self.repository.backend_name()
    }

    fn recommendations_configured(&self) -> bool {
        self.recommendations.is_configured()
    }
}

/// Assessment service over the chosen record store
pub fn create_default_assessment_service(
    repository: PatientRecordRepository,
    recommendations: RecommendationService,
) -> impl AssessmentServiceTrait {
    AssessmentService::new(repository, recommendations)
}

/// Assessment service over a mock repository, for tests
#[cfg(feature = "mock")]
pub fn create_mock_assessment_service() -> impl AssessmentServiceTrait {
    AssessmentService::new(
        metabolic_guide_data::repository::tests::MockPatientRecordRepository::new(),
        RecommendationService::rules_only(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::patient_record::sample_record;
    use crate::services::recommendations::RecommendationSource;
    use metabolic_guide_data::repository::tests::MockPatientRecordRepository;

    fn service(repo: MockPatientRecordRepository) -> AssessmentService<MockPatientRecordRepository> {
        AssessmentService::new(repo, RecommendationService::rules_only())
    }

    fn complete_request() -> AssessmentRequest {
        AssessmentRequest {
            full_name: Some(" Jane Doe ".to_string()),
            age: Some(52),
            gender: Some("Female".to_string()),
            weight: Some(70.0),
            height: Some(1.75),
            fasting_glucose: Some(100.0),
            triglycerides: Some(150.0),
            hdl: Some(50.0),
            hba1c: Some(5.6),
            diabetes_status: Some("No".to_string()),
        }
    }

    fn user() -> CurrentUser {
        CurrentUser::new("doc@example.org")
    }

    #[test]
    fn test_assess_complete_request() {
        let service = service(MockPatientRecordRepository::new());
        let assessment = service.assess(complete_request()).unwrap();
        assert_eq!(assessment.profile().full_name, "Jane Doe");
        assert_eq!(assessment.metrics().bmi, 22.9);
        assert_eq!(assessment.risk().level(), "High Risk");
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let service = service(MockPatientRecordRepository::new());
        let mut request = complete_request();
        request.gender = Some("  ".to_string());
        request.hdl = None;

        match service.validate_request(request) {
            Err(AssessmentServiceError::ValidationError(message)) => {
                assert_eq!(message, "gender: Gender is required; hdl: HDL is required");
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_value_is_rejected() {
        let service = service(MockPatientRecordRepository::new());
        let mut request = complete_request();
        request.height = Some(175.0);

        let err = service.assess(request).unwrap_err();
        assert!(matches!(err, AssessmentServiceError::ValidationError(ref m) if m.starts_with("height:")));
    }

    #[tokio::test]
    async fn test_save_without_user_persists_nothing() {
        let repo = MockPatientRecordRepository::new();
        let service = service(repo.clone());
        let assessment = service.assess(complete_request()).unwrap();

        let err = service.save_record(None, &assessment, None).await.unwrap_err();
        match err {
            AssessmentServiceError::ValidationError(message) => {
                assert_eq!(message, LOGIN_REQUIRED_MESSAGE)
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_save_record_for_user() {
        let repo = MockPatientRecordRepository::new();
        let service = service(repo.clone());
        let assessment = service.assess(complete_request()).unwrap();
        let outcome = service.recommend(&assessment).await;
        assert_eq!(outcome.source, RecommendationSource::Rules);

        let record = service
            .save_record(Some(&user()), &assessment, Some(outcome.html.clone()))
            .await
            .unwrap();

        assert_eq!(repo.len(), 1);
        assert_eq!(record.created_by, "doc@example.org");
        assert_eq!(record.risk_level, "High Risk");
        assert_eq!(record.ai_recommendations, Some(outcome.html));
        assert_eq!(service.get_record(&record.id).await.unwrap(), record);
        assert_eq!(repo.session_tokens(), vec![None]);
    }

    #[tokio::test]
    async fn test_save_passes_user_session_to_store() {
        let repo = MockPatientRecordRepository::new();
        let service = service(repo.clone());
        let assessment = service.assess(complete_request()).unwrap();
        let user = CurrentUser {
            email: "doc@example.org".to_string(),
            session_token: Some("remote-session".to_string()),
        };

        service.save_record(Some(&user), &assessment, None).await.unwrap();

        assert_eq!(repo.session_tokens(), vec![Some("remote-session".to_string())]);
    }

    #[tokio::test]
    async fn test_backend_failure_is_surfaced() {
        let service = service(MockPatientRecordRepository::failing("store offline"));
        let assessment = service.assess(complete_request()).unwrap();

        let err = service
            .save_record(Some(&user()), &assessment, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentServiceError::BackendError(ref m) if m.contains("store offline")));
        assert!(matches!(
            service.list_records(None, None, None).await,
            Err(AssessmentServiceError::BackendError(_))
        ));
    }

    #[tokio::test]
    async fn test_list_records_with_search_and_paging() {
        let repo = MockPatientRecordRepository::with_records(vec![
            sample_record("3", "Carol King", "2024-03-01T00:00:00Z"),
            sample_record("2", "Bob Stone", "2024-02-01T00:00:00Z"),
            sample_record("1", "Caroline Moss", "2024-01-01T00:00:00Z"),
        ]
        .into_iter()
        .map(conversions::convert_to_data_record)
        .collect());
        let service = service(repo);

        let page = service.list_records(Some(" carol "), Some(1), None).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id, "3");

        let page = service.list_records(Some("carol"), Some(1), Some(1)).await.unwrap();
        assert_eq!(page.records[0].id, "1");

        let page = service.list_records(None, None, None).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
        let ids: Vec<&str> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[tokio::test]
    async fn test_get_unknown_record() {
        let service = service(MockPatientRecordRepository::new());
        assert!(matches!(
            service.get_record("missing").await,
            Err(AssessmentServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_preview_needs_all_values() {
        let service = service(MockPatientRecordRepository::new());
        let mut request = MetricsPreviewRequest {
            weight: Some(70.0),
            height: Some(1.75),
            fasting_glucose: Some(100.0),
            triglycerides: Some(150.0),
            hdl: None,
        };
        assert_eq!(service.preview(&request), None);

        request.hdl = Some(50.0);
        assert_eq!(service.preview(&request).map(|m| m.tg_hdl_ratio), Some(3.0));
    }
}

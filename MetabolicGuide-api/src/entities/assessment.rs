use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use metabolic_guide_domain::entities::{
    AssessmentRequest, MetabolicMetrics, PatientAssessment, PatientProfile, RiskCategory,
};
use metabolic_guide_domain::services::recommendations::{RecommendationOutcome, RecommendationSource};

/// Risk tier with its display strings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RiskSummary {
    pub category: RiskCategory,
    /// e.g. "Moderate Risk"
    pub level: String,
    pub description: String,
}

impl From<RiskCategory> for RiskSummary {
    fn from(category: RiskCategory) -> Self {
        Self {
            category,
            level: category.level().to_string(),
            description: category.description().to_string(),
        }
    }
}

/// Result of a submitted assessment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssessmentResponse {
    pub patient: PatientProfile,
    pub metrics: MetabolicMetrics,
    pub risk: RiskSummary,
    /// Recommendation HTML, from the AI backend or the rule table
    pub recommendations_html: String,
    pub recommendations_source: RecommendationSource,
    /// Set when the AI backend failed and the rule table was used instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations_error: Option<String>,
}

impl AssessmentResponse {
    pub fn new(assessment: &PatientAssessment, recommendations: RecommendationOutcome) -> Self {
        Self {
            patient: assessment.profile().clone(),
            metrics: *assessment.metrics(),
            risk: assessment.risk().into(),
            recommendations_html: recommendations.html,
            recommendations_source: recommendations.source,
            recommendations_error: recommendations.error,
        }
    }
}

/// Live preview of the derived metrics. Both fields are null until all five
/// inputs are usable.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreviewResponse {
    pub metrics: Option<MetabolicMetrics>,
    pub risk: Option<RiskSummary>,
}

impl From<Option<MetabolicMetrics>> for PreviewResponse {
    fn from(metrics: Option<MetabolicMetrics>) -> Self {
        Self {
            risk: metrics.map(|m| metabolic_guide_domain::services::categorize_risk(m.tyg_index).into()),
            metrics,
        }
    }
}

/// Assessment form plus the recommendation HTML shown to the user
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SaveRecordRequest {
    #[serde(flatten)]
    pub assessment: AssessmentRequest,

    /// Stored with the record when present
    #[serde(default)]
    pub recommendations_html: Option<String>,
}

/// Formatted document content
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentPreviewResponse {
    pub html: String,
}

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    response::Response,
};
use chrono::Utc;
use tracing::{info, instrument};

use metabolic_guide_domain::entities::AssessmentRequest;
use metabolic_guide_domain::services::export::{assessment_csv, assessment_filename};
use metabolic_guide_domain::services::metrics::MetricsPreviewRequest;

use crate::api::context::AppContext;
use crate::api::handlers::{attachment, rejected, CSV_CONTENT_TYPE};
use crate::entities::{AssessmentResponse, ErrorResponse, PreviewResponse};

/// Compute metrics, risk and recommendations for a completed form
#[utoipa::path(
    post,
    path = "/api/v1/assessments",
    request_body = AssessmentRequest,
    responses(
        (status = 200, description = "Assessment computed", body = AssessmentResponse),
        (status = 400, description = "Missing or out-of-range field", body = ErrorResponse),
        (status = 422, description = "Metrics undefined for these values", body = ErrorResponse)
    ),
    tag = "assessments"
)]
#[instrument(skip(context, body))]
pub async fn submit_assessment(
    State(context): State<AppContext>,
    body: Result<Json<AssessmentRequest>, JsonRejection>,
) -> Result<Json<AssessmentResponse>, ErrorResponse> {
    let Json(request) = body.map_err(rejected)?;

    let assessment = context.assessments.assess(request)?;
    let recommendations = context.assessments.recommend(&assessment).await;
    info!(
        "Assessment complete: risk={}, recommendations={:?}",
        assessment.risk(),
        recommendations.source
    );

    Ok(Json(AssessmentResponse::new(&assessment, recommendations)))
}

/// Live metrics while the form is being filled in
#[utoipa::path(
    post,
    path = "/api/v1/assessments/preview",
    request_body = MetricsPreviewRequest,
    responses(
        (status = 200, description = "Metrics, or nulls while inputs are incomplete", body = PreviewResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse)
    ),
    tag = "assessments"
)]
#[instrument(skip(context, body))]
pub async fn preview_assessment(
    State(context): State<AppContext>,
    body: Result<Json<MetricsPreviewRequest>, JsonRejection>,
) -> Result<Json<PreviewResponse>, ErrorResponse> {
    let Json(request) = body.map_err(rejected)?;
    Ok(Json(context.assessments.preview(&request).into()))
}

/// Download a completed form's assessment as CSV
#[utoipa::path(
    post,
    path = "/api/v1/assessments/export",
    request_body = AssessmentRequest,
    responses(
        (status = 200, description = "CSV attachment", body = String, content_type = "text/csv"),
        (status = 400, description = "Missing or out-of-range field", body = ErrorResponse),
        (status = 422, description = "Metrics undefined for these values", body = ErrorResponse)
    ),
    tag = "assessments"
)]
#[instrument(skip(context, body))]
pub async fn export_assessment(
    State(context): State<AppContext>,
    body: Result<Json<AssessmentRequest>, JsonRejection>,
) -> Result<Response, ErrorResponse> {
    let Json(request) = body.map_err(rejected)?;

    let assessment = context.assessments.assess(request)?;
    let csv = assessment_csv(&assessment, Utc::now().date_naive())?;
    let filename = assessment_filename(&assessment.profile().full_name);
    info!("Exporting assessment as {}", filename);

    Ok(attachment(CSV_CONTENT_TYPE, &filename, csv))
}

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use tracing::{info, instrument, warn};

use metabolic_guide_domain::auth::logging::log_access_denied;
use metabolic_guide_domain::auth::CurrentUser;
use metabolic_guide_domain::entities::PatientRecord;
use metabolic_guide_domain::services::assessment::LOGIN_REQUIRED_MESSAGE;
use metabolic_guide_domain::services::export::{
    assessment_filename, record_csv, records_csv, ALL_RECORDS_FILENAME,
};
use metabolic_guide_domain::services::RecordPage;

use crate::api::context::AppContext;
use crate::api::handlers::{attachment, rejected, CSV_CONTENT_TYPE};
use crate::entities::{ErrorResponse, RecordListQuery, SaveRecordRequest};

/// Save an assessment for the signed-in user
#[utoipa::path(
    post,
    path = "/api/v1/records",
    request_body = SaveRecordRequest,
    responses(
        (status = 201, description = "Record saved", body = PatientRecord),
        (status = 400, description = "Missing or out-of-range field", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 422, description = "Metrics undefined for these values", body = ErrorResponse),
        (status = 502, description = "Record storage unavailable", body = ErrorResponse)
    ),
    security(
        ("jwt_auth" = [])
    ),
    tag = "records"
)]
#[instrument(skip(context, user, body))]
pub async fn save_record(
    State(context): State<AppContext>,
    user: Option<Extension<CurrentUser>>,
    body: Result<Json<SaveRecordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let Some(Extension(user)) = user else {
        log_access_denied("/api/v1/records", "No bearer token");
        return Err(ErrorResponse::unauthorized(LOGIN_REQUIRED_MESSAGE));
    };
    let Json(request) = body.map_err(rejected)?;

    let assessment = context.assessments.assess(request.assessment)?;
    let record = context
        .assessments
        .save_record(Some(&user), &assessment, request.recommendations_html)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Saved records, newest first, optionally filtered by a search term
#[utoipa::path(
    get,
    path = "/api/v1/records",
    params(RecordListQuery),
    responses(
        (status = 200, description = "One page of records", body = RecordPage),
        (status = 400, description = "Malformed query", body = ErrorResponse),
        (status = 502, description = "Record storage unavailable", body = ErrorResponse)
    ),
    tag = "records"
)]
#[instrument(skip(context, query))]
pub async fn list_records(
    State(context): State<AppContext>,
    query: Result<Query<RecordListQuery>, QueryRejection>,
) -> Result<Json<RecordPage>, ErrorResponse> {
    let Query(query) = query.map_err(rejected)?;

    let page = context
        .assessments
        .list_records(query.search.as_deref(), query.limit, query.offset)
        .await?;

    Ok(Json(page))
}

/// Download every saved record as one CSV table
#[utoipa::path(
    get,
    path = "/api/v1/records/export",
    responses(
        (status = 200, description = "CSV attachment", body = String, content_type = "text/csv"),
        (status = 400, description = "No records to export", body = ErrorResponse),
        (status = 502, description = "Record storage unavailable", body = ErrorResponse)
    ),
    tag = "records"
)]
#[instrument(skip(context))]
pub async fn export_all_records(State(context): State<AppContext>) -> Result<Response, ErrorResponse> {
    let records = context.assessments.all_records().await?;
    let csv = records_csv(&records).map_err(|e| {
        warn!("Export of all records refused: {}", e);
        e
    })?;
    info!("Exporting {} records", records.len());

    Ok(attachment(CSV_CONTENT_TYPE, ALL_RECORDS_FILENAME, csv))
}

/// A single saved record
#[utoipa::path(
    get,
    path = "/api/v1/records/{id}",
    params(
        ("id" = String, Path, description = "Record ID")
    ),
    responses(
        (status = 200, description = "Record found", body = PatientRecord),
        (status = 404, description = "Record not found", body = ErrorResponse),
        (status = 502, description = "Record storage unavailable", body = ErrorResponse)
    ),
    tag = "records"
)]
#[instrument(skip(context))]
pub async fn get_record(
    State(context): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<PatientRecord>, ErrorResponse> {
    Ok(Json(context.assessments.get_record(&id).await?))
}

/// Download one saved record as CSV
#[utoipa::path(
    get,
    path = "/api/v1/records/{id}/export",
    params(
        ("id" = String, Path, description = "Record ID")
    ),
    responses(
        (status = 200, description = "CSV attachment", body = String, content_type = "text/csv"),
        (status = 404, description = "Record not found", body = ErrorResponse),
        (status = 502, description = "Record storage unavailable", body = ErrorResponse)
    ),
    tag = "records"
)]
#[instrument(skip(context))]
pub async fn export_record(
    State(context): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Response, ErrorResponse> {
    let record = context.assessments.get_record(&id).await?;
    let csv = record_csv(&record)?;

    Ok(attachment(CSV_CONTENT_TYPE, &assessment_filename(&record.full_name), csv))
}

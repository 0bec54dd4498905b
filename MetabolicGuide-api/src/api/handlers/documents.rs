use axum::{
    extract::{rejection::JsonRejection, Json, State},
    response::Response,
};
use tracing::{error, info, instrument};

use metabolic_guide_domain::entities::DocumentDraft;
use metabolic_guide_domain::services::{format_content, pdf_filename};

use crate::api::context::AppContext;
use crate::api::handlers::{attachment, rejected, PDF_CONTENT_TYPE};
use crate::entities::{DocumentPreviewResponse, ErrorResponse};

/// Format freeform document text as preview HTML
#[utoipa::path(
    post,
    path = "/api/v1/documents/preview",
    request_body = DocumentDraft,
    responses(
        (status = 200, description = "Preview HTML", body = DocumentPreviewResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse)
    ),
    tag = "documents"
)]
#[instrument(skip(body))]
pub async fn preview_document(
    body: Result<Json<DocumentDraft>, JsonRejection>,
) -> Result<Json<DocumentPreviewResponse>, ErrorResponse> {
    let Json(draft) = body.map_err(rejected)?;
    Ok(Json(DocumentPreviewResponse {
        html: format_content(&draft.content),
    }))
}

/// Render a document as a PDF download
#[utoipa::path(
    post,
    path = "/api/v1/documents/pdf",
    request_body = DocumentDraft,
    responses(
        (status = 200, description = "PDF attachment", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Empty content", body = ErrorResponse),
        (status = 500, description = "Rendering failed", body = ErrorResponse)
    ),
    tag = "documents"
)]
#[instrument(skip(context, body))]
pub async fn generate_pdf(
    State(context): State<AppContext>,
    body: Result<Json<DocumentDraft>, JsonRejection>,
) -> Result<Response, ErrorResponse> {
    let Json(draft) = body.map_err(rejected)?;
    let filename = pdf_filename(&draft.title);

    let renderer = context.pdf.clone();
    let bytes = tokio::task::spawn_blocking(move || renderer.render(&draft))
        .await
        .map_err(|e| {
            error!("PDF rendering task failed: {}", e);
            ErrorResponse::internal_error()
        })??;
    info!("Generated {} ({} bytes)", filename, bytes.len());

    Ok(attachment(PDF_CONTENT_TYPE, &filename, bytes))
}

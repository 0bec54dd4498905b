pub mod assessment;
pub mod documents;
pub mod health;
pub mod records;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::entities::ErrorResponse;

// Re-export handlers for easier imports
pub use assessment::{export_assessment, preview_assessment, submit_assessment};
pub use documents::{generate_pdf, preview_document};
pub use health::health_check;
pub use records::{export_all_records, export_record, get_record, list_records, save_record};

pub(crate) const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub(crate) const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A download response with the given file name
pub(crate) fn attachment(content_type: &'static str, filename: &str, body: impl IntoResponse) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// Unreadable request body or query string
pub(crate) fn rejected(rejection: impl std::fmt::Display) -> ErrorResponse {
    let message = rejection.to_string();
    warn!("Malformed request: {}", message);
    ErrorResponse::bad_request(&message)
}

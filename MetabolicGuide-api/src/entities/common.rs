use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use metabolic_guide_domain::services::assessment::LOGIN_REQUIRED_MESSAGE;
use metabolic_guide_domain::services::export::ExportError;
use metabolic_guide_domain::services::{AssessmentServiceError, DocumentError};

/// Error response format for API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code - machine-readable identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            details: None,
        }
    }

    /// Create a not found error response
    pub fn not_found(resource: &str) -> Self {
        Self::new("not_found", format!("The requested {} could not be found", resource))
    }

    /// Create a validation error response
    pub fn validation_error(message: &str, details: Option<serde_json::Value>) -> Self {
        Self {
            details,
            ..Self::new("validation_error", message)
        }
    }

    /// Create a bad request error response
    pub fn bad_request(message: &str) -> Self {
        Self::new("bad_request", message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new("unauthorized", message)
    }

    /// Inputs are valid but the metrics are undefined for them
    pub fn domain_error(message: &str) -> Self {
        Self::new("domain_error", message)
    }

    /// Storage or another upstream service failed
    pub fn backend_error(message: &str) -> Self {
        Self::new("backend_error", message)
    }

    pub fn render_error(message: &str) -> Self {
        Self::new("render_error", message)
    }

    /// Create an internal error response
    pub fn internal_error() -> Self {
        Self::new("internal_error", "An unexpected error occurred")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "validation_error" | "bad_request" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "domain_error" => StatusCode::UNPROCESSABLE_ENTITY,
            "backend_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<AssessmentServiceError> for ErrorResponse {
    fn from(error: AssessmentServiceError) -> Self {
        match error {
            AssessmentServiceError::ValidationError(msg) if msg == LOGIN_REQUIRED_MESSAGE => {
                Self::unauthorized(&msg)
            }
            AssessmentServiceError::ValidationError(msg) => Self::validation_error(&msg, None),
            AssessmentServiceError::DomainError(msg) => Self::domain_error(&msg),
            AssessmentServiceError::NotFound(_) => Self::not_found("patient record"),
            AssessmentServiceError::BackendError(_) => {
                Self::backend_error("Record storage is unavailable, please try again")
            }
        }
    }
}

impl From<ExportError> for ErrorResponse {
    fn from(error: ExportError) -> Self {
        match error {
            ExportError::ValidationError(msg) => Self::validation_error(&msg, None),
            ExportError::Csv(_) | ExportError::Output(_) => Self::internal_error(),
        }
    }
}

impl From<DocumentError> for ErrorResponse {
    fn from(error: DocumentError) -> Self {
        match error {
            DocumentError::ValidationError(msg) => Self::validation_error(&msg, None),
            DocumentError::RenderError(_) => Self::render_error("Could not generate the PDF"),
        }
    }
}

/// Query parameters for listing saved records
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RecordListQuery {
    /// Case-insensitive text matched against name, metrics, risk and date
    pub search: Option<String>,

    /// Number of results to return (default: 50, max: 500)
    #[schema(default = 50, minimum = 1, maximum = 500)]
    pub limit: Option<usize>,

    /// Number of results to skip (default: 0)
    #[schema(default = 0, minimum = 0)]
    pub offset: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorResponse::not_found("record").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorResponse::validation_error("bad", None).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorResponse::unauthorized("no").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorResponse::domain_error("nan").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ErrorResponse::backend_error("down").status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorResponse::render_error("pdf").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_errors() {
        let login = ErrorResponse::from(AssessmentServiceError::ValidationError(
            LOGIN_REQUIRED_MESSAGE.to_string(),
        ));
        assert_eq!(login.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(login.message, LOGIN_REQUIRED_MESSAGE);

        let backend = ErrorResponse::from(AssessmentServiceError::BackendError(
            "connection refused at 10.0.0.5".to_string(),
        ));
        assert_eq!(backend.status(), StatusCode::BAD_GATEWAY);
        assert!(!backend.message.contains("10.0.0.5"));

        let empty = ErrorResponse::from(ExportError::ValidationError("No patient records to export".to_string()));
        assert_eq!(empty.error, "validation_error");
    }
}

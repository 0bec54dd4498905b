pub mod assessment;
pub mod document;
pub mod export;
pub mod metrics;
pub mod pdf;
pub mod recommendations;

// Domain services
// This module contains business logic implementations.

// Re-export service traits and factory functions
pub use assessment::{
    create_default_assessment_service, AssessmentService, AssessmentServiceError,
    AssessmentServiceTrait, RecordPage,
};
pub use document::{format_content, parse_blocks, pdf_filename, DocumentError};
pub use metrics::{categorize_risk, compute_metrics, preview_metrics, MetricsError};
pub use pdf::{PdfRendererTrait, PrintPdfRenderer};
pub use recommendations::{RecommendationOutcome, RecommendationService};

// Re-export mock service factory functions when the mock feature is enabled
#[cfg(feature = "mock")]
pub use assessment::create_mock_assessment_service;

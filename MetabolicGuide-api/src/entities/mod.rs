// Public entities for the MetabolicGuide API
// Request and response shapes that exist only at the HTTP boundary

// Assessment, preview, save and document payloads
pub mod assessment;

// Error responses and query parameters
pub mod common;

pub use assessment::{
    AssessmentResponse, DocumentPreviewResponse, PreviewResponse, RiskSummary, SaveRecordRequest,
};
pub use common::{ErrorResponse, RecordListQuery};

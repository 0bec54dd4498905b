// Domain entities and value objects
pub mod assessment;
pub mod conversions;
pub mod document;
pub mod patient_record;

// Re-export common types for easier imports
pub use assessment::{
    AssessmentRequest, MetabolicMetrics, PatientAssessment, PatientProfile, RiskCategory,
};
pub use document::{DocumentBlock, DocumentDraft};
pub use patient_record::PatientRecord;

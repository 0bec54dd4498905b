// Storage models
pub mod patient_record;

pub use patient_record::{CreatePatientRecordRequest, PatientRecord, RemoteSession};

use serde::{Deserialize, Serialize};

/// Storage model for a saved metabolic assessment.
///
/// Rows are append-only: once inserted a record is never updated or deleted.
/// Column names match the `patient_records` collection of the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Unique identifier (UUID v4 string)
    pub id: String,

    /// Patient full name
    pub full_name: String,

    /// Age in years
    pub age: u32,

    /// Gender as entered on the form
    pub gender: String,

    /// Weight in kilograms
    pub weight: f64,

    /// Height in metres
    pub height: f64,

    /// Fasting glucose in mg/dL
    pub glucose: f64,

    /// Triglycerides in mg/dL
    pub triglycerides: f64,

    /// HDL cholesterol in mg/dL
    pub hdl: f64,

    /// HbA1c in percent
    pub hba1c: f64,

    /// Diabetes status as entered on the form
    pub diabetes: String,

    pub bmi: f64,
    pub tyg_index: f64,
    pub tg_hdl_ratio: f64,

    /// Display label of the risk tier, e.g. "Moderate Risk"
    pub risk_level: String,

    pub risk_description: String,

    /// Formatted recommendation HTML, when recommendations were generated
    #[serde(default)]
    pub ai_recommendations: Option<String>,

    /// Creation time as an RFC 3339 UTC string
    pub created_at: String,

    /// Email of the user who saved the record
    pub created_by: String,
}

/// Input data for inserting a new patient record.
/// The repository assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePatientRecordRequest {
    pub full_name: String,
    pub age: u32,
    pub gender: String,
    pub weight: f64,
    pub height: f64,
    pub glucose: f64,
    pub triglycerides: f64,
    pub hdl: f64,
    pub hba1c: f64,
    pub diabetes: String,
    pub bmi: f64,
    pub tyg_index: f64,
    pub tg_hdl_ratio: f64,
    pub risk_level: String,
    pub risk_description: String,
    pub ai_recommendations: Option<String>,
    /// Creation time as an RFC 3339 UTC string
    pub created_at: String,
    pub created_by: String,
}

impl CreatePatientRecordRequest {
    /// Attach an identifier, producing the record to store
    pub fn into_record(self, id: String) -> PatientRecord {
        PatientRecord {
            id,
            full_name: self.full_name,
            age: self.age,
            gender: self.gender,
            weight: self.weight,
            height: self.height,
            glucose: self.glucose,
            triglycerides: self.triglycerides,
            hdl: self.hdl,
            hba1c: self.hba1c,
            diabetes: self.diabetes,
            bmi: self.bmi,
            tyg_index: self.tyg_index,
            tg_hdl_ratio: self.tg_hdl_ratio,
            risk_level: self.risk_level,
            risk_description: self.risk_description,
            ai_recommendations: self.ai_recommendations,
            created_at: self.created_at,
            created_by: self.created_by,
        }
    }
}

/// Credentials returned by the remote store after a password sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSession {
    pub access_token: String,
    pub email: String,
}

#[cfg(test)]
pub(crate) fn sample_request(name: &str, created_at: &str) -> CreatePatientRecordRequest {
    CreatePatientRecordRequest {
        full_name: name.to_string(),
        age: 45,
        gender: "Female".to_string(),
        weight: 82.0,
        height: 1.65,
        glucose: 110.0,
        triglycerides: 180.0,
        hdl: 42.0,
        hba1c: 6.1,
        diabetes: "Pre-diabetic".to_string(),
        bmi: 30.1,
        tyg_index: 9.19,
        tg_hdl_ratio: 4.29,
        risk_level: "High Risk".to_string(),
        risk_description: "High metabolic disorder risk - immediate attention required".to_string(),
        ai_recommendations: None,
        created_at: created_at.to_string(),
        created_by: "clinician@example.org".to_string(),
    }
}

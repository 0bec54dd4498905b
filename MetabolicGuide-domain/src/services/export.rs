//! CSV export of assessments and saved records

use chrono::NaiveDate;
use thiserror::Error;

use crate::entities::{PatientAssessment, PatientRecord};

pub const ALL_RECORDS_FILENAME: &str = "all_patient_records.csv";
pub const NO_RECORDS_MESSAGE: &str = "No patient records to export";

const RECORDS_HEADER: [&str; 15] = [
    "Name",
    "Age",
    "Gender",
    "Weight",
    "Height",
    "BMI",
    "Glucose",
    "Triglycerides",
    "HDL",
    "TyG Index",
    "TG/HDL Ratio",
    "HbA1c",
    "Diabetes",
    "Risk Level",
    "Date",
];

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing to export
    #[error("{0}")]
    ValidationError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output error: {0}")]
    Output(String),
}

/// Values of one patient, in field order
struct FieldValues {
    name: String,
    age: u32,
    gender: String,
    weight: f64,
    height: f64,
    bmi: f64,
    glucose: f64,
    triglycerides: f64,
    hdl: f64,
    tyg_index: f64,
    tg_hdl_ratio: f64,
    hba1c: f64,
    diabetes: String,
    risk_level: String,
    date: String,
}

impl FieldValues {
    fn from_assessment(assessment: &PatientAssessment, date: NaiveDate) -> Self {
        let profile = assessment.profile();
        let metrics = assessment.metrics();
        Self {
            name: profile.full_name.clone(),
            age: profile.age,
            gender: profile.gender.clone(),
            weight: profile.weight,
            height: profile.height,
            bmi: metrics.bmi,
            glucose: profile.fasting_glucose,
            triglycerides: profile.triglycerides,
            hdl: profile.hdl,
            tyg_index: metrics.tyg_index,
            tg_hdl_ratio: metrics.tg_hdl_ratio,
            hba1c: profile.hba1c,
            diabetes: profile.diabetes_status.clone(),
            risk_level: assessment.risk().level().to_string(),
            date: date.format("%Y-%m-%d").to_string(),
        }
    }

    fn from_record(record: &PatientRecord) -> Self {
        Self {
            name: record.full_name.clone(),
            age: record.age,
            gender: record.gender.clone(),
            weight: record.weight,
            height: record.height,
            bmi: record.bmi,
            glucose: record.fasting_glucose,
            triglycerides: record.triglycerides,
            hdl: record.hdl,
            tyg_index: record.tyg_index,
            tg_hdl_ratio: record.tg_hdl_ratio,
            hba1c: record.hba1c,
            diabetes: record.diabetes_status.clone(),
            risk_level: record.risk_level.clone(),
            date: record.created_date(),
        }
    }

    fn values(&self) -> [String; 15] {
        [
            self.name.clone(),
            self.age.to_string(),
            self.gender.clone(),
            self.weight.to_string(),
            self.height.to_string(),
            self.bmi.to_string(),
            self.glucose.to_string(),
            self.triglycerides.to_string(),
            self.hdl.to_string(),
            self.tyg_index.to_string(),
            self.tg_hdl_ratio.to_string(),
            self.hba1c.to_string(),
            self.diabetes.clone(),
            self.risk_level.clone(),
            self.date.clone(),
        ]
    }

    /// `Field,Value` document with one row per field
    fn to_field_csv(&self) -> Result<String, ExportError> {
        const LABELS: [&str; 15] = [
            "Patient Name",
            "Age",
            "Gender",
            "Weight (kg)",
            "Height (m)",
            "BMI",
            "Fasting Glucose (mg/dL)",
            "Triglycerides (mg/dL)",
            "HDL (mg/dL)",
            "TyG Index",
            "TG/HDL Ratio",
            "HbA1c (%)",
            "Diabetes Status",
            "Risk Level",
            "Date",
        ];

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["Field", "Value"])?;
        for (label, value) in LABELS.iter().zip(self.values()) {
            writer.write_record([*label, value.as_str()])?;
        }
        finish(writer)
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Output(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Output(e.to_string()))
}

/// CSV for a freshly computed assessment, dated `date`
pub fn assessment_csv(assessment: &PatientAssessment, date: NaiveDate) -> Result<String, ExportError> {
    FieldValues::from_assessment(assessment, date).to_field_csv()
}

/// CSV for one saved record, dated by its creation time
pub fn record_csv(record: &PatientRecord) -> Result<String, ExportError> {
    FieldValues::from_record(record).to_field_csv()
}

/// One row per record, in the given order
pub fn records_csv(records: &[PatientRecord]) -> Result<String, ExportError> {
    if records.is_empty() {
        return Err(ExportError::ValidationError(NO_RECORDS_MESSAGE.to_string()));
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(RECORDS_HEADER)?;
    for record in records {
        writer.write_record(FieldValues::from_record(record).values())?;
    }
    finish(writer)
}

/// Lowercase, with every character outside `[A-Za-z0-9]` replaced by `_`.
/// Returns `fallback` for an empty name.
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Download name for a single assessment or record
pub fn assessment_filename(full_name: &str) -> String {
    format!("{}_metabolic_assessment.csv", sanitize_filename(full_name, "patient"))
}

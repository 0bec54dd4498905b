use chrono::{DateTime, SecondsFormat, Utc};

use metabolic_guide_data::models as data;

use crate::entities::assessment::PatientAssessment;
use crate::entities::patient_record::PatientRecord;

// Conversion functions between domain entities and data models.
// Names follow convert_to_[target_layer]_[model_name].

/// Convert from data model to domain entity for a patient record
pub fn convert_to_domain_record(record: data::PatientRecord) -> PatientRecord {
    PatientRecord {
        id: record.id,
        full_name: record.full_name,
        age: record.age,
        gender: record.gender,
        weight: record.weight,
        height: record.height,
        fasting_glucose: record.glucose,
        triglycerides: record.triglycerides,
        hdl: record.hdl,
        hba1c: record.hba1c,
        diabetes_status: record.diabetes,
        bmi: record.bmi,
        tyg_index: record.tyg_index,
        tg_hdl_ratio: record.tg_hdl_ratio,
        risk_level: record.risk_level,
        risk_description: record.risk_description,
        ai_recommendations: record.ai_recommendations,
        created_at: record.created_at,
        created_by: record.created_by,
    }
}

/// Convert a domain record back into its storage row
#[cfg(test)]
pub(crate) fn convert_to_data_record(record: PatientRecord) -> data::PatientRecord {
    data::PatientRecord {
        id: record.id,
        full_name: record.full_name,
        age: record.age,
        gender: record.gender,
        weight: record.weight,
        height: record.height,
        glucose: record.fasting_glucose,
        triglycerides: record.triglycerides,
        hdl: record.hdl,
        hba1c: record.hba1c,
        diabetes: record.diabetes_status,
        bmi: record.bmi,
        tyg_index: record.tyg_index,
        tg_hdl_ratio: record.tg_hdl_ratio,
        risk_level: record.risk_level,
        risk_description: record.risk_description,
        ai_recommendations: record.ai_recommendations,
        created_at: record.created_at,
        created_by: record.created_by,
    }
}

/// Build the insert request for a saved assessment
pub fn convert_to_data_create_request(
    assessment: &PatientAssessment,
    ai_recommendations: Option<String>,
    created_by: &str,
    created_at: DateTime<Utc>,
) -> data::CreatePatientRecordRequest {
    let profile = assessment.profile();
    let metrics = assessment.metrics();
    let risk = assessment.risk();

    data::CreatePatientRecordRequest {
        full_name: profile.full_name.clone(),
        age: profile.age,
        gender: profile.gender.clone(),
        weight: profile.weight,
        height: profile.height,
        glucose: profile.fasting_glucose,
        triglycerides: profile.triglycerides,
        hdl: profile.hdl,
        hba1c: profile.hba1c,
        diabetes: profile.diabetes_status.clone(),
        bmi: metrics.bmi,
        tyg_index: metrics.tyg_index,
        tg_hdl_ratio: metrics.tg_hdl_ratio,
        risk_level: risk.level().to_string(),
        risk_description: risk.description().to_string(),
        ai_recommendations,
        created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        created_by: created_by.to_string(),
    }
}

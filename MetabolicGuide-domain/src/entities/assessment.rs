use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::services::metrics::{categorize_risk, compute_metrics, MetricsError};

/// Form input for a metabolic assessment.
///
/// Every field is optional on the wire so a missing field surfaces as a
/// validation message rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AssessmentRequest {
    #[validate(required(message = "Full name is required"))]
    pub full_name: Option<String>,

    /// Age in years
    #[validate(
        required(message = "Age is required"),
        range(min = 1, max = 130, message = "Age must be between 1 and 130")
    )]
    pub age: Option<u32>,

    #[validate(required(message = "Gender is required"))]
    pub gender: Option<String>,

    /// Weight in kilograms
    #[validate(
        required(message = "Weight is required"),
        range(min = 1.0, max = 500.0, message = "Weight must be between 1 and 500 kg")
    )]
    pub weight: Option<f64>,

    /// Height in metres
    #[validate(
        required(message = "Height is required"),
        range(min = 0.3, max = 3.0, message = "Height must be between 0.3 and 3.0 m")
    )]
    pub height: Option<f64>,

    /// Fasting glucose in mg/dL
    #[validate(
        required(message = "Fasting glucose is required"),
        range(min = 1.0, max = 2000.0, message = "Fasting glucose must be between 1 and 2000 mg/dL")
    )]
    pub fasting_glucose: Option<f64>,

    /// Triglycerides in mg/dL
    #[validate(
        required(message = "Triglycerides are required"),
        range(min = 1.0, max = 10000.0, message = "Triglycerides must be between 1 and 10000 mg/dL")
    )]
    pub triglycerides: Option<f64>,

    /// HDL cholesterol in mg/dL
    #[validate(
        required(message = "HDL is required"),
        range(min = 1.0, max = 500.0, message = "HDL must be between 1 and 500 mg/dL")
    )]
    pub hdl: Option<f64>,

    /// HbA1c in percent
    #[validate(
        required(message = "HbA1c is required"),
        range(min = 1.0, max = 25.0, message = "HbA1c must be between 1 and 25 %")
    )]
    pub hba1c: Option<f64>,

    #[validate(required(message = "Diabetes status is required"))]
    pub diabetes_status: Option<String>,
}

impl AssessmentRequest {
    /// Trim text fields; blank text counts as missing
    pub fn normalized(mut self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        self.full_name = clean(self.full_name);
        self.gender = clean(self.gender);
        self.diabetes_status = clean(self.diabetes_status);
        self
    }
}

/// Validated patient inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct PatientProfile {
    pub full_name: String,
    pub age: u32,
    pub gender: String,
    pub weight: f64,
    pub height: f64,
    pub fasting_glucose: f64,
    pub triglycerides: f64,
    pub hdl: f64,
    pub hba1c: f64,
    pub diabetes_status: String,
}

/// Derived metabolic markers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct MetabolicMetrics {
    /// Body mass index, one decimal
    pub bmi: f64,
    /// ln(glucose × triglycerides / 2), two decimals
    pub tyg_index: f64,
    /// Triglycerides / HDL, two decimals
    pub tg_hdl_ratio: f64,
}

/// Metabolic disorder risk tier, derived from the TyG index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl RiskCategory {
    /// Display label stored with saved records
    pub fn level(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low Risk",
            RiskCategory::Moderate => "Moderate Risk",
            RiskCategory::High => "High Risk",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low metabolic disorder risk",
            RiskCategory::Moderate => "Moderate metabolic disorder risk - monitoring recommended",
            RiskCategory::High => "High metabolic disorder risk - immediate attention required",
        }
    }

    /// Parse a stored display label back into a category
    pub fn from_level(level: &str) -> Option<Self> {
        [RiskCategory::Low, RiskCategory::Moderate, RiskCategory::High]
            .into_iter()
            .find(|category| category.level().eq_ignore_ascii_case(level.trim()))
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.level())
    }
}

/// A patient profile together with the metrics and risk computed from it.
///
/// Only [`PatientAssessment::from_profile`] builds one, so the derived values
/// always match the inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientAssessment {
    profile: PatientProfile,
    metrics: MetabolicMetrics,
    risk: RiskCategory,
}

impl PatientAssessment {
    pub fn from_profile(profile: PatientProfile) -> Result<Self, MetricsError> {
        let metrics = compute_metrics(
            profile.weight,
            profile.height,
            profile.fasting_glucose,
            profile.triglycerides,
            profile.hdl,
        )?;
        let risk = categorize_risk(metrics.tyg_index);
        Ok(Self { profile, metrics, risk })
    }

    pub fn profile(&self) -> &PatientProfile {
        &self.profile
    }

    pub fn metrics(&self) -> &MetabolicMetrics {
        &self.metrics
    }

    pub fn risk(&self) -> RiskCategory {
        self.risk
    }
}

#[cfg(test)]
pub(crate) fn sample_profile() -> PatientProfile {
    PatientProfile {
        full_name: "Jane Doe".to_string(),
        age: 52,
        gender: "Female".to_string(),
        weight: 70.0,
        height: 1.75,
        fasting_glucose: 100.0,
        triglycerides: 150.0,
        hdl: 50.0,
        hba1c: 5.6,
        diabetes_status: "No".to_string(),
    }
}

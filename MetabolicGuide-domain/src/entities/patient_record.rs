use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// A saved assessment as returned by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct PatientRecord {
    pub id: String,
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
    pub bmi: f64,
    pub tyg_index: f64,
    pub tg_hdl_ratio: f64,
    /// Display label, e.g. "Low Risk"
    pub risk_level: String,
    pub risk_description: String,
    /// Recommendation HTML captured at save time
    pub ai_recommendations: Option<String>,
    /// RFC 3339 UTC timestamp
    pub created_at: String,
    /// Email of the saving user
    pub created_by: String,
}

impl PatientRecord {
    /// Calendar date of `created_at` (`YYYY-MM-DD`), or the raw value if it
    /// does not parse
    pub fn created_date(&self) -> String {
        chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc).format("%Y-%m-%d").to_string())
            .unwrap_or_else(|_| self.created_at.clone())
    }

    /// The text a user sees in this record's list row
    pub fn row_text(&self) -> String {
        format!(
            "{} {}/{} {} {} {} {}",
            self.full_name,
            self.age,
            self.gender,
            self.bmi,
            self.tyg_index,
            self.risk_level,
            self.created_date()
        )
    }

    /// Case-insensitive substring match against the row text
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty() || self.row_text().to_lowercase().contains(&term)
    }
}

#[cfg(test)]
pub(crate) fn sample_record(id: &str, name: &str, created_at: &str) -> PatientRecord {
    PatientRecord {
        id: id.to_string(),
        full_name: name.to_string(),
        age: 52,
        gender: "Female".to_string(),
        weight: 70.0,
        height: 1.75,
        fasting_glucose: 100.0,
        triglycerides: 150.0,
        hdl: 50.0,
        hba1c: 5.6,
        diabetes_status: "No".to_string(),
        bmi: 22.9,
        tyg_index: 8.92,
        tg_hdl_ratio: 3.0,
        risk_level: "High Risk".to_string(),
        risk_description: "High metabolic disorder risk - immediate attention required".to_string(),
        ai_recommendations: None,
        created_at: created_at.to_string(),
        created_by: "clinician@example.org".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_date() {
        let record = sample_record("1", "Jane", "2024-05-01T23:30:00-02:00");
        assert_eq!(record.created_date(), "2024-05-02");

        let record = sample_record("1", "Jane", "not a date");
        assert_eq!(record.created_date(), "not a date");
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let record = sample_record("1", "Jane Doe", "2024-05-01T10:00:00Z");
        assert!(record.matches("jane"));
        assert!(record.matches("HIGH risk"));
        assert!(record.matches("2024-05"));
        assert!(record.matches(""));
        assert!(!record.matches("john"));
    }
}

use serde::Deserialize;
use thiserror::Error;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::entities::assessment::{MetabolicMetrics, RiskCategory};

/// Arithmetic that has no defined result for the given inputs
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetricsError {
    #[error("Height must be greater than zero")]
    NonPositiveHeight,

    #[error("TyG index is undefined when glucose x triglycerides is not positive")]
    NonPositiveGlucoseTriglycerides,

    #[error("TG/HDL ratio is undefined when HDL is zero")]
    ZeroHdl,

    #[error("{0} is not a finite number")]
    NonFinite(&'static str),
}

/// Half-up rounding to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}

/// Compute BMI, TyG index and TG/HDL ratio.
///
/// Weight in kg, height in m, the lipid and glucose values in mg/dL.
pub fn compute_metrics(
    weight: f64,
    height: f64,
    glucose: f64,
    triglycerides: f64,
    hdl: f64,
) -> Result<MetabolicMetrics, MetricsError> {
    for (name, value) in [
        ("Weight", weight),
        ("Height", height),
        ("Fasting glucose", glucose),
        ("Triglycerides", triglycerides),
        ("HDL", hdl),
    ] {
        if !value.is_finite() {
            return Err(MetricsError::NonFinite(name));
        }
    }

    if height <= 0.0 {
        return Err(MetricsError::NonPositiveHeight);
    }
    let product = glucose * triglycerides;
    if product <= 0.0 {
        return Err(MetricsError::NonPositiveGlucoseTriglycerides);
    }
    if hdl == 0.0 {
        return Err(MetricsError::ZeroHdl);
    }

    let bmi = round_to(weight / (height * height), 1);
    let tyg_index = round_to((product / 2.0).ln(), 2);
    let tg_hdl_ratio = round_to(triglycerides / hdl, 2);

    for (name, value) in [("BMI", bmi), ("TyG index", tyg_index), ("TG/HDL ratio", tg_hdl_ratio)] {
        if !value.is_finite() {
            return Err(MetricsError::NonFinite(name));
        }
    }

    Ok(MetabolicMetrics {
        bmi,
        tyg_index,
        tg_hdl_ratio,
    })
}

/// Risk tier from the TyG index: below 8.0 is low, up to and including 8.5
/// is moderate, anything else (NaN included) is high.
pub fn categorize_risk(tyg_index: f64) -> RiskCategory {
    if tyg_index < 8.0 {
        RiskCategory::Low
    } else if tyg_index <= 8.5 {
        RiskCategory::Moderate
    } else {
        RiskCategory::High
    }
}

/// Partially filled form values for the live preview
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct MetricsPreviewRequest {
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub fasting_glucose: Option<f64>,
    pub triglycerides: Option<f64>,
    pub hdl: Option<f64>,
}

/// Metrics for the live preview, only once all five inputs are present and
/// non-zero. Incomplete or undefined input yields nothing.
pub fn preview_metrics(input: &MetricsPreviewRequest) -> Option<MetabolicMetrics> {
    let present = |value: Option<f64>| value.filter(|v| *v != 0.0 && !v.is_nan());

    let weight = present(input.weight)?;
    let height = present(input.height)?;
    let glucose = present(input.fasting_glucose)?;
    let triglycerides = present(input.triglycerides)?;
    let hdl = present(input.hdl)?;

    compute_metrics(weight, height, glucose, triglycerides, hdl).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmi_rounds_to_one_decimal() {
        let metrics = compute_metrics(70.0, 1.75, 100.0, 150.0, 50.0).unwrap();
        assert_eq!(metrics.bmi, 22.9);

        let metrics = compute_metrics(82.0, 1.65, 100.0, 150.0, 50.0).unwrap();
        assert_eq!(metrics.bmi, round_to(82.0 / (1.65 * 1.65), 1));
        assert_eq!(metrics.bmi, 30.1);
    }

    #[test]
    fn test_tyg_index() {
        let metrics = compute_metrics(70.0, 1.75, 100.0, 150.0, 50.0).unwrap();
        assert_eq!(metrics.tyg_index, 8.92);

        let metrics = compute_metrics(70.0, 1.75, 90.0, 80.0, 50.0).unwrap();
        assert_eq!(metrics.tyg_index, round_to((90.0f64 * 80.0 / 2.0).ln(), 2));
        assert_eq!(metrics.tyg_index, 8.19);
    }

    #[test]
    fn test_tyg_undefined_for_non_positive_product() {
        assert_eq!(
            compute_metrics(70.0, 1.75, 0.0, 150.0, 50.0),
            Err(MetricsError::NonPositiveGlucoseTriglycerides)
        );
        assert_eq!(
            compute_metrics(70.0, 1.75, 100.0, -5.0, 50.0),
            Err(MetricsError::NonPositiveGlucoseTriglycerides)
        );
    }

    #[test]
    fn test_ratio() {
        let metrics = compute_metrics(70.0, 1.75, 100.0, 180.0, 42.0).unwrap();
        assert_eq!(metrics.tg_hdl_ratio, 4.29);
        assert_eq!(
            compute_metrics(70.0, 1.75, 100.0, 180.0, 0.0),
            Err(MetricsError::ZeroHdl)
        );
    }

    #[test]
    fn test_height_must_be_positive() {
        assert_eq!(
            compute_metrics(70.0, 0.0, 100.0, 150.0, 50.0),
            Err(MetricsError::NonPositiveHeight)
        );
        assert_eq!(
            compute_metrics(70.0, f64::INFINITY, 100.0, 150.0, 50.0),
            Err(MetricsError::NonFinite("Height"))
        );
    }

    #[test]
    fn test_risk_boundaries() {
        assert_eq!(categorize_risk(7.99), RiskCategory::Low);
        assert_eq!(categorize_risk(8.0), RiskCategory::Moderate);
        assert_eq!(categorize_risk(8.5), RiskCategory::Moderate);
        assert_eq!(categorize_risk(8.51), RiskCategory::High);
        assert_eq!(categorize_risk(f64::NAN), RiskCategory::High);
    }

    #[test]
    fn test_half_up_rounding() {
        assert_eq!(round_to(2.25, 1), 2.3);
        assert_eq!(round_to(-2.25, 1), -2.2);
        assert_eq!(round_to(8.005, 0), 8.0);
    }

    #[test]
    fn test_preview_needs_all_inputs() {
        let mut input = MetricsPreviewRequest {
            weight: Some(70.0),
            height: Some(1.75),
            fasting_glucose: Some(100.0),
            triglycerides: Some(150.0),
            hdl: None,
        };
        assert_eq!(preview_metrics(&input), None);

        input.hdl = Some(0.0);
        assert_eq!(preview_metrics(&input), None);

        input.hdl = Some(50.0);
        let metrics = preview_metrics(&input).unwrap();
        assert_eq!(metrics.tg_hdl_ratio, 3.0);
    }
}

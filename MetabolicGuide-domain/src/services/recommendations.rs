//! Lifestyle and follow-up recommendations for an assessment.
//!
//! A chat-completion backend produces free text when configured. The local
//! rule table covers the unconfigured case and backs up a failed request, so
//! an assessment always has recommendation text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::entities::assessment::PatientAssessment;
use crate::services::document::escape_html;

/// User-facing message when the recommendation backend fails
pub const RECOMMENDATION_ERROR_MESSAGE: &str =
    "Unable to generate AI recommendations. Please try again.";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("static regex"));

/// Recommendation backend errors
#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("Recommendation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Recommendation service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Recommendation service returned no text")]
    EmptyResponse,
}

/// Where recommendation text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Ai,
    Rules,
}

/// Result of asking for recommendations. Never an error: a failure is
/// reported in `error` next to rule-table text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RecommendationOutcome {
    /// Formatted HTML
    pub html: String,
    pub source: RecommendationSource,
    /// User-facing message when the configured backend failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A source of raw (markdown-ish) recommendation text
#[async_trait]
pub trait RecommendationProviderTrait: Send + Sync {
    async fn recommend(&self, assessment: &PatientAssessment) -> Result<String, RecommendationError>;

    fn source(&self) -> RecommendationSource;
}

/// Deterministic recommendations from threshold rules
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedRecommendationProvider;

impl RuleBasedRecommendationProvider {
    pub fn recommendations(&self, assessment: &PatientAssessment) -> String {
        let metrics = assessment.metrics();
        let mut items = Vec::new();

        if metrics.bmi > 25.0 {
            items.push("**Weight Management**: Consider a structured weight loss program targeting 5-10% body weight reduction through caloric restriction and increased physical activity.");
        }
        if metrics.tyg_index > 8.0 {
            items.push("**Metabolic Health**: Focus on low-glycemic index foods, reduce refined carbohydrates, and consider Mediterranean-style diet patterns.");
        }
        if metrics.tg_hdl_ratio > 3.5 {
            items.push("**Lipid Management**: Increase omega-3 fatty acids, reduce saturated fats, and consider aerobic exercise 150+ minutes per week.");
        }
        if assessment.profile().hba1c > 6.5 {
            items.push("**Glucose Control**: Monitor blood glucose regularly, consider continuous glucose monitoring, and maintain consistent meal timing.");
        }
        items.push("**Follow-up**: Schedule follow-up in 3-6 months to reassess metabolic markers and adjust treatment plan as needed.");

        items.join("\n\n")
    }
}

#[async_trait]
impl RecommendationProviderTrait for RuleBasedRecommendationProvider {
    async fn recommend(&self, assessment: &PatientAssessment) -> Result<String, RecommendationError> {
        Ok(self.recommendations(assessment))
    }

    fn source(&self) -> RecommendationSource {
        RecommendationSource::Rules
    }
}

/// Chat-completion backend settings
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat-completion client
#[derive(Debug, Clone)]
pub struct OpenAiRecommendationProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiRecommendationProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, RecommendationError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl RecommendationProviderTrait for OpenAiRecommendationProvider {
    async fn recommend(&self, assessment: &PatientAssessment) -> Result<String, RecommendationError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(assessment),
            }],
            max_tokens: 500,
            temperature: 0.7,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        debug!("Requesting recommendations from {} with model {}", url, self.config.model);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RecommendationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(RecommendationError::EmptyResponse)
    }

    fn source(&self) -> RecommendationSource {
        RecommendationSource::Ai
    }
}

/// Prompt sent to the chat-completion backend
pub fn build_prompt(assessment: &PatientAssessment) -> String {
    let profile = assessment.profile();
    let metrics = assessment.metrics();

    format!(
        "As a medical AI assistant, provide personalized recommendations for a patient with the following metabolic profile:

Patient: {age}-year-old {gender}
BMI: {bmi}
TyG Index: {tyg}
TG/HDL Ratio: {ratio}
HbA1c: {hba1c}%
Diabetes Status: {diabetes}
Risk Level: {risk}

Please provide specific recommendations for:
1. Dietary modifications
2. Exercise recommendations
3. Follow-up tests or monitoring
4. Lifestyle changes

Use a professional medical tone and be specific with actionable advice.",
        age = profile.age,
        gender = profile.gender,
        bmi = metrics.bmi,
        tyg = metrics.tyg_index,
        ratio = metrics.tg_hdl_ratio,
        hba1c = profile.hba1c,
        diabetes = profile.diabetes_status,
        risk = assessment.risk().level(),
    )
}

/// Format recommendation text as HTML: `**x**` becomes bold, blank lines
/// split paragraphs and single newlines become line breaks.
pub fn format_recommendations(text: &str) -> String {
    let escaped = escape_html(text);
    let bolded = BOLD.replace_all(&escaped, "<strong>$1</strong>");
    let paragraphs = bolded.replace("\n\n", "</p><p>").replace('\n', "<br>");
    format!("<p>{}</p>", paragraphs)
}

/// Picks the configured backend and falls back to the rule table
#[derive(Clone)]
pub struct RecommendationService {
    provider: Option<Arc<dyn RecommendationProviderTrait>>,
    rules: RuleBasedRecommendationProvider,
}

impl std::fmt::Debug for RecommendationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationService")
            .field("provider", &self.provider.as_ref().map(|p| p.source()))
            .finish()
    }
}

impl Default for RecommendationService {
    fn default() -> Self {
        Self::rules_only()
    }
}

impl RecommendationService {
    pub fn new(provider: Arc<dyn RecommendationProviderTrait>) -> Self {
        Self {
            provider: Some(provider),
            rules: RuleBasedRecommendationProvider,
        }
    }

    /// No external backend configured
    pub fn rules_only() -> Self {
        Self {
            provider: None,
            rules: RuleBasedRecommendationProvider,
        }
    }

    /// Whether an external backend is configured
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn generate(&self, assessment: &PatientAssessment) -> RecommendationOutcome {
        let fallback = |error: Option<String>| RecommendationOutcome {
            html: format_recommendations(&self.rules.recommendations(assessment)),
            source: RecommendationSource::Rules,
            error,
        };

        let Some(provider) = &self.provider else {
            debug!("No recommendation backend configured, using rule table");
            return fallback(None);
        };

        match provider.recommend(assessment).await {
            Ok(text) => {
                info!("Generated recommendations via {:?} backend", provider.source());
                RecommendationOutcome {
                    html: format_recommendations(&text),
                    source: provider.source(),
                    error: None,
                }
            }
            Err(e) => {
                error!("Recommendation backend failed: {}", e);
                fallback(Some(RECOMMENDATION_ERROR_MESSAGE.to_string()))
            }
        }
    }
}

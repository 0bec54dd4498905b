// Testing utilities and mock implementations for the domain layer
// This module is only available when the "mock" feature is enabled

// Re-export useful test mocks from the data layer
pub use metabolic_guide_data::repository::tests::MockPatientRecordRepository;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::auth::{AuthError, AuthServiceTrait, CurrentUser, LoginRequest};
use crate::entities::PatientAssessment;
use crate::health::{ComponentStatus, HealthComponent, HealthServiceTrait, SystemHealth, SystemStatus};
use crate::services::recommendations::{
    RecommendationError, RecommendationProviderTrait, RecommendationSource,
};

/// Recommendation backend that returns fixed text or always fails
#[derive(Debug, Clone)]
pub struct MockRecommendationProvider {
    reply: Option<String>,
}

impl MockRecommendationProvider {
    /// Always answer with `text`
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
        }
    }

    /// Always fail with a 503
    pub fn failing() -> Self {
        Self { reply: None }
    }
}

#[async_trait]
impl RecommendationProviderTrait for MockRecommendationProvider {
    async fn recommend(&self, _assessment: &PatientAssessment) -> Result<String, RecommendationError> {
        self.reply.clone().ok_or_else(|| RecommendationError::Status {
            status: 503,
            message: "mock backend unavailable".to_string(),
        })
    }

    fn source(&self) -> RecommendationSource {
        RecommendationSource::Ai
    }
}

/// Accepts every email/password pair except the configured rejections
#[derive(Debug, Clone, Default)]
pub struct MockAuthService {
    rejected: Vec<String>,
    session_token: Option<String>,
}

impl MockAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `InvalidCredentials` for this email
    pub fn rejecting(mut self, email: &str) -> Self {
        self.rejected.push(email.to_string());
        self
    }

    /// Hand out this remote session token on every successful login
    pub fn with_session(mut self, token: &str) -> Self {
        self.session_token = Some(token.to_string());
        self
    }
}

#[async_trait]
impl AuthServiceTrait for MockAuthService {
    async fn authenticate(&self, request: &LoginRequest) -> Result<CurrentUser, AuthError> {
        let email = request.email.trim();
        if email.is_empty() {
            return Err(AuthError::MissingEmail);
        }
        if self.rejected.iter().any(|r| r == email) {
            return Err(AuthError::InvalidCredentials("Invalid login credentials".to_string()));
        }
        Ok(CurrentUser {
            email: email.to_string(),
            session_token: self.session_token.clone(),
        })
    }

    fn mode(&self) -> &'static str {
        "mock"
    }
}

/// Mock implementation of health services for testing system health
#[derive(Debug)]
pub struct MockHealthService {
    storage_status: ComponentStatus,
    components: HashMap<String, HealthComponent>,
}

impl Default for MockHealthService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHealthService {
    /// All components healthy
    pub fn new() -> Self {
        Self {
            storage_status: ComponentStatus::Healthy,
            components: HashMap::new(),
        }
    }

    pub fn with_degraded_storage(mut self) -> Self {
        self.storage_status = ComponentStatus::Degraded;
        self
    }

    pub fn with_unhealthy_storage(mut self) -> Self {
        self.storage_status = ComponentStatus::Unhealthy;
        self
    }

    /// Add a custom component with a specific status
    pub fn with_component(mut self, name: &str, status: ComponentStatus, details: Option<String>) -> Self {
        self.components
            .insert(name.to_string(), HealthComponent { status, details });
        self
    }
}

#[async_trait]
impl HealthServiceTrait for MockHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let mut components = self.components.clone();
        components.insert(
            "storage".to_string(),
            HealthComponent {
                status: self.storage_status.clone(),
                details: match self.storage_status {
                    ComponentStatus::Healthy => None,
                    ComponentStatus::Degraded => Some("Records are kept in memory".to_string()),
                    ComponentStatus::Unhealthy => Some("Database connection failed".to_string()),
                },
            },
        );

        let status = match self.storage_status {
            ComponentStatus::Healthy => SystemStatus::Healthy,
            ComponentStatus::Degraded => SystemStatus::Degraded,
            ComponentStatus::Unhealthy => SystemStatus::Unhealthy,
        };

        SystemHealth { status, components }
    }

    async fn check_storage_status(&self) -> Result<bool, String> {
        match self.storage_status {
            ComponentStatus::Healthy => Ok(true),
            ComponentStatus::Degraded => Ok(false),
            ComponentStatus::Unhealthy => Err("Database connection failed".to_string()),
        }
    }
}

/// Factory function to create a mock health service
pub fn create_mock_health_service() -> impl HealthServiceTrait {
    MockHealthService::new()
}

//! Domain layer health check functionality
//! Reports on record storage and the recommendation backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;

use metabolic_guide_data::repository::{
    PatientRecordRepository, PatientRecordRepositoryTrait, StorageBackend,
};

/// System health status
#[derive(Debug, Clone, PartialEq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
}

/// Represents the overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub status: SystemStatus,
    /// Component name to status
    pub components: HashMap<String, HealthComponent>,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync + std::fmt::Debug {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;

    /// Check record storage.
    ///
    /// `Ok(true)` when records persist, `Ok(false)` when storage works but
    /// records will not survive a restart, `Err` when it is unusable.
    async fn check_storage_status(&self) -> Result<bool, String>;
}

/// Health checks over the configured storage backend
#[derive(Debug, Clone)]
pub struct HealthService {
    repository: PatientRecordRepository,
    recommendations_configured: bool,
}

impl HealthService {
    pub fn new(repository: PatientRecordRepository, recommendations_configured: bool) -> Self {
        Self {
            repository,
            recommendations_configured,
        }
    }
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let storage = match self.check_storage_status().await {
            Ok(true) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(format!("{} backend", self.repository.backend_name())),
            },
            Ok(false) => HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("SQLite file unavailable, records are kept in memory".to_string()),
            },
            Err(e) => HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some(e),
            },
        };

        let recommendations = HealthComponent {
            status: ComponentStatus::Healthy,
            details: Some(
                if self.recommendations_configured {
                    "AI backend configured"
                } else {
                    "Rule table only"
                }
                .to_string(),
            ),
        };

        let status = match storage.status {
            ComponentStatus::Unhealthy => SystemStatus::Unhealthy,
            ComponentStatus::Degraded => SystemStatus::Degraded,
            ComponentStatus::Healthy => SystemStatus::Healthy,
        };

        SystemHealth {
            status,
            components: vec![
                ("storage".to_string(), storage),
                ("recommendations".to_string(), recommendations),
            ]
            .into_iter()
            .collect(),
        }
    }

    async fn check_storage_status(&self) -> Result<bool, String> {
        match self.repository.backend() {
            StorageBackend::Database(pool) => match pool.get() {
                Ok(_) => Ok(!pool.is_in_memory()),
                Err(e) => {
                    warn!("Storage health check failed: {}", e);
                    Err(format!("Database connection error: {}", e))
                }
            },
            StorageBackend::Memory(_) | StorageBackend::Remote(_) => Ok(true),
        }
    }
}

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use metabolic_guide_domain::auth::token::TokenSettings;
use metabolic_guide_domain::auth::{AuthServiceTrait, DemoAuthService, RemoteAuthService};
use metabolic_guide_domain::database::{initialize_database_pool, DatabaseError};
use metabolic_guide_domain::health::{HealthService, HealthServiceTrait};
use metabolic_guide_domain::repository::{
    InMemoryStorage, PatientRecordRepository, RemoteStore, RepositoryError, StorageBackend,
};
use metabolic_guide_domain::services::recommendations::{
    OpenAiRecommendationProvider, RecommendationError, RecommendationService,
};
use metabolic_guide_domain::services::{
    create_default_assessment_service, AssessmentServiceTrait, PdfRendererTrait, PrintPdfRenderer,
};

use crate::config::{AppConfig, StorageChoice};

/// Startup errors while wiring backends
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("STORAGE_BACKEND=remote but SUPABASE_URL/SUPABASE_ANON_KEY are not configured")]
    MissingRemoteStore,

    #[error("Remote store setup failed: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Database setup failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Recommendation client setup failed: {0}")]
    Recommendation(#[from] RecommendationError),
}

/// Backend handles shared by every handler. Built once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub assessments: Arc<dyn AssessmentServiceTrait>,
    pub health: Arc<dyn HealthServiceTrait>,
    pub auth: Arc<dyn AuthServiceTrait>,
    pub tokens: Arc<TokenSettings>,
    pub pdf: Arc<dyn PdfRendererTrait>,
}

impl AppContext {
    /// Wire services over an already chosen repository
    pub fn new(
        repository: PatientRecordRepository,
        recommendations: RecommendationService,
        auth: Arc<dyn AuthServiceTrait>,
        tokens: TokenSettings,
    ) -> Self {
        let health = HealthService::new(repository.clone(), recommendations.is_configured());
        Self {
            assessments: Arc::new(create_default_assessment_service(repository, recommendations)),
            health: Arc::new(health),
            auth,
            tokens: Arc::new(tokens),
            pdf: Arc::new(PrintPdfRenderer),
        }
    }

    /// Pick the storage, recommendation and sign-in backends from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, ContextError> {
        let remote = config.remote.clone().map(RemoteStore::new).transpose()?;

        let backend = match (config.storage, &remote) {
            (StorageChoice::Remote, None) => return Err(ContextError::MissingRemoteStore),
            (StorageChoice::Remote | StorageChoice::Auto, Some(store)) => {
                info!("Storing records in remote store at {}", store.base_url());
                StorageBackend::Remote(store.clone())
            }
            (StorageChoice::Sqlite, _) => {
                StorageBackend::Database(initialize_database_pool(&config.database)?)
            }
            (StorageChoice::Auto, None) => match initialize_database_pool(&config.database) {
                Ok(pool) => StorageBackend::Database(pool),
                Err(e) => {
                    warn!("No database available ({}), storing records in memory", e);
                    StorageBackend::Memory(InMemoryStorage::new())
                }
            },
            (StorageChoice::Memory, _) => {
                warn!("Storing records in memory; they are lost on restart");
                StorageBackend::Memory(InMemoryStorage::new())
            }
        };

        let recommendations = match &config.openai {
            Some(openai) => {
                info!("AI recommendations enabled with model {}", openai.model);
                let provider = OpenAiRecommendationProvider::new(openai.clone())?;
                RecommendationService::new(Arc::new(provider))
            }
            None => {
                info!("OPENAI_API_KEY not configured, using rule-based recommendations");
                RecommendationService::rules_only()
            }
        };

        let auth: Arc<dyn AuthServiceTrait> = match remote {
            Some(store) => Arc::new(RemoteAuthService::new(store)),
            None => {
                info!("Remote store not configured, sign-in runs in demo mode");
                Arc::new(DemoAuthService)
            }
        };

        Ok(Self::new(
            PatientRecordRepository::new(backend),
            recommendations,
            auth,
            config.tokens.clone(),
        ))
    }
}

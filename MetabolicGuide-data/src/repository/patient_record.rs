use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::models::{CreatePatientRecordRequest, PatientRecord};
#[cfg(feature = "sqlite")]
use crate::database::DatabasePool;
use super::errors::RepositoryError;
use super::in_memory::InMemoryStorage;
use super::remote::RemoteStore;
#[cfg(feature = "sqlite")]
use super::storage::DatabaseStorage;

/// Repository trait for patient records.
///
/// Records are append-only: there is no update or delete.
#[async_trait]
pub trait PatientRecordRepositoryTrait {
    /// Insert a new record, assigning its id.
    ///
    /// `session_token` is the signed-in user's remote store access token;
    /// only the remote store uses it.
    async fn insert(
        &self,
        request: CreatePatientRecordRequest,
        session_token: Option<&str>,
    ) -> Result<PatientRecord, RepositoryError>;

    /// All records ordered by `created_at` descending
    async fn list(&self) -> Result<Vec<PatientRecord>, RepositoryError>;

    /// Get a record by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<PatientRecord>, RepositoryError>;

    /// One page of records, newest first, plus the total count
    async fn list_paginated(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<PatientRecord>, usize), RepositoryError>;

    /// Short name of the backing store, for health reporting
    fn backend_name(&self) -> &'static str;
}

/// Storage chosen at startup
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// Hosted REST store
    Remote(RemoteStore),
    /// Local SQLite database
    #[cfg(feature = "sqlite")]
    Database(DatabasePool),
    /// Process memory; records are lost on restart
    Memory(InMemoryStorage),
}

/// Repository for patient records over one explicit backend.
///
/// Backend failures are returned to the caller; nothing silently falls
/// back to another store.
#[derive(Debug, Clone)]
pub struct PatientRecordRepository {
    backend: StorageBackend,
}

impl Default for PatientRecordRepository {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl PatientRecordRepository {
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(StorageBackend::Memory(InMemoryStorage::new()))
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }
}

#[async_trait]
impl PatientRecordRepositoryTrait for PatientRecordRepository {
    async fn insert(
        &self,
        request: CreatePatientRecordRequest,
        session_token: Option<&str>,
    ) -> Result<PatientRecord, RepositoryError> {
        let record = request.into_record(Uuid::new_v4().to_string());
        debug!("Inserting patient record {} via {} backend", record.id, self.backend_name());

        match &self.backend {
            StorageBackend::Remote(store) => store.insert(&record, session_token).await,
            #[cfg(feature = "sqlite")]
            StorageBackend::Database(pool) => {
                DatabaseStorage::insert(pool, &record).await?;
                Ok(record)
            }
            StorageBackend::Memory(storage) => storage.insert(&record).await,
        }
    }

    async fn list(&self) -> Result<Vec<PatientRecord>, RepositoryError> {
        match &self.backend {
            StorageBackend::Remote(store) => store.list().await,
            #[cfg(feature = "sqlite")]
            StorageBackend::Database(pool) => DatabaseStorage::list(pool).await,
            StorageBackend::Memory(storage) => storage.list().await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<PatientRecord>, RepositoryError> {
        match &self.backend {
            StorageBackend::Remote(store) => store.get_by_id(id).await,
            #[cfg(feature = "sqlite")]
            StorageBackend::Database(pool) => DatabaseStorage::get_by_id(pool, id).await,
            StorageBackend::Memory(storage) => storage.get_by_id(id).await,
        }
    }

    async fn list_paginated(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<PatientRecord>, usize), RepositoryError> {
        match &self.backend {
            StorageBackend::Remote(store) => {
                let records = store.list().await?;
                let total = records.len();
                Ok((records.into_iter().skip(offset).take(limit).collect(), total))
            }
            #[cfg(feature = "sqlite")]
            StorageBackend::Database(pool) => DatabaseStorage::list_paginated(pool, limit, offset).await,
            StorageBackend::Memory(storage) => storage.list_paginated(limit, offset).await,
        }
    }

    fn backend_name(&self) -> &'static str {
        match &self.backend {
            StorageBackend::Remote(_) => "remote",
            #[cfg(feature = "sqlite")]
            StorageBackend::Database(_) => "sqlite",
            StorageBackend::Memory(_) => "memory",
        }
    }
}

/// Mock patient record repository for testing
#[cfg(any(test, feature = "mock"))]
pub mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records inserts in memory; can be told to fail every call
    #[derive(Debug, Clone, Default)]
    pub struct MockPatientRecordRepository {
        records: Arc<Mutex<Vec<PatientRecord>>>,
        session_tokens: Arc<Mutex<Vec<Option<String>>>>,
        fail_with: Option<String>,
    }

    impl MockPatientRecordRepository {
        /// Create a new empty mock repository
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a mock repository with predefined records (kept in the given order)
        pub fn with_records(records: Vec<PatientRecord>) -> Self {
            Self {
                records: Arc::new(Mutex::new(records)),
                ..Self::default()
            }
        }

        /// Every call returns a remote-store error with this message
        pub fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::default()
            }
        }

        /// Number of records inserted so far
        pub fn len(&self) -> usize {
            self.records.lock().map(|records| records.len()).unwrap_or(0)
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Session token passed with each successful insert, oldest first
        pub fn session_tokens(&self) -> Vec<Option<String>> {
            self.session_tokens
                .lock()
                .map(|tokens| tokens.clone())
                .unwrap_or_default()
        }

        fn check(&self) -> Result<(), RepositoryError> {
            match &self.fail_with {
                Some(message) => Err(RepositoryError::Remote {
                    status: 503,
                    message: message.clone(),
                }),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl PatientRecordRepositoryTrait for MockPatientRecordRepository {
        async fn insert(
            &self,
            request: CreatePatientRecordRequest,
            session_token: Option<&str>,
        ) -> Result<PatientRecord, RepositoryError> {
            self.check()?;
            let record = request.into_record(Uuid::new_v4().to_string());
            self.records.lock()?.insert(0, record.clone());
            self.session_tokens.lock()?.push(session_token.map(str::to_string));
            Ok(record)
        }

        async fn list(&self) -> Result<Vec<PatientRecord>, RepositoryError> {
            self.check()?;
            Ok(self.records.lock()?.clone())
        }

        async fn get_by_id(&self, id: &str) -> Result<Option<PatientRecord>, RepositoryError> {
            self.check()?;
            Ok(self.records.lock()?.iter().find(|r| r.id == id).cloned())
        }

        async fn list_paginated(
            &self,
            limit: usize,
            offset: usize,
        ) -> Result<(Vec<PatientRecord>, usize), RepositoryError> {
            let records = self.list().await?;
            let total = records.len();
            Ok((records.into_iter().skip(offset).take(limit).collect(), total))
        }

        fn backend_name(&self) -> &'static str {
            "mock"
        }
    }

    #[cfg(test)]
    mod repository_tests {
        use super::super::*;
        use super::MockPatientRecordRepository;
        use crate::models::patient_record::sample_request;

        #[tokio::test]
        async fn test_memory_backend_assigns_ids() {
            let repo = PatientRecordRepository::in_memory();
            let first = repo.insert(sample_request("A", "2024-01-01T00:00:00Z"), None).await.unwrap();
            let second = repo.insert(sample_request("B", "2024-01-02T00:00:00Z"), Some("ignored")).await.unwrap();

            assert_ne!(first.id, second.id);
            assert!(Uuid::parse_str(&first.id).is_ok());
            assert_eq!(repo.backend_name(), "memory");

            let listed = repo.list().await.unwrap();
            assert_eq!(listed[0].id, second.id);
            assert_eq!(repo.get_by_id(&first.id).await.unwrap(), Some(first));
        }

        #[cfg(feature = "sqlite")]
        #[tokio::test]
        async fn test_database_backend_round_trip() {
            use crate::database::{initialize_database_pool, DatabaseConfig};

            let pool = initialize_database_pool(&DatabaseConfig::in_memory()).unwrap();
            let repo = PatientRecordRepository::new(StorageBackend::Database(pool));
            let saved = repo.insert(sample_request("Jane", "2024-01-01T00:00:00Z"), None).await.unwrap();

            let (page, total) = repo.list_paginated(10, 0).await.unwrap();
            assert_eq!(total, 1);
            assert_eq!(page, vec![saved]);
            assert_eq!(repo.backend_name(), "sqlite");
        }

        #[tokio::test]
        async fn test_failing_mock_surfaces_error() {
            let repo = MockPatientRecordRepository::failing("store offline");
            let err = repo
                .insert(sample_request("A", "2024-01-01T00:00:00Z"), Some("user-session"))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("store offline"));
            assert!(repo.is_empty());
            assert!(repo.session_tokens().is_empty());
        }
    }
}

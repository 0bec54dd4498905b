use std::sync::{Arc, Mutex};

use crate::models::PatientRecord;
use super::errors::RepositoryError;

/// In-memory storage for patient records, used when no database is available
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    records: Arc<Mutex<Vec<PatientRecord>>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub async fn insert(&self, record: &PatientRecord) -> Result<PatientRecord, RepositoryError> {
        let mut store = self.records.lock()?;
        if store.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Validation(format!(
                "record {} already exists",
                record.id
            )));
        }
        store.push(record.clone());
        Ok(record.clone())
    }

    /// All records, newest first
    pub async fn list(&self) -> Result<Vec<PatientRecord>, RepositoryError> {
        let store = self.records.lock()?;
        let mut records = store.clone();
        // Stable sort keeps insertion order for equal timestamps; reverse it so
        // the later insert comes first.
        records.reverse();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Get a record by ID
    pub async fn get_by_id(&self, id: &str) -> Result<Option<PatientRecord>, RepositoryError> {
        let store = self.records.lock()?;
        Ok(store.iter().find(|record| record.id == id).cloned())
    }

    /// One page of records, newest first, plus the total count
    pub async fn list_paginated(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<PatientRecord>, usize), RepositoryError> {
        let records = self.list().await?;
        let total = records.len();
        let page = records.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::patient_record::sample_request;

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let storage = InMemoryStorage::new();
        storage
            .insert(&sample_request("Old", "2024-01-01T08:00:00Z").into_record("a".into()))
            .await
            .unwrap();
        storage
            .insert(&sample_request("New", "2024-03-01T08:00:00Z").into_record("b".into()))
            .await
            .unwrap();
        storage
            .insert(&sample_request("Mid", "2024-02-01T08:00:00Z").into_record("c".into()))
            .await
            .unwrap();

        let names: Vec<String> = storage
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.full_name)
            .collect();
        assert_eq!(names, vec!["New", "Mid", "Old"]);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let storage = InMemoryStorage::new();
        let record = sample_request("Jane", "2024-01-01T08:00:00Z").into_record("same".into());
        storage.insert(&record).await.unwrap();
        assert!(matches!(
            storage.insert(&record).await,
            Err(RepositoryError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_pagination_reports_total() {
        let storage = InMemoryStorage::new();
        for i in 0..5 {
            let created_at = format!("2024-01-0{}T08:00:00Z", i + 1);
            storage
                .insert(&sample_request("P", &created_at).into_record(format!("id-{}", i)))
                .await
                .unwrap();
        }

        let (page, total) = storage.list_paginated(2, 1).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "id-3");
        assert_eq!(page[1].id, "id-2");
    }
}

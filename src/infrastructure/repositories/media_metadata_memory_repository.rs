use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entities::media_metadata::MediaMetadataRecord;
use crate::domain::repositories::media_metadata_repository::{
    MediaMetadataRepository, MediaMetadataRepositoryError, MediaMetadataRepositoryResult,
};

/// Repositorio de metadatos en memoria (pruebas y despliegues sin persistencia)
#[derive(Default)]
pub struct InMemoryMediaMetadataRepository {
    records: RwLock<HashMap<String, MediaMetadataRecord>>,
}

impl InMemoryMediaMetadataRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaMetadataRepository for InMemoryMediaMetadataRepository {
    async fn save_media_metadata(&self, record: MediaMetadataRecord) -> MediaMetadataRepositoryResult<MediaMetadataRecord> {
        let mut records = self.records.write().await;
        if records.contains_key(record.file_id()) {
            return Err(MediaMetadataRepositoryError::AlreadyExists(record.file_id().to_string()));
        }
        records.insert(record.file_id().to_string(), record.clone());
        Ok(record)
    }

    async fn delete_by_file_id(&self, file_id: &str) -> MediaMetadataRepositoryResult<()> {
        self.records.write().await
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| MediaMetadataRepositoryError::NotFound(file_id.to_string()))
    }

    async fn find_by_file_id(&self, file_id: &str) -> MediaMetadataRepositoryResult<Option<MediaMetadataRecord>> {
        Ok(self.records.read().await.get(file_id).cloned())
    }

    async fn find_by_session_id(&self, session_id: &str) -> MediaMetadataRepositoryResult<Vec<MediaMetadataRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<MediaMetadataRecord> = records.values()
            .filter(|record| record.session_id() == session_id)
            .cloned()
            .collect();
        matching.sort_by_key(|record| record.created_at());
        Ok(matching)
    }

    async fn find_all(&self) -> MediaMetadataRepositoryResult<Vec<MediaMetadataRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

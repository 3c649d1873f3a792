use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::application::dtos::media_dto::{CleanupOutcome, MetadataCleanup};
use crate::application::ports::media_ports::MediaCleanupUseCase;
use crate::application::ports::storage_ports::MediaFileStoragePort;
use crate::common::errors::DomainError;
use crate::domain::repositories::media_metadata_repository::MediaMetadataRepository;
use crate::domain::services::media_path_service::MediaPathService;

/// Limpieza de medios con política de mejor esfuerzo: el resultado visible es
/// el borrado del archivo; los fallos del almacén de metadatos quedan en el
/// resultado y en el log, nunca se propagan.
pub struct MediaCleanupService {
    storage: Arc<dyn MediaFileStoragePort>,
    metadata_repository: Arc<dyn MediaMetadataRepository>,
    paths: MediaPathService,
}

impl MediaCleanupService {
    pub fn new(
        storage: Arc<dyn MediaFileStoragePort>,
        metadata_repository: Arc<dyn MediaMetadataRepository>,
    ) -> Self {
        Self {
            storage,
            metadata_repository,
            paths: MediaPathService::new(),
        }
    }

    fn not_deleted(stored_filename: &str) -> CleanupOutcome {
        CleanupOutcome {
            stored_filename: stored_filename.to_string(),
            file_deleted: false,
            metadata: MetadataCleanup::NotAttempted,
        }
    }
}

#[async_trait]
impl MediaCleanupUseCase for MediaCleanupService {
    #[instrument(name = "media_clean", skip(self), fields(dir = %directory.display()))]
    async fn clean(&self, directory: &Path, stored_filename: &str) -> CleanupOutcome {
        if !self.paths.is_safe_stored_filename(stored_filename) {
            warn!("Refusing to delete media with unsafe name: {:?}", stored_filename);
            return Self::not_deleted(stored_filename);
        }

        let media_path = self.paths.media_file_path(directory, stored_filename);
        if let Err(e) = self.storage.delete_file(&media_path).await {
            info!("Could not delete media from filesystem at path {}: {}", media_path.display(), e);
            return Self::not_deleted(stored_filename);
        }

        let file_id = self.paths.file_id_from_stored(stored_filename);
        let metadata = match self.metadata_repository.delete_by_file_id(file_id).await {
            Ok(_) => {
                debug!("Deleted media file and metadata record for {}", file_id);
                MetadataCleanup::Deleted
            },
            Err(e) => {
                info!("Could not delete media data record for file id {}: {}", file_id, e);
                MetadataCleanup::Failed(e.to_string())
            }
        };

        CleanupOutcome {
            stored_filename: stored_filename.to_string(),
            file_deleted: true,
            metadata,
        }
    }

    #[instrument(name = "media_clean_session", skip(self), fields(dir = %directory.display()))]
    async fn clean_session(&self, directory: &Path, session_id: &str) -> Result<Vec<CleanupOutcome>, DomainError> {
        let records = self.metadata_repository.find_by_session_id(session_id).await?;
        debug!("Cleaning {} media files for session {}", records.len(), session_id);

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            let stored_filename = self.paths.stored_filename(record.file_id(), record.file_extension());
            outcomes.push(self.clean(directory, &stored_filename).await);
        }

        let deleted = outcomes.iter().filter(|o| o.deleted()).count();
        info!("Cleaned {}/{} media files for session {}", deleted, outcomes.len(), session_id);
        Ok(outcomes)
    }
}

use std::sync::Arc;

use crate::application::ports::media_ports::{MediaCleanupUseCase, MediaReconciliationUseCase, MediaUploadUseCase};
use crate::application::ports::storage_ports::MediaFileStoragePort;
use crate::application::services::media_cleanup_service::MediaCleanupService;
use crate::application::services::media_reconciliation_service::MediaReconciliationService;
use crate::application::services::media_upload_service::MediaUploadService;
use crate::common::config::{AppConfig, MetadataBackend};
use crate::common::db::create_database_pool;
use crate::common::errors::{DomainError, ErrorKind};
use crate::domain::repositories::media_metadata_repository::MediaMetadataRepository;
use crate::domain::services::media_validator::{DefaultMediaValidator, MediaValidator};
use crate::infrastructure::repositories::media_file_fs_repository::MediaFileFsRepository;
use crate::infrastructure::repositories::media_metadata_fs_repository::MediaMetadataFsRepository;
use crate::infrastructure::repositories::media_metadata_memory_repository::InMemoryMediaMetadataRepository;
use crate::infrastructure::repositories::pg::MediaMetadataPgRepository;

/// Contenedor de los servicios de medios ya conectados
#[derive(Clone)]
pub struct MediaServices {
    pub upload: Arc<dyn MediaUploadUseCase>,
    pub cleanup: Arc<dyn MediaCleanupUseCase>,
    pub reconciliation: Arc<dyn MediaReconciliationUseCase>,
    pub metadata_repository: Arc<dyn MediaMetadataRepository>,
}

/// Fábrica para los diferentes componentes de la aplicación
pub struct AppServiceFactory {
    config: AppConfig,
}

impl AppServiceFactory {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Crea el repositorio de metadatos según el backend configurado
    pub async fn create_metadata_repository(&self) -> Result<Arc<dyn MediaMetadataRepository>, DomainError> {
        let repository: Arc<dyn MediaMetadataRepository> = match self.config.storage.metadata_backend {
            MetadataBackend::Json => Arc::new(
                MediaMetadataFsRepository::new(&self.config.storage.media_root, self.config.timeouts.clone()).await?
            ),
            MetadataBackend::Postgres => {
                let pool = create_database_pool(&self.config).await
                    .map_err(|e| DomainError::internal_error("Database", e.to_string()))?;
                Arc::new(MediaMetadataPgRepository::new(Arc::new(pool)))
            },
            MetadataBackend::Memory => {
                tracing::warn!("Using in-memory media metadata store; records are lost on restart");
                Arc::new(InMemoryMediaMetadataRepository::new())
            },
        };

        tracing::info!("Media metadata backend: {:?}", self.config.storage.metadata_backend);
        Ok(repository)
    }

    /// Conecta los servicios sobre un repositorio de metadatos dado
    pub fn create_media_services(&self, metadata_repository: Arc<dyn MediaMetadataRepository>) -> MediaServices {
        let storage: Arc<dyn MediaFileStoragePort> = Arc::new(MediaFileFsRepository::new(
            self.config.timeouts.clone(),
            &self.config.resources,
        ));
        let validator: Arc<dyn MediaValidator> = Arc::new(DefaultMediaValidator::new(self.config.validation.clone()));

        let upload = MediaUploadService::new(storage.clone(), metadata_repository.clone(), validator)
            .with_sniff_window(self.config.resources.sniff_window_bytes)
            .with_rollback_on_metadata_failure(self.config.storage.rollback_on_metadata_failure);

        let cleanup = MediaCleanupService::new(storage.clone(), metadata_repository.clone());

        let reconciliation = MediaReconciliationService::new(
            storage,
            metadata_repository.clone(),
            self.config.maintenance.orphan_grace(),
        );

        MediaServices {
            upload: Arc::new(upload),
            cleanup: Arc::new(cleanup),
            reconciliation: Arc::new(reconciliation),
            metadata_repository,
        }
    }

    /// Crea repositorio y servicios en un paso
    pub async fn build(&self) -> Result<MediaServices, DomainError> {
        let repository = self.create_metadata_repository().await?;
        Ok(self.create_media_services(repository))
    }

    /// Servicios para un proceso de mantenimiento separado de la aplicación.
    /// Solo sirven backends compartidos entre procesos: con `memory` el
    /// almacén estaría vacío y la reparación borraría todos los medios.
    pub async fn build_for_maintenance(&self) -> Result<MediaServices, DomainError> {
        if self.config.storage.metadata_backend == MetadataBackend::Memory {
            return Err(DomainError::new(
                ErrorKind::InvalidInput,
                "MediaMetadata",
                "The memory metadata backend is not shared with the upload process; use json or postgres for maintenance",
            ));
        }
        self.build().await
    }
}

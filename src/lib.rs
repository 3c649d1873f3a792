// Exportar los módulos principales del proyecto
pub mod common;
pub mod domain;
pub mod application;
pub mod infrastructure;

// Re-exportaciones públicas comunes
pub use application::dtos::media_dto::{CleanupOutcome, MetadataCleanup, ReconciliationReport, UploadContext, UploadedFile};
pub use application::services::media_upload_service::MediaUploadService;
pub use application::services::media_cleanup_service::MediaCleanupService;
pub use application::services::media_reconciliation_service::MediaReconciliationService;
pub use common::config::AppConfig;
pub use common::di::{AppServiceFactory, MediaServices};
pub use common::errors::{DomainError, ErrorKind, MediaError};
pub use domain::entities::media_metadata::{FormSessionRef, MediaMetadataRecord};
pub use domain::services::media_validator::{DefaultMediaValidator, MediaValidator};
pub use infrastructure::repositories::media_file_fs_repository::MediaFileFsRepository;
pub use infrastructure::repositories::media_metadata_fs_repository::MediaMetadataFsRepository;

pub mod dtos;
pub mod ports;
pub mod services;

// Re-exportaciones para facilitar el acceso a los principales puertos
pub use ports::media_ports::{MediaCleanupUseCase, MediaReconciliationUseCase, MediaUploadUseCase};
pub use ports::storage_ports::{MediaFileStoragePort, MediaStorageError, StoredMediaFile};

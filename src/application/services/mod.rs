pub mod media_upload_service;
pub mod media_cleanup_service;
pub mod media_reconciliation_service;

#[cfg(test)]
mod media_service_test;

// Re-exportar para facilitar acceso
pub use media_upload_service::MediaUploadService;
pub use media_cleanup_service::MediaCleanupService;
pub use media_reconciliation_service::MediaReconciliationService;

use std::path::Path;
use async_trait::async_trait;

use crate::application::dtos::media_dto::{CleanupOutcome, ReconciliationReport, UploadContext, UploadedFile};
use crate::common::errors::{DomainError, MediaError};

/// Puerto primario para guardar archivos de medios subidos
#[async_trait]
pub trait MediaUploadUseCase: Send + Sync + 'static {
    /// Valida, copia y registra un archivo; devuelve el nombre almacenado
    async fn store(
        &self,
        file: UploadedFile,
        destination_dir: &Path,
        context: UploadContext,
    ) -> Result<String, MediaError>;
}

/// Puerto primario para la limpieza de medios
#[async_trait]
pub trait MediaCleanupUseCase: Send + Sync + 'static {
    /// Borra un archivo y, si se borró, su registro de metadatos
    async fn clean(&self, directory: &Path, stored_filename: &str) -> CleanupOutcome;

    /// Limpia todos los archivos registrados para una sesión
    async fn clean_session(&self, directory: &Path, session_id: &str) -> Result<Vec<CleanupOutcome>, DomainError>;
}

/// Puerto primario para detectar inconsistencias entre disco y metadatos
#[async_trait]
pub trait MediaReconciliationUseCase: Send + Sync + 'static {
    async fn reconcile(&self, directory: &Path, repair: bool) -> Result<ReconciliationReport, DomainError>;
}

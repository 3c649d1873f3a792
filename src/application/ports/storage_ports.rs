use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::common::errors::DomainError;

/// Errores del almacenamiento físico de medios
#[derive(Debug, thiserror::Error)]
pub enum MediaStorageError {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Timeout error: {0}")]
    Timeout(String),
}

impl From<MediaStorageError> for DomainError {
    fn from(err: MediaStorageError) -> Self {
        match err {
            MediaStorageError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                DomainError::not_found("MediaFile", e.to_string())
            }
            MediaStorageError::IoError(e) => DomainError::internal_error("MediaFile", e.to_string()).with_source(e),
            MediaStorageError::Timeout(msg) => DomainError::timeout("MediaFile", msg),
        }
    }
}

/// Entrada de un directorio de medios
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMediaFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub modified_at: Option<SystemTime>,
}

/// Puerto secundario para el almacenamiento físico de archivos de medios
#[async_trait]
pub trait MediaFileStoragePort: Send + Sync + 'static {
    /// Crea el directorio y sus ancestros (no falla si ya existe) y devuelve
    /// su ruta absoluta canónica
    async fn ensure_directory(&self, dir: &Path) -> Result<PathBuf, MediaStorageError>;

    /// Ruta absoluta canónica de un directorio existente
    async fn resolve_directory(&self, dir: &Path) -> Result<PathBuf, MediaStorageError>;

    /// Indica si el archivo existe
    async fn file_exists(&self, path: &Path) -> Result<bool, MediaStorageError>;

    /// Copia todo el contenido del lector a `path`; devuelve los bytes escritos
    async fn write_stream(
        &self,
        path: &Path,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, MediaStorageError>;

    /// Borra un archivo
    async fn delete_file(&self, path: &Path) -> Result<(), MediaStorageError>;

    /// Lista los archivos regulares de un directorio (no recursivo)
    async fn list_files(&self, dir: &Path) -> Result<Vec<StoredMediaFile>, MediaStorageError>;
}

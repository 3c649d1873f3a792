use async_trait::async_trait;

use crate::common::errors::{DomainError, ErrorKind};
use crate::domain::entities::media_metadata::MediaMetadataRecord;

/**
 * Error types for media metadata store operations.
 *
 * The store is an external fault boundary: callers only rely on `NotFound`
 * being distinguishable, everything else is reported as-is.
 */
#[derive(Debug, thiserror::Error)]
pub enum MediaMetadataRepositoryError {
    /// No record exists for the given file id
    #[error("Media metadata not found: {0}")]
    NotFound(String),

    /// A record with the same file id is already stored
    #[error("Media metadata already exists: {0}")]
    AlreadyExists(String),

    /// Errors raised by the SQL backend
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Filesystem errors of file-backed stores
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Other error: {0}")]
    Other(String),
}

pub type MediaMetadataRepositoryResult<T> = Result<T, MediaMetadataRepositoryError>;

impl From<MediaMetadataRepositoryError> for DomainError {
    fn from(err: MediaMetadataRepositoryError) -> Self {
        match err {
            MediaMetadataRepositoryError::NotFound(id) => DomainError::not_found("MediaMetadata", id),
            MediaMetadataRepositoryError::AlreadyExists(id) => DomainError::already_exists("MediaMetadata", id),
            MediaMetadataRepositoryError::Timeout(msg) => DomainError::timeout("MediaMetadata", msg),
            MediaMetadataRepositoryError::IoError(e) => DomainError::new(
                ErrorKind::InternalError,
                "MediaMetadata",
                format!("IO error: {}", e),
            ).with_source(e),
            other => DomainError::internal_error("MediaMetadata", other.to_string()),
        }
    }
}

/**
 * Side-table store for media metadata records, keyed by file id.
 *
 * Implementations provide their own atomicity for single-record operations;
 * there is no transaction spanning the filesystem and this store.
 */
#[cfg_attr(any(test, feature = "test_utils"), mockall::automock)]
#[async_trait]
pub trait MediaMetadataRepository: Send + Sync + 'static {
    /// Persiste un registro nuevo
    async fn save_media_metadata(&self, record: MediaMetadataRecord) -> MediaMetadataRepositoryResult<MediaMetadataRecord>;

    /// Elimina el registro del id dado; `NotFound` si no existe
    async fn delete_by_file_id(&self, file_id: &str) -> MediaMetadataRepositoryResult<()>;

    /// Busca un registro por id
    async fn find_by_file_id(&self, file_id: &str) -> MediaMetadataRepositoryResult<Option<MediaMetadataRecord>>;

    /// Registros asociados a una sesión de formulario
    async fn find_by_session_id(&self, session_id: &str) -> MediaMetadataRepositoryResult<Vec<MediaMetadataRecord>>;

    /// Todos los registros (usado por la reconciliación)
    async fn find_all(&self) -> MediaMetadataRepositoryResult<Vec<MediaMetadataRecord>>;
}

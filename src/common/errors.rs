use std::fmt::{Display, Formatter, Result as FmtResult};
use std::error::Error as StdError;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::repositories::media_metadata_repository::MediaMetadataRepositoryError;
use crate::domain::services::media_validator::MediaValidationError;

/// Clase de error que ven los llamadores, independiente de la capa de origen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    /// Entrada inválida; el llamador debe mostrarla al usuario
    InvalidInput,
    Timeout,
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            ErrorKind::NotFound => "Not Found",
            ErrorKind::AlreadyExists => "Already Exists",
            ErrorKind::InvalidInput => "Invalid Input",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::InternalError => "Internal Error",
        };
        f.write_str(label)
    }
}

/// Error común entre capas: clase, entidad afectada y causa original
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct DomainError {
    pub kind: ErrorKind,
    /// Entidad afectada (ej: "Media", "MediaMetadata", "MediaFile")
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl DomainError {
    pub fn new<S: Into<String>>(kind: ErrorKind, entity_type: &'static str, message: S) -> Self {
        Self {
            kind,
            entity_type,
            entity_id: None,
            message: message.into(),
            source: None,
        }
    }

    fn for_entity(kind: ErrorKind, entity_type: &'static str, entity_id: String, verb: &str) -> Self {
        Self {
            message: format!("{} {}: {}", entity_type, verb, entity_id),
            entity_id: Some(entity_id),
            ..Self::new(kind, entity_type, String::new())
        }
    }

    pub fn not_found<S: Into<String>>(entity_type: &'static str, entity_id: S) -> Self {
        Self::for_entity(ErrorKind::NotFound, entity_type, entity_id.into(), "not found")
    }

    pub fn already_exists<S: Into<String>>(entity_type: &'static str, entity_id: S) -> Self {
        Self::for_entity(ErrorKind::AlreadyExists, entity_type, entity_id.into(), "already exists")
    }

    pub fn timeout<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self::new(ErrorKind::Timeout, entity_type, message)
    }

    pub fn internal_error<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self::new(ErrorKind::InternalError, entity_type, message)
    }

    /// Adjunta la causa original
    pub fn with_source<E: StdError + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// Convierte errores de bajo nivel en `DomainError` con un mensaje de contexto
pub trait ErrorContext<T> {
    fn with_context<C, F>(self, entity_type: &'static str, context: F) -> Result<T, DomainError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E: StdError + Send + Sync + 'static> ErrorContext<T> for Result<T, E> {
    fn with_context<C, F>(self, entity_type: &'static str, context: F) -> Result<T, DomainError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let message = format!("{}: {}", context().into(), e);
            DomainError::internal_error(entity_type, message).with_source(e)
        })
    }
}

/// Errores de las operaciones de subida de medios
#[derive(Error, Debug)]
pub enum MediaError {
    /// El archivo no pasó la validación; no hubo efectos secundarios
    #[error("Media validation failed: {0}")]
    Validation(#[from] MediaValidationError),

    #[error("Could not create media directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fallo de E/S durante la copia; conserva el mensaje original
    #[error("Could not copy file to destination due to {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not save media metadata for file id {file_id}: {source}")]
    Metadata {
        file_id: String,
        #[source]
        source: MediaMetadataRepositoryError,
    },

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl MediaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::Validation(_) => ErrorKind::InvalidInput,
            MediaError::Timeout(_) => ErrorKind::Timeout,
            MediaError::Metadata { source: MediaMetadataRepositoryError::AlreadyExists(_), .. } => ErrorKind::AlreadyExists,
            _ => ErrorKind::InternalError,
        }
    }
}

impl From<MediaError> for DomainError {
    fn from(err: MediaError) -> Self {
        let kind = err.kind();
        let entity_id = match &err {
            MediaError::Metadata { file_id, .. } => Some(file_id.clone()),
            _ => None,
        };
        DomainError {
            kind,
            entity_type: "Media",
            entity_id,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

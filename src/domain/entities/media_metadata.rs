use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error en la creación de registros de metadatos de medios
#[derive(Debug, thiserror::Error)]
pub enum MediaMetadataError {
    #[error("Identificador de archivo inválido: {0}")]
    InvalidFileId(String),

    #[error("Campo obligatorio vacío: {0}")]
    MissingField(&'static str),
}

/// Tipo de resultado para operaciones con registros de metadatos
pub type MediaMetadataResult<T> = Result<T, MediaMetadataError>;

/// Referencia a la sesión de formulario propietaria de un archivo.
/// La sesión en sí vive fuera de este crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FormSessionRef {
    id: String,
}

impl FormSessionRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Represents the side-table entry describing one stored media file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaMetadataRecord {
    /// Generated identifier, also the stem of the stored filename
    file_id: String,

    /// Absolute path of the stored file
    file_path: String,

    /// Owning form session
    session_id: String,

    /// Extension of the original filename, without the dot
    file_extension: Option<String>,

    /// Bytes actually written to disk
    content_length: u64,

    username: String,

    /// User on whose behalf the upload was made, if delegated
    as_user: Option<String>,

    domain: String,

    app_id: String,

    created_at: DateTime<Utc>,
}

impl MediaMetadataRecord {
    /// Crea un nuevo registro con validación
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file_id: String,
        file_path: String,
        session: &FormSessionRef,
        file_extension: Option<String>,
        content_length: u64,
        username: String,
        as_user: Option<String>,
        domain: String,
        app_id: String,
    ) -> MediaMetadataResult<Self> {
        Self::with_timestamp(
            file_id,
            file_path,
            session,
            file_extension,
            content_length,
            username,
            as_user,
            domain,
            app_id,
            Utc::now(),
        )
    }

    /// Crea un registro con fecha de creación específica (para reconstrucción)
    #[allow(clippy::too_many_arguments)]
    pub fn with_timestamp(
        file_id: String,
        file_path: String,
        session: &FormSessionRef,
        file_extension: Option<String>,
        content_length: u64,
        username: String,
        as_user: Option<String>,
        domain: String,
        app_id: String,
        created_at: DateTime<Utc>,
    ) -> MediaMetadataResult<Self> {
        // El id se usa como prefijo del nombre almacenado: no puede contener '.'
        if file_id.is_empty() || file_id.contains('.') || file_id.contains('/') {
            return Err(MediaMetadataError::InvalidFileId(file_id));
        }
        if username.trim().is_empty() {
            return Err(MediaMetadataError::MissingField("username"));
        }
        if domain.trim().is_empty() {
            return Err(MediaMetadataError::MissingField("domain"));
        }
        if app_id.trim().is_empty() {
            return Err(MediaMetadataError::MissingField("app_id"));
        }

        Ok(Self {
            file_id,
            file_path,
            session_id: session.id().to_string(),
            file_extension,
            content_length,
            username,
            as_user,
            domain,
            app_id,
            created_at,
        })
    }

    // Getters
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn file_extension(&self) -> Option<&str> {
        self.file_extension.as_deref()
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn as_user(&self) -> Option<&str> {
        self.as_user.as_deref()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

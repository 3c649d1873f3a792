use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::domain::entities::media_metadata::FormSessionRef;
use crate::domain::services::media_validator::MediaValidationError;

/// Archivo recibido en una subida: contenido, nombre original y tamaño declarado
pub struct UploadedFile {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    original_filename: Option<String>,
    declared_size: u64,
}

impl UploadedFile {
    pub fn new(
        reader: Box<dyn AsyncRead + Send + Unpin>,
        original_filename: Option<String>,
        declared_size: u64,
    ) -> Self {
        Self {
            reader,
            original_filename,
            declared_size,
        }
    }

    /// Crea un archivo a partir de bytes en memoria; el tamaño declarado es su longitud
    pub fn from_bytes(content: impl Into<Bytes>, original_filename: impl Into<String>) -> Self {
        let content: Bytes = content.into();
        let declared_size = content.len() as u64;
        Self::new(
            Box::new(std::io::Cursor::new(content)),
            Some(original_filename.into()),
            declared_size,
        )
    }

    /// Crea un archivo a partir de un stream de chunks (p. ej. un campo multipart)
    pub fn from_stream<S>(stream: S, original_filename: Option<String>, declared_size: u64) -> Self
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Send + Unpin + 'static,
    {
        Self::new(Box::new(StreamReader::new(stream)), original_filename, declared_size)
    }

    /// Abre un archivo local; el nombre original es el del archivo
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        let declared_size = file.metadata().await?.len();
        let original_filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        Ok(Self::new(Box::new(file), original_filename, declared_size))
    }

    pub fn original_filename(&self) -> Option<&str> {
        self.original_filename.as_deref()
    }

    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    /// Separa el lector del resto de datos
    pub fn into_parts(self) -> (Box<dyn AsyncRead + Send + Unpin>, Option<String>, u64) {
        (self.reader, self.original_filename, self.declared_size)
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("original_filename", &self.original_filename)
            .field("declared_size", &self.declared_size)
            .finish_non_exhaustive()
    }
}

/// Contexto de quién sube el archivo y para qué sesión
#[derive(Debug, Clone)]
pub struct UploadContext {
    pub session: FormSessionRef,
    pub username: String,
    pub as_user: Option<String>,
    pub domain: String,
    pub app_id: String,
}

impl UploadContext {
    pub fn new(
        session: FormSessionRef,
        username: impl Into<String>,
        as_user: Option<String>,
        domain: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            session,
            username: username.into(),
            as_user,
            domain: domain.into(),
            app_id: app_id.into(),
        }
    }

    /// Comprueba los campos que el registro de metadatos exige
    pub fn validate(&self) -> Result<(), MediaValidationError> {
        let required = [
            ("username", &self.username),
            ("domain", &self.domain),
            ("app_id", &self.app_id),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(MediaValidationError::MissingContext(*field)),
            None => Ok(()),
        }
    }
}

/// Resultado del borrado de metadatos tras borrar el archivo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum MetadataCleanup {
    /// El registro se borró
    Deleted,
    /// No se intentó porque el archivo no se pudo borrar
    NotAttempted,
    /// El almacén falló (incluye registro inexistente); solo se registra en el log
    Failed(String),
}

/// Resultado de una limpieza: distingue el borrado del archivo del de sus metadatos
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub stored_filename: String,
    pub file_deleted: bool,
    pub metadata: MetadataCleanup,
}

impl CleanupOutcome {
    /// Única señal del flujo original: si el archivo se borró del disco
    pub fn deleted(&self) -> bool {
        self.file_deleted
    }

    /// Archivo y registro borrados
    pub fn fully_cleaned(&self) -> bool {
        self.file_deleted && self.metadata == MetadataCleanup::Deleted
    }

    /// Se borró el archivo pero el registro quedó huérfano
    pub fn left_orphaned_metadata(&self) -> bool {
        self.file_deleted && matches!(self.metadata, MetadataCleanup::Failed(_))
    }
}

/// Inconsistencias entre el directorio de medios y el almacén de metadatos
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub directory: PathBuf,
    /// Archivos sin registro (copia completada pero registro no guardado)
    pub orphaned_files: Vec<PathBuf>,
    /// Registros cuyo archivo ya no existe
    pub orphaned_records: Vec<String>,
    /// Huérfanos eliminados cuando se ejecuta en modo reparación
    pub repaired: usize,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_files.is_empty() && self.orphaned_records.is_empty()
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, info, instrument, warn};

use crate::application::dtos::media_dto::{UploadContext, UploadedFile};
use crate::application::ports::media_ports::MediaUploadUseCase;
use crate::application::ports::storage_ports::{MediaFileStoragePort, MediaStorageError};
use crate::common::errors::MediaError;
use crate::domain::entities::media_metadata::MediaMetadataRecord;
use crate::domain::repositories::media_metadata_repository::{MediaMetadataRepository, MediaMetadataRepositoryError};
use crate::domain::services::media_path_service::MediaPathService;
use crate::domain::services::media_validator::{MediaValidationError, MediaValidator};

/// Servicio que valida, copia a disco y registra archivos de medios subidos
pub struct MediaUploadService {
    storage: Arc<dyn MediaFileStoragePort>,
    metadata_repository: Arc<dyn MediaMetadataRepository>,
    validator: Arc<dyn MediaValidator>,
    paths: MediaPathService,
    sniff_window: usize,
    rollback_on_metadata_failure: bool,
}

impl MediaUploadService {
    pub fn new(
        storage: Arc<dyn MediaFileStoragePort>,
        metadata_repository: Arc<dyn MediaMetadataRepository>,
        validator: Arc<dyn MediaValidator>,
    ) -> Self {
        Self {
            storage,
            metadata_repository,
            validator,
            paths: MediaPathService::new(),
            sniff_window: 8 * 1024,
            rollback_on_metadata_failure: true,
        }
    }

    /// Tamaño de la ventana de detección de contenido
    pub fn with_sniff_window(mut self, bytes: usize) -> Self {
        self.sniff_window = bytes.max(1);
        self
    }

    /// Borrar (o no) el archivo copiado si falla el guardado de metadatos
    pub fn with_rollback_on_metadata_failure(mut self, rollback: bool) -> Self {
        self.rollback_on_metadata_failure = rollback;
        self
    }

    /// Lee hasta `sniff_window` bytes del inicio del contenido
    async fn read_head(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> std::io::Result<Vec<u8>> {
        let mut head = Vec::with_capacity(self.sniff_window.min(64 * 1024));
        reader.take(self.sniff_window as u64).read_to_end(&mut head).await?;
        Ok(head)
    }

    /// Borra un archivo a medio escribir o sin registro, solo registrando fallos
    async fn discard_file(&self, path: &Path, reason: &str) {
        match self.storage.delete_file(path).await {
            Ok(_) => debug!("Removed {} after {}", path.display(), reason),
            Err(MediaStorageError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => warn!("Could not remove {} after {}: {}", path.display(), reason, e),
        }
    }

    fn storage_error_on_copy(path: PathBuf, err: MediaStorageError) -> MediaError {
        match err {
            MediaStorageError::IoError(source) => MediaError::Copy { path, source },
            MediaStorageError::Timeout(msg) => MediaError::Timeout(msg),
        }
    }
}

#[async_trait]
impl MediaUploadUseCase for MediaUploadService {
    #[instrument(
        name = "media_upload",
        skip(self, file, context),
        fields(
            dir = %destination_dir.display(),
            session = %context.session.id(),
            domain = %context.domain,
            app_id = %context.app_id,
        )
    )]
    async fn store(
        &self,
        file: UploadedFile,
        destination_dir: &Path,
        context: UploadContext,
    ) -> Result<String, MediaError> {
        let (mut reader, original_filename, declared_size) = file.into_parts();

        // Validación antes de cualquier efecto secundario
        context.validate()?;
        let head = self.read_head(&mut *reader).await.map_err(|source| MediaError::Copy {
            path: destination_dir.to_path_buf(),
            source,
        })?;
        self.validator.validate(&head, original_filename.as_deref(), declared_size)?;

        let file_id = self.paths.generate_file_id();
        let extension = original_filename.as_deref().and_then(|name| self.paths.extension_of(name));
        let stored_filename = self.paths.stored_filename(&file_id, extension.as_deref());

        // El registro guarda la ruta absoluta, sin importar cómo la escribió el llamador
        let destination_dir = self.storage.ensure_directory(destination_dir).await.map_err(|e| match e {
            MediaStorageError::IoError(source) => MediaError::Directory {
                path: destination_dir.to_path_buf(),
                source,
            },
            MediaStorageError::Timeout(msg) => MediaError::Timeout(msg),
        })?;
        let file_path = self.paths.media_file_path(&destination_dir, &stored_filename);

        // Se copia la ventana ya leída seguida del resto del stream.
        // Con límite configurado se lee un byte de más para detectar el exceso.
        let mut content = std::io::Cursor::new(head).chain(reader);
        let written = match self.validator.max_upload_bytes() {
            Some(max) => {
                let mut limited = (&mut content).take(max.saturating_add(1));
                self.storage.write_stream(&file_path, &mut limited).await
            },
            None => self.storage.write_stream(&file_path, &mut content).await,
        };

        let content_length = match written {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Could not copy {} to {}: {}", stored_filename, file_path.display(), e);
                self.discard_file(&file_path, "failed copy").await;
                return Err(Self::storage_error_on_copy(file_path, e));
            }
        };

        if let Some(max) = self.validator.max_upload_bytes() {
            if content_length > max {
                warn!("Upload {} exceeded {} bytes while copying", stored_filename, max);
                self.discard_file(&file_path, "oversized upload").await;
                return Err(MediaError::Validation(MediaValidationError::TooLarge {
                    filename: original_filename.unwrap_or_default(),
                    size: content_length,
                    max,
                }));
            }
        }

        let record = MediaMetadataRecord::new(
            file_id.clone(),
            file_path.to_string_lossy().into_owned(),
            &context.session,
            extension,
            content_length,
            context.username,
            context.as_user,
            context.domain,
            context.app_id,
        )
        .map_err(|e| MediaError::Metadata {
            file_id: file_id.clone(),
            source: MediaMetadataRepositoryError::Other(e.to_string()),
        });

        let saved = match record {
            Ok(record) => self.metadata_repository.save_media_metadata(record).await
                .map_err(|source| MediaError::Metadata { file_id: file_id.clone(), source }),
            Err(e) => Err(e),
        };

        if let Err(e) = saved {
            error!("Could not save media metadata for {}: {}", file_id, e);
            if self.rollback_on_metadata_failure {
                self.discard_file(&file_path, "metadata failure").await;
            } else {
                warn!("Leaving orphaned media file at {}", file_path.display());
            }
            return Err(e);
        }

        info!("Stored media {} ({} bytes)", stored_filename, content_length);
        Ok(stored_filename)
    }
}

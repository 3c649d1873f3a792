use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt, BufReader, BufWriter};
use tokio::time;

use crate::application::ports::storage_ports::{MediaFileStoragePort, MediaStorageError, StoredMediaFile};
use crate::common::config::{ResourceConfig, TimeoutConfig};

/// Implementación del almacenamiento de medios sobre el sistema de archivos local
pub struct MediaFileFsRepository {
    timeouts: TimeoutConfig,
    buffer_size: usize,
}

impl MediaFileFsRepository {
    pub fn new(timeouts: TimeoutConfig, resources: &ResourceConfig) -> Self {
        Self {
            timeouts,
            buffer_size: resources.copy_buffer_bytes.max(4096),
        }
    }
}

impl Default for MediaFileFsRepository {
    fn default() -> Self {
        Self::new(TimeoutConfig::default(), &ResourceConfig::default())
    }
}

#[async_trait]
impl MediaFileStoragePort for MediaFileFsRepository {
    async fn ensure_directory(&self, dir: &Path) -> Result<PathBuf, MediaStorageError> {
        time::timeout(self.timeouts.dir_timeout(), fs::create_dir_all(dir))
            .await
            .map_err(|_| MediaStorageError::Timeout(format!("Timeout creating directory: {}", dir.display())))??;
        self.resolve_directory(dir).await
    }

    async fn resolve_directory(&self, dir: &Path) -> Result<PathBuf, MediaStorageError> {
        let resolved = time::timeout(self.timeouts.dir_timeout(), fs::canonicalize(dir))
            .await
            .map_err(|_| MediaStorageError::Timeout(format!("Timeout resolving directory: {}", dir.display())))??;
        Ok(resolved)
    }

    async fn file_exists(&self, path: &Path) -> Result<bool, MediaStorageError> {
        let exists = time::timeout(self.timeouts.file_timeout(), fs::try_exists(path))
            .await
            .map_err(|_| MediaStorageError::Timeout(format!("Timeout checking file: {}", path.display())))??;
        Ok(exists)
    }

    async fn write_stream(
        &self,
        path: &Path,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, MediaStorageError> {
        let file = time::timeout(self.timeouts.file_timeout(), fs::File::create(path))
            .await
            .map_err(|_| MediaStorageError::Timeout(format!("Timeout creating file: {}", path.display())))??;

        let mut writer = BufWriter::with_capacity(self.buffer_size, file);
        let mut reader = BufReader::with_capacity(self.buffer_size, reader);

        let copy = async {
            let written = tokio::io::copy_buf(&mut reader, &mut writer).await?;
            writer.flush().await?;
            writer.get_ref().sync_all().await?;
            Ok::<u64, std::io::Error>(written)
        };

        let written = time::timeout(self.timeouts.copy_timeout(), copy)
            .await
            .map_err(|_| MediaStorageError::Timeout(format!("Timeout copying content to: {}", path.display())))??;

        tracing::debug!("Wrote {} bytes to {}", written, path.display());
        Ok(written)
    }

    async fn delete_file(&self, path: &Path) -> Result<(), MediaStorageError> {
        time::timeout(self.timeouts.file_timeout(), fs::remove_file(path))
            .await
            .map_err(|_| MediaStorageError::Timeout(format!("Timeout deleting file: {}", path.display())))??;
        Ok(())
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<StoredMediaFile>, MediaStorageError> {
        let mut entries = time::timeout(self.timeouts.dir_timeout(), fs::read_dir(dir))
            .await
            .map_err(|_| MediaStorageError::Timeout(format!("Timeout reading directory: {}", dir.display())))??;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    // La entrada pudo borrarse mientras listábamos
                    tracing::debug!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            files.push(StoredMediaFile {
                path: entry.path(),
                file_name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                modified_at: metadata.modified().ok(),
            });
        }

        Ok(files)
    }
}

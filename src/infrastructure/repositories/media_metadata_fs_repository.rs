use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time;
use uuid::Uuid;

use crate::common::config::TimeoutConfig;
use crate::domain::entities::media_metadata::MediaMetadataRecord;
use crate::domain::repositories::media_metadata_repository::{
    MediaMetadataRepository, MediaMetadataRepositoryError, MediaMetadataRepositoryResult,
};

/// Nombre del índice dentro de la raíz de medios
pub const METADATA_INDEX_FILE: &str = "media_metadata.json";

/// Índice persistido en disco
#[derive(Serialize, Deserialize, Debug, Default)]
struct MetadataIndex {
    records: HashMap<String, MediaMetadataRecord>,
    version: u32, // Versión para detectar cambios
}

/// Misma forma que `MetadataIndex`, para serializar sin clonar los registros
#[derive(Serialize)]
struct MetadataIndexSnapshot<'a> {
    records: &'a HashMap<String, MediaMetadataRecord>,
    version: u32,
}

/// Marca del archivo en disco: fecha de modificación, tamaño e identidad.
/// Cada guardado crea un archivo nuevo (rename), así que la identidad cambia
/// aunque la fecha caiga en el mismo tick.
type DiskStamp = (SystemTime, u64, u64);

#[cfg(unix)]
fn file_identity(metadata: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn file_identity(_metadata: &std::fs::Metadata) -> u64 {
    0
}

/// Repositorio de metadatos de medios respaldado por un índice JSON.
///
/// Varios procesos pueden compartir el índice (la aplicación y el binario de
/// mantenimiento): antes de cada operación se recarga si cambió en disco.
pub struct MediaMetadataFsRepository {
    index_path: PathBuf,
    index: RwLock<MetadataIndex>,
    save_mutex: Mutex<()>, // Para evitar múltiples guardados concurrentes
    loaded_stamp: Mutex<Option<DiskStamp>>,
    timeouts: TimeoutConfig,
}

impl MediaMetadataFsRepository {
    /// Abre (o crea) el índice en `storage_root/media_metadata.json`
    pub async fn new(storage_root: impl AsRef<Path>, timeouts: TimeoutConfig) -> MediaMetadataRepositoryResult<Self> {
        let index_path = storage_root.as_ref().join(METADATA_INDEX_FILE);
        let index = Self::load_index(&index_path, &timeouts).await?;
        let stamp = Self::disk_stamp(&index_path).await;

        Ok(Self {
            index_path,
            index: RwLock::new(index),
            save_mutex: Mutex::new(()),
            loaded_stamp: Mutex::new(stamp),
            timeouts,
        })
    }

    async fn disk_stamp(path: &Path) -> Option<DiskStamp> {
        let metadata = fs::metadata(path).await.ok()?;
        Some((metadata.modified().ok()?, metadata.len(), file_identity(&metadata)))
    }

    /// Carga el índice desde disco; un índice corrupto se respalda y se reemplaza
    async fn load_index(index_path: &Path, timeouts: &TimeoutConfig) -> MediaMetadataRepositoryResult<MetadataIndex> {
        if !index_path.exists() {
            tracing::info!("No existing media metadata index at {}, starting empty", index_path.display());
            return Ok(MetadataIndex { records: HashMap::new(), version: 1 });
        }

        let content = time::timeout(timeouts.lock_timeout(), fs::read_to_string(index_path))
            .await
            .map_err(|_| MediaMetadataRepositoryError::Timeout(
                format!("Timeout reading media metadata index from {}", index_path.display())
            ))??;

        if content.trim().is_empty() {
            return Ok(MetadataIndex { records: HashMap::new(), version: 1 });
        }

        match serde_json::from_str::<MetadataIndex>(&content) {
            Ok(index) => {
                tracing::info!("Loaded media metadata index with {} records (version: {})",
                               index.records.len(), index.version);
                Ok(index)
            },
            Err(e) => {
                tracing::error!("Error parsing media metadata index: {}", e);
                let backup_path = index_path.with_extension("json.bak");
                if let Err(copy_err) = fs::copy(index_path, &backup_path).await {
                    tracing::error!("Failed to backup corrupted index file: {}", copy_err);
                } else {
                    tracing::info!("Backed up corrupted media metadata index to {}", backup_path.display());
                }
                Ok(MetadataIndex { records: HashMap::new(), version: 1 })
            }
        }
    }

    /// El índice en disco cambió desde la última lectura o escritura de esta instancia
    async fn is_stale(&self) -> bool {
        let current = Self::disk_stamp(&self.index_path).await;
        current.is_some() && current != *self.loaded_stamp.lock().await
    }

    /// Recarga el índice si otro proceso lo modificó
    async fn refresh(&self, index: &mut MetadataIndex) -> MediaMetadataRepositoryResult<()> {
        let current = Self::disk_stamp(&self.index_path).await;
        let mut loaded = self.loaded_stamp.lock().await;
        if current.is_some() && current != *loaded {
            *index = Self::load_index(&self.index_path, &self.timeouts).await?;
            *loaded = current;
            tracing::debug!("Reloaded media metadata index from {}", self.index_path.display());
        }
        Ok(())
    }

    /// Guarda el índice de forma atómica (archivo temporal + rename).
    /// La versión en memoria solo avanza si el rename tuvo éxito.
    async fn persist(&self, index: &mut MetadataIndex) -> MediaMetadataRepositoryResult<()> {
        let _lock = time::timeout(self.timeouts.lock_timeout(), self.save_mutex.lock())
            .await
            .map_err(|_| MediaMetadataRepositoryError::Timeout(
                "Timeout acquiring save lock for media metadata".to_string()
            ))?;

        let next_version = index.version + 1;
        let json = serde_json::to_string_pretty(&MetadataIndexSnapshot {
            records: &index.records,
            version: next_version,
        })?;

        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Nombre temporal único: otro proceso puede estar guardando a la vez
        let temp_path = self.index_path.with_extension(format!("json.{}.tmp", Uuid::new_v4()));
        fs::write(&temp_path, &json).await?;
        if let Err(e) = fs::rename(&temp_path, &self.index_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        index.version = next_version;
        *self.loaded_stamp.lock().await = Self::disk_stamp(&self.index_path).await;

        tracing::debug!("Saved media metadata index (version {}) to {}", index.version, self.index_path.display());
        Ok(())
    }

    /// Bloqueo de escritura con el índice ya sincronizado con el disco
    async fn write_index(&self) -> MediaMetadataRepositoryResult<RwLockWriteGuard<'_, MetadataIndex>> {
        let mut index = time::timeout(self.timeouts.lock_timeout(), self.index.write())
            .await
            .map_err(|_| MediaMetadataRepositoryError::Timeout(
                "Timeout acquiring write lock for media metadata".to_string()
            ))?;
        self.refresh(&mut index).await?;
        Ok(index)
    }

    /// Bloqueo de lectura con el índice ya sincronizado con el disco
    async fn read_index(&self) -> MediaMetadataRepositoryResult<RwLockReadGuard<'_, MetadataIndex>> {
        if self.is_stale().await {
            drop(self.write_index().await?);
        }
        time::timeout(self.timeouts.lock_timeout(), self.index.read())
            .await
            .map_err(|_| MediaMetadataRepositoryError::Timeout(
                "Timeout acquiring read lock for media metadata".to_string()
            ))
    }
}

#[async_trait]
impl MediaMetadataRepository for MediaMetadataFsRepository {
    async fn save_media_metadata(&self, record: MediaMetadataRecord) -> MediaMetadataRepositoryResult<MediaMetadataRecord> {
        let mut index = self.write_index().await?;

        if index.records.contains_key(record.file_id()) {
            return Err(MediaMetadataRepositoryError::AlreadyExists(record.file_id().to_string()));
        }

        index.records.insert(record.file_id().to_string(), record.clone());
        if let Err(e) = self.persist(&mut index).await {
            // Mantener memoria y disco alineados
            index.records.remove(record.file_id());
            return Err(e);
        }

        Ok(record)
    }

    async fn delete_by_file_id(&self, file_id: &str) -> MediaMetadataRepositoryResult<()> {
        let mut index = self.write_index().await?;

        let removed = index.records.remove(file_id)
            .ok_or_else(|| MediaMetadataRepositoryError::NotFound(file_id.to_string()))?;

        if let Err(e) = self.persist(&mut index).await {
            index.records.insert(file_id.to_string(), removed);
            return Err(e);
        }

        Ok(())
    }

    async fn find_by_file_id(&self, file_id: &str) -> MediaMetadataRepositoryResult<Option<MediaMetadataRecord>> {
        let index = self.read_index().await?;
        Ok(index.records.get(file_id).cloned())
    }

    async fn find_by_session_id(&self, session_id: &str) -> MediaMetadataRepositoryResult<Vec<MediaMetadataRecord>> {
        let index = self.read_index().await?;
        let mut records: Vec<MediaMetadataRecord> = index.records.values()
            .filter(|record| record.session_id() == session_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.created_at());
        Ok(records)
    }

    async fn find_all(&self) -> MediaMetadataRepositoryResult<Vec<MediaMetadataRecord>> {
        let index = self.read_index().await?;
        Ok(index.records.values().cloned().collect())
    }
}

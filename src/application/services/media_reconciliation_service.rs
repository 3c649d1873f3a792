use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::application::dtos::media_dto::ReconciliationReport;
use crate::application::ports::media_ports::MediaReconciliationUseCase;
use crate::application::ports::storage_ports::{MediaFileStoragePort, MediaStorageError};
use crate::common::errors::DomainError;
use crate::domain::repositories::media_metadata_repository::MediaMetadataRepository;
use crate::domain::services::media_path_service::MediaPathService;

/// Detecta (y opcionalmente repara) inconsistencias entre un directorio de
/// medios y el almacén de metadatos: archivos sin registro tras un fallo entre
/// copia y guardado, y registros sin archivo tras un fallo entre borrados.
pub struct MediaReconciliationService {
    storage: Arc<dyn MediaFileStoragePort>,
    metadata_repository: Arc<dyn MediaMetadataRepository>,
    paths: MediaPathService,
    orphan_grace: Duration,
}

impl MediaReconciliationService {
    pub fn new(
        storage: Arc<dyn MediaFileStoragePort>,
        metadata_repository: Arc<dyn MediaMetadataRepository>,
        orphan_grace: Duration,
    ) -> Self {
        Self {
            storage,
            metadata_repository,
            paths: MediaPathService::new(),
            orphan_grace,
        }
    }

    /// Un archivo recién copiado puede no tener registro todavía
    fn is_past_grace(&self, modified_at: Option<SystemTime>) -> bool {
        match modified_at.and_then(|m| SystemTime::now().duration_since(m).ok()) {
            Some(age) => age >= self.orphan_grace,
            None => true,
        }
    }

    /// Solo los nombres con forma `<uuid>[.ext]` los genera el almacenamiento
    fn is_media_name(&self, file_name: &str) -> bool {
        Uuid::parse_str(self.paths.file_id_from_stored(file_name)).is_ok()
    }
}

#[async_trait]
impl MediaReconciliationUseCase for MediaReconciliationService {
    #[instrument(name = "media_reconcile", skip(self), fields(dir = %requested.display()))]
    async fn reconcile(&self, requested: &Path, repair: bool) -> Result<ReconciliationReport, DomainError> {
        let mut report = ReconciliationReport {
            directory: requested.to_path_buf(),
            ..ReconciliationReport::default()
        };

        // Los registros guardan rutas canónicas; se compara con la misma forma
        let directory = match self.storage.resolve_directory(requested).await {
            Ok(dir) => dir,
            Err(MediaStorageError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Media directory does not exist yet");
                return Ok(report);
            },
            Err(e) => return Err(e.into()),
        };
        report.directory = directory.clone();

        let files = match self.storage.list_files(&directory).await {
            Ok(files) => files,
            Err(MediaStorageError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        // Archivos huérfanos: se consulta el almacén por id, no por directorio
        let mut orphaned_files: Vec<(String, PathBuf)> = Vec::new();
        for file in &files {
            if !self.is_media_name(&file.file_name) || !self.is_past_grace(file.modified_at) {
                continue;
            }
            let file_id = self.paths.file_id_from_stored(&file.file_name);
            if self.metadata_repository.find_by_file_id(file_id).await?.is_none() {
                orphaned_files.push((file_id.to_string(), file.path.clone()));
            }
        }

        let existing_names: HashSet<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        let mut orphaned_records: Vec<(String, PathBuf)> = Vec::new();
        for record in self.metadata_repository.find_all().await? {
            let record_path = Path::new(record.file_path());
            let in_directory = record_path
                .parent()
                .map_or(false, |parent| parent == directory.as_path() || parent == requested);
            if !in_directory {
                continue;
            }
            let file_name = record_path.file_name().map(|name| name.to_string_lossy());
            if !file_name.map_or(false, |name| existing_names.contains(name.as_ref())) {
                orphaned_records.push((record.file_id().to_string(), record_path.to_path_buf()));
            }
        }

        report.orphaned_files = orphaned_files.iter().map(|(_, path)| path.clone()).collect();
        report.orphaned_records = orphaned_records.iter().map(|(id, _)| id.clone()).collect();

        if report.is_consistent() {
            debug!("Media directory is consistent ({} files)", files.len());
            return Ok(report);
        }

        warn!("Found {} orphaned files and {} orphaned records",
              report.orphaned_files.len(), report.orphaned_records.len());

        if repair {
            for (file_id, path) in &orphaned_files {
                // Otro proceso pudo guardar el registro después del recorrido
                match self.metadata_repository.find_by_file_id(file_id).await {
                    Ok(None) => {},
                    Ok(Some(_)) => {
                        debug!("Media {} gained a record during reconciliation, keeping it", file_id);
                        continue;
                    },
                    Err(e) => {
                        error!("Could not re-check media record {}: {}", file_id, e);
                        continue;
                    },
                }
                match self.storage.delete_file(path).await {
                    Ok(_) => report.repaired += 1,
                    Err(e) => error!("Could not delete orphaned media {}: {}", path.display(), e),
                }
            }

            for (file_id, path) in &orphaned_records {
                match self.storage.file_exists(path).await {
                    Ok(false) => {},
                    Ok(true) => {
                        debug!("Media file for record {} reappeared, keeping record", file_id);
                        continue;
                    },
                    Err(e) => {
                        error!("Could not re-check media file {}: {}", path.display(), e);
                        continue;
                    },
                }
                match self.metadata_repository.delete_by_file_id(file_id).await {
                    Ok(_) => report.repaired += 1,
                    Err(e) => error!("Could not delete orphaned media record {}: {}", file_id, e),
                }
            }

            info!("Repaired {} media inconsistencies", report.repaired);
        }

        Ok(report)
    }
}

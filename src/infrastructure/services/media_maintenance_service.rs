use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, instrument};

use crate::application::ports::media_ports::MediaReconciliationUseCase;

/// Servicio para la reconciliación periódica de los directorios de medios
/// bajo una raíz común
pub struct MediaMaintenanceService {
    reconciliation: Arc<dyn MediaReconciliationUseCase>,
    media_root: PathBuf,
    interval: Duration,
    repair: bool,
}

impl MediaMaintenanceService {
    pub fn new(
        reconciliation: Arc<dyn MediaReconciliationUseCase>,
        media_root: PathBuf,
        interval: Duration,
        repair: bool,
    ) -> Self {
        Self {
            reconciliation,
            media_root,
            interval: interval.max(Duration::from_secs(1)), // Mínimo 1 segundo
            repair,
        }
    }

    /// Inicia el trabajo de reconciliación periódica
    #[instrument(skip(self))]
    pub fn start_reconcile_job(&self) -> JoinHandle<()> {
        let reconciliation = self.reconciliation.clone();
        let media_root = self.media_root.clone();
        let interval_duration = self.interval;
        let repair = self.repair;

        info!("Starting media reconciliation job every {:?} (repair: {})", interval_duration, repair);

        tokio::spawn(async move {
            let mut interval = time::interval(interval_duration);

            loop {
                // El primer tick es inmediato
                interval.tick().await;
                debug!("Running scheduled media reconciliation");

                let directories = match Self::discover_directories(&media_root).await {
                    Ok(dirs) => dirs,
                    Err(e) => {
                        error!("Error scanning media root {}: {}", media_root.display(), e);
                        continue;
                    }
                };

                Self::reconcile_all(reconciliation.clone(), &directories, repair).await;
            }
        })
    }

    /// Recorre la raíz y devuelve todos los directorios, incluida ella misma
    pub async fn discover_directories(root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_dir() {
                    pending.push(entry.path());
                }
            }
            found.push(dir);
        }

        found.sort();
        Ok(found)
    }

    /// Reconcilia cada directorio; un fallo no detiene los demás
    pub async fn reconcile_all(
        reconciliation: Arc<dyn MediaReconciliationUseCase>,
        directories: &[PathBuf],
        repair: bool,
    ) -> usize {
        let mut inconsistencies = 0;

        for dir in directories {
            match reconciliation.reconcile(dir, repair).await {
                Ok(report) => {
                    inconsistencies += report.orphaned_files.len() + report.orphaned_records.len();
                    if !report.is_consistent() {
                        info!(
                            "Media directory {}: {} orphaned files, {} orphaned records, {} repaired",
                            dir.display(),
                            report.orphaned_files.len(),
                            report.orphaned_records.len(),
                            report.repaired
                        );
                    }
                },
                Err(e) => error!("Error reconciling media directory {}: {}", dir.display(), e),
            }
        }

        inconsistencies
    }
}

//! mediastore - Media upload storage maintenance
//!
//! Runs the reconciliation job over the configured media root: media files
//! without a metadata record and records whose file is gone are reported and,
//! when `MEDIASTORE_RECONCILE_REPAIR=true`, removed.
//!
//! Pass `--once` to run a single reconciliation pass and exit.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediastore::common::config::AppConfig;
use mediastore::common::di::AppServiceFactory;
use mediastore::common::errors::ErrorContext;
use mediastore::infrastructure::services::media_maintenance_service::MediaMaintenanceService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = AppConfig::from_env();

    // Set up media root
    let media_root = config.storage.media_root.clone();
    if !media_root.exists() {
        tokio::fs::create_dir_all(&media_root)
            .await
            .with_context("MediaRoot", || format!("Could not create media root {}", media_root.display()))?;
    }
    tracing::info!("Media root: {}", media_root.display());

    let run_once = std::env::args().any(|arg| arg == "--once");
    let interval = config.maintenance.reconcile_interval();
    let repair = config.maintenance.repair;

    let services = AppServiceFactory::new(config).build_for_maintenance().await?;
    let maintenance = MediaMaintenanceService::new(
        services.reconciliation.clone(),
        media_root.clone(),
        interval,
        repair,
    );

    if run_once {
        let directories = MediaMaintenanceService::discover_directories(&media_root).await?;
        let inconsistencies = MediaMaintenanceService::reconcile_all(
            services.reconciliation.clone(),
            &directories,
            repair,
        ).await;
        tracing::info!("Reconciled {} directories, {} inconsistencies found", directories.len(), inconsistencies);
        return Ok(());
    }

    let job = maintenance.start_reconcile_job();

    tokio::select! {
        result = job => {
            if let Err(e) = result {
                tracing::error!("Media reconciliation job stopped: {}", e);
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping media maintenance");
        },
    }

    Ok(())
}

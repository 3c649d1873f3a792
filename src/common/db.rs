use sqlx::{postgres::PgPoolOptions, PgPool};
use anyhow::Result;
use std::time::Duration;
use crate::common::config::AppConfig;

/// Sentencias de creación del esquema de metadatos (idempotentes)
const MEDIA_SCHEMA: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS media",
    r#"
    CREATE TABLE IF NOT EXISTS media.metadata_records (
        file_id VARCHAR(64) PRIMARY KEY,
        file_path TEXT NOT NULL,
        session_id VARCHAR(255) NOT NULL,
        file_extension VARCHAR(32),
        content_length BIGINT NOT NULL CHECK (content_length >= 0),
        username VARCHAR(255) NOT NULL,
        as_user VARCHAR(255),
        domain VARCHAR(255) NOT NULL,
        app_id VARCHAR(255) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_media_metadata_session_id ON media.metadata_records(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_media_metadata_domain ON media.metadata_records(domain)",
];

pub async fn create_database_pool(config: &AppConfig) -> Result<PgPool> {
    tracing::info!("Initializing PostgreSQL connection with URL: {}",
                  redact_connection_string(&config.database.connection_string));

    let mut attempt = 0;
    const MAX_ATTEMPTS: usize = 3;

    while attempt < MAX_ATTEMPTS {
        attempt += 1;
        tracing::info!("PostgreSQL connection attempt #{}", attempt);

        match PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.database.max_lifetime_secs))
            .connect(&config.database.connection_string)
            .await {
                Ok(pool) => {
                    match ensure_media_schema(&pool).await {
                        Ok(_) => {
                            tracing::info!("PostgreSQL connection established and media schema ready");
                            return Ok(pool);
                        },
                        Err(e) => {
                            tracing::error!("Error creating media schema: {}", e);
                            if attempt >= MAX_ATTEMPTS {
                                return Err(anyhow::anyhow!("Error creating media schema: {}", e));
                            }
                        }
                    }
                },
                Err(e) => {
                    tracing::error!("Error connecting to PostgreSQL: {}", e);
                    if attempt >= MAX_ATTEMPTS {
                        return Err(anyhow::anyhow!("Error connecting to PostgreSQL: {}", e));
                    }
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
    }

    Err(anyhow::anyhow!("Could not connect to PostgreSQL after {} attempts", MAX_ATTEMPTS))
}

/// Crea el esquema y la tabla de metadatos si no existen
pub async fn ensure_media_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in MEDIA_SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Oculta las credenciales de una URL de conexión para los logs
fn redact_connection_string(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}[user]:[pass]{}", &url[..scheme_end + 3], &url[at..])
        },
        _ => url.to_string(),
    }
}

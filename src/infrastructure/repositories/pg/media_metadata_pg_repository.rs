use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::sync::Arc;

use crate::domain::entities::media_metadata::{FormSessionRef, MediaMetadataRecord};
use crate::domain::repositories::media_metadata_repository::{
    MediaMetadataRepository, MediaMetadataRepositoryError, MediaMetadataRepositoryResult,
};

const SELECT_COLUMNS: &str = r#"
    SELECT
        file_id, file_path, session_id, file_extension, content_length,
        username, as_user, domain, app_id, created_at
    FROM media.metadata_records
"#;

pub struct MediaMetadataPgRepository {
    pool: Arc<PgPool>,
}

impl MediaMetadataPgRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    // Método auxiliar para mapear errores SQL a errores del repositorio
    fn map_sqlx_error(err: sqlx::Error) -> MediaMetadataRepositoryError {
        match err {
            sqlx::Error::RowNotFound => {
                MediaMetadataRepositoryError::NotFound("Media metadata record not found".to_string())
            },
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                MediaMetadataRepositoryError::AlreadyExists(db_err.message().to_string())
            },
            _ => MediaMetadataRepositoryError::DatabaseError(
                format!("Database error: {}", err)
            ),
        }
    }

    fn row_to_record(row: &PgRow) -> MediaMetadataRepositoryResult<MediaMetadataRecord> {
        let session_id: String = row.get("session_id");
        let content_length: i64 = row.get("content_length");
        let created_at: DateTime<Utc> = row.get("created_at");

        MediaMetadataRecord::with_timestamp(
            row.get("file_id"),
            row.get("file_path"),
            &FormSessionRef::new(session_id),
            row.get("file_extension"),
            content_length.max(0) as u64,
            row.get("username"),
            row.get("as_user"),
            row.get("domain"),
            row.get("app_id"),
            created_at,
        )
        .map_err(|e| MediaMetadataRepositoryError::Other(e.to_string()))
    }
}

#[async_trait]
impl MediaMetadataRepository for MediaMetadataPgRepository {
    /// Inserta un registro nuevo
    async fn save_media_metadata(&self, record: MediaMetadataRecord) -> MediaMetadataRepositoryResult<MediaMetadataRecord> {
        let content_length = i64::try_from(record.content_length())
            .map_err(|_| MediaMetadataRepositoryError::Other(
                format!("content length out of range: {}", record.content_length())
            ))?;

        sqlx::query(
            r#"
            INSERT INTO media.metadata_records (
                file_id, file_path, session_id, file_extension, content_length,
                username, as_user, domain, app_id, created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            )
            "#
        )
        .bind(record.file_id())
        .bind(record.file_path())
        .bind(record.session_id())
        .bind(record.file_extension())
        .bind(content_length)
        .bind(record.username())
        .bind(record.as_user())
        .bind(record.domain())
        .bind(record.app_id())
        .bind(record.created_at())
        .execute(&*self.pool)
        .await
        .map_err(Self::map_sqlx_error)?;

        Ok(record)
    }

    /// Elimina un registro por id de archivo
    async fn delete_by_file_id(&self, file_id: &str) -> MediaMetadataRepositoryResult<()> {
        let result = sqlx::query("DELETE FROM media.metadata_records WHERE file_id = $1")
            .bind(file_id)
            .execute(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(MediaMetadataRepositoryError::NotFound(file_id.to_string()));
        }

        Ok(())
    }

    /// Obtiene un registro por id de archivo
    async fn find_by_file_id(&self, file_id: &str) -> MediaMetadataRepositoryResult<Option<MediaMetadataRecord>> {
        let row = sqlx::query(&format!("{} WHERE file_id = $1", SELECT_COLUMNS))
            .bind(file_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    /// Obtiene los registros de una sesión
    async fn find_by_session_id(&self, session_id: &str) -> MediaMetadataRepositoryResult<Vec<MediaMetadataRecord>> {
        let rows = sqlx::query(&format!("{} WHERE session_id = $1 ORDER BY created_at", SELECT_COLUMNS))
            .bind(session_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn find_all(&self) -> MediaMetadataRepositoryResult<Vec<MediaMetadataRecord>> {
        let rows = sqlx::query(SELECT_COLUMNS)
            .fetch_all(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        rows.iter().map(Self::row_to_record).collect()
    }
}

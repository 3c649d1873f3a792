use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;
use tokio::io::AsyncRead;

use crate::application::dtos::media_dto::{MetadataCleanup, UploadContext, UploadedFile};
use crate::application::ports::media_ports::{MediaCleanupUseCase, MediaReconciliationUseCase, MediaUploadUseCase};
use crate::application::ports::storage_ports::{MediaFileStoragePort, MediaStorageError, StoredMediaFile};
use crate::application::services::media_cleanup_service::MediaCleanupService;
use crate::application::services::media_reconciliation_service::MediaReconciliationService;
use crate::application::services::media_upload_service::MediaUploadService;
use crate::common::errors::MediaError;
use crate::domain::entities::media_metadata::{FormSessionRef, MediaMetadataRecord};
use crate::domain::repositories::media_metadata_repository::{
    MediaMetadataRepository, MediaMetadataRepositoryError, MediaMetadataRepositoryResult,
    MockMediaMetadataRepository,
};
use crate::domain::services::media_validator::{DefaultMediaValidator, MediaValidationError, MediaValidator};
use crate::common::config::TimeoutConfig;
use crate::infrastructure::repositories::media_file_fs_repository::MediaFileFsRepository;
use crate::infrastructure::repositories::media_metadata_fs_repository::MediaMetadataFsRepository;

// Mock repositories for testing
struct MockMetadataRepository {
    records: Mutex<HashMap<String, MediaMetadataRecord>>,
    saved: Mutex<Vec<MediaMetadataRecord>>,
    deleted_ids: Mutex<Vec<String>>,
    fail_saves: bool,
    fail_deletes: bool,
}

impl MockMetadataRepository {
    fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            saved: Mutex::new(Vec::new()),
            deleted_ids: Mutex::new(Vec::new()),
            fail_saves: false,
            fail_deletes: false,
        }
    }

    fn failing_saves() -> Self {
        Self { fail_saves: true, ..Self::new() }
    }

    fn failing_deletes() -> Self {
        Self { fail_deletes: true, ..Self::new() }
    }

    fn saved(&self) -> Vec<MediaMetadataRecord> {
        self.saved.lock().unwrap().clone()
    }

    fn deleted_ids(&self) -> Vec<String> {
        self.deleted_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaMetadataRepository for MockMetadataRepository {
    async fn save_media_metadata(&self, record: MediaMetadataRecord) -> MediaMetadataRepositoryResult<MediaMetadataRecord> {
        if self.fail_saves {
            return Err(MediaMetadataRepositoryError::DatabaseError("connection refused".to_string()));
        }
        self.saved.lock().unwrap().push(record.clone());
        self.records.lock().unwrap().insert(record.file_id().to_string(), record.clone());
        Ok(record)
    }

    async fn delete_by_file_id(&self, file_id: &str) -> MediaMetadataRepositoryResult<()> {
        self.deleted_ids.lock().unwrap().push(file_id.to_string());
        if self.fail_deletes {
            return Err(MediaMetadataRepositoryError::DatabaseError("connection refused".to_string()));
        }
        match self.records.lock().unwrap().remove(file_id) {
            Some(_) => Ok(()),
            None => Err(MediaMetadataRepositoryError::NotFound(file_id.to_string())),
        }
    }

    async fn find_by_file_id(&self, file_id: &str) -> MediaMetadataRepositoryResult<Option<MediaMetadataRecord>> {
        Ok(self.records.lock().unwrap().get(file_id).cloned())
    }

    async fn find_by_session_id(&self, session_id: &str) -> MediaMetadataRepositoryResult<Vec<MediaMetadataRecord>> {
        Ok(self.records.lock().unwrap().values()
            .filter(|r| r.session_id() == session_id)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> MediaMetadataRepositoryResult<Vec<MediaMetadataRecord>> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }
}

/// Validador permisivo: la validación real es de un colaborador externo
struct AcceptAllValidator;

impl MediaValidator for AcceptAllValidator {
    fn validate(&self, _head: &[u8], _name: Option<&str>, _size: u64) -> Result<(), MediaValidationError> {
        Ok(())
    }
}

struct RejectAllValidator;

impl MediaValidator for RejectAllValidator {
    fn validate(&self, _head: &[u8], _name: Option<&str>, _size: u64) -> Result<(), MediaValidationError> {
        Err(MediaValidationError::MissingFilename)
    }
}

/// Almacenamiento cuya escritura falla siempre a mitad de copia
struct FailingWriteStorage {
    inner: MediaFileFsRepository,
}

#[async_trait]
impl MediaFileStoragePort for FailingWriteStorage {
    async fn ensure_directory(&self, dir: &Path) -> Result<PathBuf, MediaStorageError> {
        self.inner.ensure_directory(dir).await
    }

    async fn resolve_directory(&self, dir: &Path) -> Result<PathBuf, MediaStorageError> {
        self.inner.resolve_directory(dir).await
    }

    async fn file_exists(&self, path: &Path) -> Result<bool, MediaStorageError> {
        self.inner.file_exists(path).await
    }

    async fn write_stream(&self, path: &Path, _reader: &mut (dyn AsyncRead + Send + Unpin)) -> Result<u64, MediaStorageError> {
        tokio::fs::write(path, b"partial").await?;
        Err(MediaStorageError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "No space left on device")))
    }

    async fn delete_file(&self, path: &Path) -> Result<(), MediaStorageError> {
        self.inner.delete_file(path).await
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<StoredMediaFile>, MediaStorageError> {
        self.inner.list_files(dir).await
    }
}

fn context() -> UploadContext {
    UploadContext::new(
        FormSessionRef::new("session-1"),
        "alice",
        Some("bob".to_string()),
        "demo-domain",
        "app-123",
    )
}

fn upload_service(repo: Arc<dyn MediaMetadataRepository>, validator: Arc<dyn MediaValidator>) -> MediaUploadService {
    MediaUploadService::new(Arc::new(MediaFileFsRepository::default()), repo, validator)
}

fn cleanup_service(repo: Arc<dyn MediaMetadataRepository>) -> MediaCleanupService {
    MediaCleanupService::new(Arc::new(MediaFileFsRepository::default()), repo)
}

async fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_photo_scenario() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path().join("x");
        let repo = Arc::new(MockMetadataRepository::new());
        let service = upload_service(repo.clone(), Arc::new(AcceptAllValidator));

        let stored = service
            .store(UploadedFile::from_bytes("abc", "photo.jpg"), &dir, context())
            .await
            .unwrap();

        let saved = repo.saved();
        assert_eq!(saved.len(), 1);
        let record = &saved[0];

        assert_eq!(stored, format!("{}.jpg", record.file_id()));
        assert_eq!(record.file_extension(), Some("jpg"));
        assert_eq!(record.content_length(), 3);
        assert_eq!(record.session_id(), "session-1");
        assert_eq!(record.username(), "alice");
        assert_eq!(record.as_user(), Some("bob"));
        assert_eq!(record.domain(), "demo-domain");
        assert_eq!(record.app_id(), "app-123");
        let canonical_dir = tokio::fs::canonicalize(&dir).await.unwrap();
        assert_eq!(record.file_path(), canonical_dir.join(&stored).to_string_lossy());
        assert!(Path::new(record.file_path()).is_absolute());

        let on_disk = tokio::fs::read(dir.join(&stored)).await.unwrap();
        assert_eq!(on_disk, b"abc");
    }

    #[tokio::test]
    async fn test_stored_name_prefix_is_record_id() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let service = upload_service(repo.clone(), Arc::new(AcceptAllValidator));

        for name in ["a.png", "archive.tar.gz", "clip.MP4"] {
            let stored = service
                .store(UploadedFile::from_bytes("data", name), temp_dir.path(), context())
                .await
                .unwrap();
            let id = stored.split('.').next().unwrap();
            assert!(repo.saved().iter().any(|r| r.file_id() == id), "no record for {}", stored);
        }
    }

    #[tokio::test]
    async fn test_store_without_extension_uses_bare_id() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let service = upload_service(repo.clone(), Arc::new(AcceptAllValidator));

        let stored = service
            .store(UploadedFile::from_bytes("abc", "README"), temp_dir.path(), context())
            .await
            .unwrap();

        let record = &repo.saved()[0];
        assert_eq!(stored, record.file_id());
        assert!(!stored.contains('.'));
        assert_eq!(record.file_extension(), None);
    }

    #[tokio::test]
    async fn test_store_records_actual_size_not_declared() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let service = upload_service(repo.clone(), Arc::new(AcceptAllValidator));

        let chunks = vec![Ok(bytes::Bytes::from_static(b"hello ")), Ok(bytes::Bytes::from_static(b"world"))];
        let file = UploadedFile::from_stream(futures::stream::iter(chunks), Some("note.txt".to_string()), 999);

        service.store(file, temp_dir.path(), context()).await.unwrap();
        assert_eq!(repo.saved()[0].content_length(), 11);
    }

    #[tokio::test]
    async fn test_store_spans_sniff_window() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let service = upload_service(repo.clone(), Arc::new(AcceptAllValidator)).with_sniff_window(4);

        let stored = service
            .store(UploadedFile::from_bytes("0123456789", "digits.txt"), temp_dir.path(), context())
            .await
            .unwrap();

        let on_disk = tokio::fs::read(temp_dir.path().join(stored)).await.unwrap();
        assert_eq!(on_disk, b"0123456789");
    }

    #[tokio::test]
    async fn test_validation_failure_has_no_side_effects() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path().join("never-created");

        let mut repo = MockMediaMetadataRepository::new();
        repo.expect_save_media_metadata().never();
        let service = upload_service(Arc::new(repo), Arc::new(RejectAllValidator));

        let result = service
            .store(UploadedFile::from_bytes("abc", "photo.jpg"), &dir, context())
            .await;

        assert!(matches!(result, Err(MediaError::Validation(_))));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_blank_context_is_rejected_before_copy() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path().join("never-created");

        let mut repo = MockMediaMetadataRepository::new();
        repo.expect_save_media_metadata().never();
        let service = upload_service(Arc::new(repo), Arc::new(AcceptAllValidator))
            .with_rollback_on_metadata_failure(false);

        let context = UploadContext::new(FormSessionRef::new("session-1"), "", None, "demo-domain", "app-123");
        let result = service
            .store(UploadedFile::from_bytes("abc", "photo.jpg"), &dir, context)
            .await;

        assert!(matches!(
            result,
            Err(MediaError::Validation(MediaValidationError::MissingContext("username")))
        ));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_default_validator_rejects_disguised_upload() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let service = upload_service(repo.clone(), Arc::new(DefaultMediaValidator::default()));

        let result = service
            .store(UploadedFile::from_bytes("abc", "photo.jpg"), temp_dir.path(), context())
            .await;

        assert!(matches!(result, Err(MediaError::Validation(MediaValidationError::ContentMismatch { .. }))));
        assert!(repo.saved().is_empty());
        assert!(dir_entries(temp_dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_default_validator_accepts_real_jpeg() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let service = upload_service(repo.clone(), Arc::new(DefaultMediaValidator::default()));

        let jpeg: Vec<u8> = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9];
        let stored = service
            .store(UploadedFile::from_bytes(jpeg, "camera.jpeg"), temp_dir.path(), context())
            .await
            .unwrap();

        assert!(stored.ends_with(".jpeg"));
        assert_eq!(repo.saved()[0].content_length(), 13);
    }

    #[tokio::test]
    async fn test_oversized_stream_is_discarded() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let service = upload_service(repo.clone(), Arc::new(DefaultMediaValidator::default()));

        // Declara 10 bytes pero envía más del límite
        let content = vec![b'a'; 3 * 1024 * 1024 + 10];
        let file = UploadedFile::new(Box::new(std::io::Cursor::new(content)), Some("big.txt".to_string()), 10);

        let result = service.store(file, temp_dir.path(), context()).await;

        assert!(matches!(result, Err(MediaError::Validation(MediaValidationError::TooLarge { .. }))));
        assert!(repo.saved().is_empty());
        assert!(dir_entries(temp_dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_copy_failure_wraps_io_error() {
        let temp_dir = tempdir().unwrap();

        let mut repo = MockMediaMetadataRepository::new();
        repo.expect_save_media_metadata().never();

        let storage = Arc::new(FailingWriteStorage { inner: MediaFileFsRepository::default() });
        let service = MediaUploadService::new(storage, Arc::new(repo), Arc::new(AcceptAllValidator));

        let result = service
            .store(UploadedFile::from_bytes("abc", "photo.jpg"), temp_dir.path(), context())
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, MediaError::Copy { .. }));
        assert!(err.to_string().contains("No space left on device"));
        // El archivo parcial se elimina
        assert!(dir_entries(temp_dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_metadata_failure_rolls_back_file() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::failing_saves());
        let service = upload_service(repo, Arc::new(AcceptAllValidator));

        let result = service
            .store(UploadedFile::from_bytes("abc", "photo.jpg"), temp_dir.path(), context())
            .await;

        assert!(matches!(result, Err(MediaError::Metadata { .. })));
        assert!(dir_entries(temp_dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_metadata_failure_without_rollback_leaves_file() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::failing_saves());
        let service = upload_service(repo, Arc::new(AcceptAllValidator))
            .with_rollback_on_metadata_failure(false);

        let result = service
            .store(UploadedFile::from_bytes("abc", "photo.jpg"), temp_dir.path(), context())
            .await;

        assert!(matches!(result, Err(MediaError::Metadata { .. })));
        assert_eq!(dir_entries(temp_dir.path()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_clean_existing_file_deletes_metadata_by_id() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let uploader = upload_service(repo.clone(), Arc::new(AcceptAllValidator));
        let cleaner = cleanup_service(repo.clone());

        let stored = uploader
            .store(UploadedFile::from_bytes("abc", "photo.jpg"), temp_dir.path(), context())
            .await
            .unwrap();
        let id = stored.trim_end_matches(".jpg").to_string();

        let outcome = cleaner.clean(temp_dir.path(), &stored).await;

        assert!(outcome.deleted());
        assert!(outcome.fully_cleaned());
        assert!(!temp_dir.path().join(&stored).exists());
        assert_eq!(repo.deleted_ids(), vec![id]);
    }

    #[tokio::test]
    async fn test_clean_calls_store_with_stripped_id() {
        let temp_dir = tempdir().unwrap();
        let id = "3f1e1d8a-2c43-4f7e-9a55-2f1b0d6c9e10";
        tokio::fs::write(temp_dir.path().join(format!("{}.jpg", id)), b"abc").await.unwrap();

        let mut repo = MockMediaMetadataRepository::new();
        repo.expect_delete_by_file_id()
            .withf(move |file_id| file_id.to_string() == id)
            .times(1)
            .returning(|_| Ok(()));
        let cleaner = cleanup_service(Arc::new(repo));

        let outcome = cleaner.clean(temp_dir.path(), &format!("{}.jpg", id)).await;
        assert!(outcome.deleted());
        assert_eq!(outcome.metadata, MetadataCleanup::Deleted);
    }

    #[tokio::test]
    async fn test_clean_missing_file_never_touches_store() {
        let temp_dir = tempdir().unwrap();

        let mut repo = MockMediaMetadataRepository::new();
        repo.expect_delete_by_file_id().never();
        let cleaner = cleanup_service(Arc::new(repo));

        let outcome = cleaner.clean(temp_dir.path(), "missing.jpg").await;

        assert!(!outcome.deleted());
        assert_eq!(outcome.metadata, MetadataCleanup::NotAttempted);
    }

    #[tokio::test]
    async fn test_clean_twice_is_true_then_false() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let uploader = upload_service(repo.clone(), Arc::new(AcceptAllValidator));
        let cleaner = cleanup_service(repo.clone());

        let stored = uploader
            .store(UploadedFile::from_bytes("abc", "photo.jpg"), temp_dir.path(), context())
            .await
            .unwrap();

        assert!(cleaner.clean(temp_dir.path(), &stored).await.deleted());
        assert!(!cleaner.clean(temp_dir.path(), &stored).await.deleted());
        assert_eq!(repo.deleted_ids().len(), 1);
    }

    #[tokio::test]
    async fn test_clean_reports_metadata_failure_without_propagating() {
        let temp_dir = tempdir().unwrap();
        let stored = "0d4f7a4e-5b0e-4d1c-8f8e-6a3c2b1a0f99.png";
        tokio::fs::write(temp_dir.path().join(stored), b"png").await.unwrap();

        let repo = Arc::new(MockMetadataRepository::failing_deletes());
        let cleaner = cleanup_service(repo.clone());

        let outcome = cleaner.clean(temp_dir.path(), stored).await;

        assert!(outcome.deleted());
        assert!(outcome.left_orphaned_metadata());
        assert_eq!(repo.deleted_ids(), vec!["0d4f7a4e-5b0e-4d1c-8f8e-6a3c2b1a0f99".to_string()]);
    }

    #[tokio::test]
    async fn test_clean_missing_record_is_soft_failure() {
        let temp_dir = tempdir().unwrap();
        tokio::fs::write(temp_dir.path().join("orphan.txt"), b"x").await.unwrap();

        let cleaner = cleanup_service(Arc::new(MockMetadataRepository::new()));
        let outcome = cleaner.clean(temp_dir.path(), "orphan.txt").await;

        assert!(outcome.deleted());
        assert!(matches!(outcome.metadata, MetadataCleanup::Failed(_)));
    }

    #[tokio::test]
    async fn test_clean_rejects_path_traversal() {
        let temp_dir = tempdir().unwrap();
        let inner = temp_dir.path().join("inner");
        tokio::fs::create_dir(&inner).await.unwrap();
        tokio::fs::write(temp_dir.path().join("secret.txt"), b"x").await.unwrap();

        let mut repo = MockMediaMetadataRepository::new();
        repo.expect_delete_by_file_id().never();
        let cleaner = cleanup_service(Arc::new(repo));

        let outcome = cleaner.clean(&inner, "../secret.txt").await;

        assert!(!outcome.deleted());
        assert!(temp_dir.path().join("secret.txt").exists());
    }

    #[tokio::test]
    async fn test_clean_session_removes_all_session_media() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let uploader = upload_service(repo.clone(), Arc::new(AcceptAllValidator));
        let cleaner = cleanup_service(repo.clone());

        uploader.store(UploadedFile::from_bytes("a", "a.txt"), temp_dir.path(), context()).await.unwrap();
        uploader.store(UploadedFile::from_bytes("b", "b.png"), temp_dir.path(), context()).await.unwrap();
        let other = UploadContext::new(FormSessionRef::new("session-2"), "carol", None, "demo-domain", "app-123");
        let kept = uploader.store(UploadedFile::from_bytes("c", "c.txt"), temp_dir.path(), other).await.unwrap();

        let outcomes = cleaner.clean_session(temp_dir.path(), "session-1").await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.fully_cleaned()));
        assert_eq!(dir_entries(temp_dir.path()).await, vec![kept]);
    }

    #[tokio::test]
    async fn test_reconcile_finds_and_repairs_orphans() {
        let temp_dir = tempdir().unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let uploader = upload_service(repo.clone(), Arc::new(AcceptAllValidator));

        let healthy = uploader.store(UploadedFile::from_bytes("ok", "ok.txt"), temp_dir.path(), context()).await.unwrap();
        let lost = uploader.store(UploadedFile::from_bytes("gone", "gone.txt"), temp_dir.path(), context()).await.unwrap();
        tokio::fs::remove_file(temp_dir.path().join(&lost)).await.unwrap();

        // Archivo copiado cuyo registro nunca se guardó
        let orphan_name = "6b2f8a50-1f0e-4a8e-b7a4-5d1e3c9f2a77.jpg";
        tokio::fs::write(temp_dir.path().join(orphan_name), b"jpg").await.unwrap();
        // Archivos ajenos no se tocan
        tokio::fs::write(temp_dir.path().join("media_metadata.json"), b"{}").await.unwrap();

        let reconciler = MediaReconciliationService::new(
            Arc::new(MediaFileFsRepository::default()),
            repo.clone(),
            Duration::ZERO,
        );

        let root = tokio::fs::canonicalize(temp_dir.path()).await.unwrap();
        let report = reconciler.reconcile(temp_dir.path(), false).await.unwrap();
        assert_eq!(report.directory, root);
        assert_eq!(report.orphaned_files, vec![root.join(orphan_name)]);
        assert_eq!(report.orphaned_records, vec![lost.trim_end_matches(".txt").to_string()]);
        assert_eq!(report.repaired, 0);

        let report = reconciler.reconcile(temp_dir.path(), true).await.unwrap();
        assert_eq!(report.repaired, 2);
        assert!(!temp_dir.path().join(orphan_name).exists());
        assert!(temp_dir.path().join(&healthy).exists());

        let report = reconciler.reconcile(temp_dir.path(), false).await.unwrap();
        assert!(report.is_consistent());
    }

    #[tokio::test]
    async fn test_reconcile_matches_records_across_path_spellings() {
        let temp_dir = tempdir().unwrap();
        tokio::fs::create_dir(temp_dir.path().join("other")).await.unwrap();
        let repo = Arc::new(MockMetadataRepository::new());
        let uploader = upload_service(repo.clone(), Arc::new(AcceptAllValidator));

        let stored = uploader
            .store(UploadedFile::from_bytes("abc", "a.txt"), &temp_dir.path().join("d"), context())
            .await
            .unwrap();

        let reconciler = MediaReconciliationService::new(
            Arc::new(MediaFileFsRepository::default()),
            repo.clone(),
            Duration::ZERO,
        );

        let report = reconciler.reconcile(&temp_dir.path().join("other/../d"), true).await.unwrap();

        assert!(report.is_consistent(), "unexpected report: {:?}", report);
        assert_eq!(report.repaired, 0);
        assert!(temp_dir.path().join("d").join(&stored).exists());
    }

    #[tokio::test]
    async fn test_reconcile_in_separate_process_keeps_fresh_uploads() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path().join("d");

        // Aplicación y mantenimiento abren cada uno su propio índice JSON
        let app_repo = Arc::new(MediaMetadataFsRepository::new(temp_dir.path(), TimeoutConfig::default()).await.unwrap());
        let maintenance_repo = Arc::new(MediaMetadataFsRepository::new(temp_dir.path(), TimeoutConfig::default()).await.unwrap());

        let reconciler = MediaReconciliationService::new(
            Arc::new(MediaFileFsRepository::default()),
            maintenance_repo.clone(),
            Duration::ZERO,
        );
        reconciler.reconcile(temp_dir.path(), true).await.unwrap();

        let uploader = upload_service(app_repo.clone(), Arc::new(AcceptAllValidator));
        let stored = uploader
            .store(UploadedFile::from_bytes("abc", "a.txt"), &dir, context())
            .await
            .unwrap();

        let report = reconciler.reconcile(&dir, true).await.unwrap();

        assert!(report.is_consistent(), "unexpected report: {:?}", report);
        assert!(dir.join(&stored).exists());
        let id = stored.trim_end_matches(".txt");
        assert!(app_repo.find_by_file_id(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reconcile_respects_grace_period() {
        let temp_dir = tempdir().unwrap();
        tokio::fs::write(temp_dir.path().join("6b2f8a50-1f0e-4a8e-b7a4-5d1e3c9f2a77.jpg"), b"jpg").await.unwrap();

        let reconciler = MediaReconciliationService::new(
            Arc::new(MediaFileFsRepository::default()),
            Arc::new(MockMetadataRepository::new()),
            Duration::from_secs(3600),
        );

        let report = reconciler.reconcile(temp_dir.path(), true).await.unwrap();
        assert!(report.is_consistent());
    }

    #[tokio::test]
    async fn test_reconcile_missing_directory_is_empty() {
        let temp_dir = tempdir().unwrap();
        let reconciler = MediaReconciliationService::new(
            Arc::new(MediaFileFsRepository::default()),
            Arc::new(MockMetadataRepository::new()),
            Duration::ZERO,
        );

        let report = reconciler.reconcile(&temp_dir.path().join("nope"), false).await.unwrap();
        assert!(report.is_consistent());
    }
}

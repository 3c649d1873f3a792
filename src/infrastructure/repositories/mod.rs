pub mod media_file_fs_repository;
pub mod media_metadata_fs_repository;
pub mod media_metadata_memory_repository;

// Repositorios PostgreSQL
pub mod pg;

// Re-exportar para facilitar acceso
pub use media_file_fs_repository::MediaFileFsRepository;
pub use media_metadata_fs_repository::MediaMetadataFsRepository;
pub use media_metadata_memory_repository::InMemoryMediaMetadataRepository;
pub use pg::MediaMetadataPgRepository;

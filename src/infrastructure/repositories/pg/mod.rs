pub mod media_metadata_pg_repository;

pub use media_metadata_pg_repository::MediaMetadataPgRepository;

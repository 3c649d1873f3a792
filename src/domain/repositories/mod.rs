pub mod media_metadata_repository;

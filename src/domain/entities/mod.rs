pub mod media_metadata;

pub mod media_path_service;
pub mod media_validator;

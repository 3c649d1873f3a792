pub mod media_maintenance_service;

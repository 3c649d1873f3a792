pub mod media_ports;
pub mod storage_ports;

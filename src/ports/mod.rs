//! Port traits the domain depends on; adapters provide the implementations.

pub mod config_port;
pub mod data_port;
pub mod report_port;

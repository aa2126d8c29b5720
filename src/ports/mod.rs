//! Port traits separating the pipeline from files and config formats.

pub mod config_port;
pub mod data_port;
pub mod report_port;

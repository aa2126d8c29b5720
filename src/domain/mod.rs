//! Core pipeline stages and their data types.

pub mod daily;
pub mod rolling;
pub mod features;
pub mod params;
pub mod signal;
pub mod path;
pub mod metrics;
pub mod flow_factor;
pub mod analysis;
pub mod pipeline;
pub mod config_validation;
pub mod error;

//! gaptrader: overnight gap strategy backtester.
//!
//! Hexagonal architecture: pure pipeline stages in [`domain`], port traits in
//! [`ports`], file-backed implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;

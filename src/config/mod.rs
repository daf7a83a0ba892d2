//! # Configuration Module
//!
//! Configuration structures and validation for scan sessions.

pub mod config;

pub use config::ScanConfig;

//! Shared utilities for the finance assistant
//!
//! Logging setup and application-level configuration shared by the
//! library crates and the CLI.

pub mod config;
pub mod logging;

pub use config::{AppConfig, ConfigError};
pub use logging::{LogFormat, init_tracing, init_tracing_with};

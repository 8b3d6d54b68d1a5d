//! Configuration management for the adaptive admission control service.
//!
//! This module handles loading and managing application configuration
//! from environment variables and configuration files.

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use std::env;

use crate::models::Config;

/// Load configuration from an optional config file and the environment
pub fn load_config() -> Result<Config, ConfigError> {
    let config_file = env::var("CONFIG_FILE").unwrap_or_else(|_| "config/default.toml".to_string());

    let config = ConfigBuilder::builder()
        .add_source(File::with_name(&config_file).required(false))
        .add_source(Environment::default().separator("__"))
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("store.backend", "redis")?
        .set_default("store.url", "redis://127.0.0.1:6379")?
        .set_default("store.pool_size", 10)?
        .set_default("admission.default_limit", 100)?
        .set_default("admission.window_seconds", 60)?
        .set_default("admission.ban_duration_seconds", 300)?
        .set_default("admission.min_limit", 10)?
        .set_default("admission.max_limit", 200)?
        .set_default("admission.fail_open", true)?
        .set_default("detection.detectors", 0)?
        .set_default("detection.window_ms", 60_000)?
        .set_default("detection.ban_threshold", 1.8)?
        .set_default("detection.decrease_threshold", 1.0)?
        .set_default("detection.sample_queue_depth", 1024)?
        .set_default("detection.verdict_queue_depth", 256)?
        .build()?;

    config.try_deserialize()
}

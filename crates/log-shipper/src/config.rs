// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use crate::batcher::Budgets;
use crate::constants;
use crate::error::ConfigError;
use crate::sink::http::HttpSinkConfig;

/// Shipper configuration, read from `SHIPPER_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipperConfig {
    /// Shell command of the workload
    pub command: String,
    /// Base URL of the log sink. Without one, batches go to stdout.
    pub endpoint: Option<String>,
    pub log_group: String,
    pub log_stream: String,
    pub api_key: Option<String>,
    pub max_batch_count: usize,
    pub max_batch_bytes: usize,
    pub flush_interval: Duration,
    /// Per-worker bound on shutdown
    pub join_timeout: Duration,
    pub request_timeout: Duration,
    pub use_compression: bool,
    pub compression_level: i32,
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            endpoint: None,
            log_group: constants::DEFAULT_LOG_GROUP.to_string(),
            log_stream: constants::DEFAULT_LOG_STREAM.to_string(),
            api_key: None,
            max_batch_count: constants::MAX_BATCH_COUNT,
            max_batch_bytes: constants::MAX_BATCH_BYTES,
            flush_interval: constants::FLUSH_INTERVAL,
            join_timeout: constants::JOIN_TIMEOUT,
            request_timeout: constants::REQUEST_TIMEOUT,
            use_compression: true,
            compression_level: constants::DEFAULT_COMPRESSION_LEVEL,
            https_proxy: None,
            log_level: "info".to_string(),
        }
    }
}

impl ShipperConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());

        let command = non_empty("SHIPPER_COMMAND").ok_or(ConfigError::Missing("SHIPPER_COMMAND"))?;
        let max_batch_count =
            parse_or("SHIPPER_MAX_BATCH_COUNT", &lookup, defaults.max_batch_count)?;
        let max_batch_bytes =
            parse_or("SHIPPER_MAX_BATCH_BYTES", &lookup, defaults.max_batch_bytes)?;
        let flush_interval = parse_or(
            "SHIPPER_FLUSH_INTERVAL_SECS",
            &lookup,
            defaults.flush_interval.as_secs(),
        )
        .map(Duration::from_secs)?;
        let join_timeout = parse_or(
            "SHIPPER_JOIN_TIMEOUT_SECS",
            &lookup,
            defaults.join_timeout.as_secs(),
        )
        .map(Duration::from_secs)?;
        let request_timeout = parse_or(
            "SHIPPER_REQUEST_TIMEOUT_SECS",
            &lookup,
            defaults.request_timeout.as_secs(),
        )
        .map(Duration::from_secs)?;
        let use_compression = lookup("SHIPPER_USE_COMPRESSION")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.use_compression);
        let compression_level = parse_or(
            "SHIPPER_COMPRESSION_LEVEL",
            &lookup,
            defaults.compression_level,
        )?;
        let https_proxy = non_empty("SHIPPER_PROXY_HTTPS").or_else(|| non_empty("HTTPS_PROXY"));
        let log_level = lookup("SHIPPER_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            command,
            endpoint: non_empty("SHIPPER_ENDPOINT"),
            log_group: non_empty("SHIPPER_LOG_GROUP").unwrap_or(defaults.log_group),
            log_stream: non_empty("SHIPPER_LOG_STREAM").unwrap_or(defaults.log_stream),
            api_key: non_empty("SHIPPER_API_KEY"),
            max_batch_count,
            max_batch_bytes,
            flush_interval,
            join_timeout,
            request_timeout,
            use_compression,
            compression_level,
            https_proxy,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::Missing("SHIPPER_COMMAND"));
        }

        Budgets::new(
            self.max_batch_count,
            self.max_batch_bytes,
            self.flush_interval,
        )?;

        if self.join_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "SHIPPER_JOIN_TIMEOUT_SECS",
                reason: "must be greater than 0".to_string(),
            });
        }

        if let Some(endpoint) = &self.endpoint {
            reqwest::Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
                name: "SHIPPER_ENDPOINT",
                reason: e.to_string(),
            })?;
        }

        if self.log_group.trim().is_empty() || self.log_stream.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "log group and log stream cannot be empty".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                name: "SHIPPER_LOG_LEVEL",
                reason: format!(
                    "'{}' is not one of: trace, debug, info, warn, error",
                    self.log_level
                ),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn budgets(&self) -> Budgets {
        Budgets {
            max_batch_count: self.max_batch_count,
            max_batch_bytes: self.max_batch_bytes,
            flush_interval: self.flush_interval,
        }
    }

    /// Sink settings, if an endpoint is configured.
    #[must_use]
    pub fn http_sink(&self) -> Option<HttpSinkConfig> {
        self.endpoint.as_ref().map(|endpoint| HttpSinkConfig {
            endpoint: endpoint.clone(),
            log_group: self.log_group.clone(),
            log_stream: self.log_stream.clone(),
            api_key: self.api_key.clone(),
            timeout: self.request_timeout,
            https_proxy: self.https_proxy.clone(),
            use_compression: self.use_compression,
            compression_level: self.compression_level,
        })
    }
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue {
                name: key,
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}

// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors returned by a sink while provisioning or submitting.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Invalid sink endpoint: {0}")]
    Endpoint(String),

    #[error("Invalid header value for {0}")]
    Header(&'static str),

    #[error("Failed to prepare payload: {0}")]
    Payload(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Sink responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal errors that stop the shipper before or while starting the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ShipperError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to provision log destination: {0}")]
    Provisioning(#[source] SinkError),

    #[error("Failed to build sink: {0}")]
    Sink(#[source] SinkError),

    #[error("Failed to start workload: {0}")]
    Workload(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ConfigError::InvalidValue {
            name: "SHIPPER_MAX_BATCH_COUNT",
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid value for SHIPPER_MAX_BATCH_COUNT: must be at least 1"
        );

        let error = SinkError::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: "slow down".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Sink responded with 429 Too Many Requests: slow down"
        );
    }

    #[test]
    fn test_provisioning_error_keeps_source() {
        let error = ShipperError::Provisioning(SinkError::Endpoint("nope".to_string()));
        let source = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Invalid sink endpoint: nope"));
    }
}

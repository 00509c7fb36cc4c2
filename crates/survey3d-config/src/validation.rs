// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Ensures configuration values are consistent, within valid ranges, and don't
//! conflict with each other.

use crate::{ConfigError, ConfigResult, Survey3dConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    EndpointConflict { endpoint: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::EndpointConflict { endpoint } => {
                write!(
                    f,
                    "bus.subscribe_endpoint and bus.publish_endpoint both use {}",
                    endpoint
                )
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &Survey3dConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

/// Collect all validation errors without short-circuiting
pub fn collect_errors(config: &Survey3dConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    if config.gateway.port == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "gateway.port".to_string(),
            reason: "port 0 is not a fixed port".to_string(),
        });
    }
    if config.gateway.participant_path == config.gateway.experimenter_path {
        errors.push(ConfigValidationError::InvalidValue {
            field: "gateway.experimenter_path".to_string(),
            reason: "must differ from gateway.participant_path".to_string(),
        });
    }
    if config.storage.participant_config_file.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "storage.participant_config_file".to_string(),
        });
    }

    validate_bus(config, &mut errors);

    errors
}

fn validate_bus(config: &Survey3dConfig, errors: &mut Vec<ConfigValidationError>) {
    let bus = &config.bus;
    if !bus.enabled {
        return;
    }

    if bus.subscribe_endpoint.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "bus.subscribe_endpoint".to_string(),
        });
    }
    if bus.publish_endpoint.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "bus.publish_endpoint".to_string(),
        });
    }
    if !bus.subscribe_endpoint.is_empty() && bus.subscribe_endpoint == bus.publish_endpoint {
        errors.push(ConfigValidationError::EndpointConflict {
            endpoint: bus.subscribe_endpoint.clone(),
        });
    }
    if bus.poll_timeout_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "bus.poll_timeout_ms".to_string(),
            reason: "must be greater than 0 so receives stay bounded".to_string(),
        });
    }
    if bus.reconnect_delay_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "bus.reconnect_delay_ms".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    if bus.outbound_queue_capacity == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "bus.outbound_queue_capacity".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    if bus.liveness_timeout_ms != 0 {
        let floor = bus.heartbeat_interval_ms.max(bus.poll_timeout_ms);
        if bus.liveness_timeout_ms <= floor {
            errors.push(ConfigValidationError::InvalidValue {
                field: "bus.liveness_timeout_ms".to_string(),
                reason: format!(
                    "must exceed the heartbeat interval and poll timeout ({} ms)",
                    floor
                ),
            });
        }
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `survey3d_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Survey3dConfig {
    pub gateway: GatewayConfig,
    pub storage: StorageConfig,
    pub bus: BusConfig,
    pub logging: LoggingConfig,
}

/// WebSocket session gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Request path served as the participant channel
    pub participant_path: String,
    /// Request path served as the experimenter channel
    pub experimenter_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            participant_path: "/participant-ws".to_string(),
            experimenter_path: "/experimenter-ws".to_string(),
        }
    }
}

impl GatewayConfig {
    /// `host:port` string suitable for binding a listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Survey persistence and participant configuration locations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the participant configuration document
    pub config_dir: PathBuf,
    /// File name of the participant configuration document inside `config_dir`
    pub participant_config_file: String,
    /// Directory completed surveys are written to
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("./config"),
            participant_config_file: "participant_config.json".to_string(),
            data_dir: PathBuf::from("../data"),
        }
    }
}

impl StorageConfig {
    pub fn participant_config_path(&self) -> PathBuf {
        self.config_dir.join(&self.participant_config_file)
    }
}

/// Lab message bus connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BusConfig {
    /// Run the bus bridge at all
    pub enabled: bool,
    /// Endpoint the bridge subscribes to (bus -> bridge)
    pub subscribe_endpoint: String,
    /// Endpoint the bridge publishes to (bridge -> bus)
    pub publish_endpoint: String,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay_ms: u64,
    /// Upper bound on any single blocking receive
    pub poll_timeout_ms: u64,
    /// Heartbeat cadence while connected (0 = disabled)
    pub heartbeat_interval_ms: u64,
    /// Silence on the bus after which a connection counts as lost (0 = disabled)
    pub liveness_timeout_ms: u64,
    /// Submissions waiting for a connected bridge
    pub outbound_queue_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            subscribe_endpoint: "tcp://127.0.0.1:7111".to_string(),
            publish_endpoint: "tcp://127.0.0.1:7112".to_string(),
            reconnect_delay_ms: 5000,
            poll_timeout_ms: 100,
            heartbeat_interval_ms: 1000,
            liveness_timeout_ms: 5000,
            outbound_queue_capacity: 16,
        }
    }
}

impl BusConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        if self.heartbeat_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.heartbeat_interval_ms))
        }
    }

    pub fn liveness_timeout(&self) -> Option<Duration> {
        if self.liveness_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.liveness_timeout_ms))
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for every crate not switched to debug
    pub level: String,
    /// Base directory for run log folders (file logging only)
    pub log_dir: PathBuf,
    /// Write JSON log files in addition to console output
    pub file_logging: bool,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("./logs"),
            file_logging: false,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common configuration types for transports

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{TransportError, TransportResult};

/// Client socket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Endpoint to connect to
    pub address: String,

    /// Send timeout (None = blocking)
    pub send_timeout: Option<Duration>,

    /// High water mark for send buffer (0 = unlimited)
    pub send_hwm: usize,

    /// High water mark for receive buffer (0 = unlimited)
    pub recv_hwm: usize,

    /// Maximum message size (None = unlimited)
    pub max_message_size: Option<usize>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: "tcp://127.0.0.1:7111".to_string(),
            send_timeout: Some(Duration::from_secs(1)),
            send_hwm: 1000,
            recv_hwm: 1000,
            max_message_size: Some(1024 * 1024),
        }
    }
}

impl TransportConfig {
    /// Create a new config with the given address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> TransportResult<()> {
        if self.address.is_empty() {
            return Err(TransportError::InvalidConfig(
                "Address cannot be empty".to_string(),
            ));
        }

        if self.max_message_size == Some(0) {
            return Err(TransportError::InvalidConfig(
                "Maximum message size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Reject payloads above `max_message_size`
    pub fn check_size(&self, size: usize) -> TransportResult<()> {
        match self.max_message_size {
            Some(max_size) if size > max_size => {
                Err(TransportError::MessageTooLarge { size, max_size })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_address_rejected() {
        assert!(TransportConfig::new("").validate().is_err());
        assert!(TransportConfig::new("tcp://127.0.0.1:1").validate().is_ok());
    }

    #[test]
    fn test_size_check() {
        let config = TransportConfig::new("inproc://x").with_max_message_size(8);
        assert!(config.check_size(8).is_ok());
        assert!(matches!(
            config.check_size(9),
            Err(TransportError::MessageTooLarge { size: 9, max_size: 8 })
        ));
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common error types for all transports

use thiserror::Error;

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport-agnostic error type
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Transport is not running")]
    NotRunning,

    #[error("Transport is already running")]
    AlreadyRunning,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Message too large: {size} bytes (max: {max_size})")]
    MessageTooLarge { size: usize, max_size: usize },

    #[cfg(feature = "zmq-client")]
    #[error("ZMQ error: {0}")]
    Zmq(#[source] zmq::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TransportError {
    /// Whether reconnecting can clear the error
    ///
    /// Configuration mistakes and oversized messages will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidConfig(_) | Self::MessageTooLarge { .. } | Self::Serialization(_)
        )
    }

    /// A receive that simply found nothing before its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

#[cfg(feature = "zmq-client")]
impl From<zmq::Error> for TransportError {
    fn from(err: zmq::Error) -> Self {
        match err {
            zmq::Error::EAGAIN => Self::Timeout,
            zmq::Error::ETERM => Self::ConnectionClosed,
            _ => Self::Zmq(err),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(TransportError::ConnectFailed("refused".into()).is_retryable());
        assert!(TransportError::ConnectionClosed.is_retryable());
        assert!(TransportError::Timeout.is_retryable());
        assert!(!TransportError::InvalidConfig("empty".into()).is_retryable());
        assert!(!TransportError::MessageTooLarge { size: 10, max_size: 1 }.is_retryable());
    }
}

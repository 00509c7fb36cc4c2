// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the bus bridge

use survey3d_transports::TransportError;
use thiserror::Error;

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Incomplete field '{name}': expected {expected} frames, received {received}")]
    IncompleteField {
        name: String,
        expected: u32,
        received: u32,
    },

    #[error("Capacity exceeded: {what} has {actual} entries, bus limit is {limit}")]
    CapacityExceeded {
        what: String,
        limit: usize,
        actual: usize,
    },

    #[error("Remote requested exit")]
    RemoteExit,

    #[error("Bus silent for {silent_for:?} (liveness timeout {timeout:?})")]
    PeerSilent {
        silent_for: std::time::Duration,
        timeout: std::time::Duration,
    },

    #[error("Failed to spawn bridge thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl BridgeError {
    /// Whether the control loop should tear the connection down and reconnect
    ///
    /// Message-level problems only abort the message that caused them, and a
    /// receive that found nothing is just an idle poll.
    pub fn requires_reconnect(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_retryable() && !err.is_timeout(),
            Self::RemoteExit | Self::PeerSilent { .. } => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedMessage(err.to_string())
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;
use tokio_tungstenite::tungstenite;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognized request type '{kind}' on {channel} channel")]
    UnknownType { channel: &'static str, kind: String },

    #[error("Invalid request on {channel} channel: {reason}")]
    InvalidRequest {
        channel: &'static str,
        reason: String,
    },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request handler failed: {0}")]
    Handler(String),
}

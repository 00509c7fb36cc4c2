// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bridge connection states, diagnostics and tuning

use std::time::Duration;

use chrono::{DateTime, Utc};
use survey3d_config::BusConfig;

/// Connection phase of the control loop
///
/// ```text
///   Disconnected ──► Connecting ──► Subscribing ──► Ready
///        ▲               │               │            │
///        └───────────────┴── failure ────┴────────────┘
///
///   any state ── shutdown ──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeState {
    #[default]
    Disconnected,
    Connecting,
    Subscribing,
    /// The only state in which messages are dispatched or published
    Ready,
    /// Terminal
    Closed,
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Subscribing => "subscribing",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Snapshot of the bridge's bookkeeping
#[derive(Debug, Clone, Default)]
pub struct BridgeStatus {
    pub state: BridgeState,
    /// Connection attempts, successful or not
    pub connect_attempts: u64,
    /// Times the bridge reached `Ready`
    pub connections: u64,
    pub last_acknowledged: Option<DateTime<Utc>>,
    pub acknowledgements: u64,
    pub heartbeats_sent: u64,
    /// Surveys started from `SET_START`
    pub sessions_started: u64,
    /// `SET_START` messages the session manager refused
    pub sessions_refused: u64,
    pub submissions_published: u64,
    pub submissions_dropped: u64,
    /// Inbound messages dropped as malformed or unhandled
    pub messages_dropped: u64,
    pub last_error: Option<String>,
}

/// Control loop timing and queue sizing
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Wait between a failure and the next connection attempt
    pub reconnect_delay: Duration,
    /// Upper bound on one receive; also bounds shutdown latency
    pub poll_timeout: Duration,
    /// `None` disables heartbeats
    pub heartbeat_interval: Option<Duration>,
    /// Longest the bus may stay silent while `Ready` before the connection is
    /// treated as lost; `None` disables the check
    ///
    /// ZMQ connects succeed with no peer and never report a vanished one, so
    /// inbound traffic (normally `ACKNOWLEDGE` replies to heartbeats) is the
    /// only evidence the bus is there.
    pub liveness_timeout: Option<Duration>,
    /// Submissions waiting to be published
    pub outbound_queue_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(5000),
            poll_timeout: Duration::from_millis(100),
            heartbeat_interval: Some(Duration::from_millis(1000)),
            liveness_timeout: Some(Duration::from_millis(5000)),
            outbound_queue_capacity: 16,
        }
    }
}

impl From<&BusConfig> for BridgeConfig {
    fn from(config: &BusConfig) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay(),
            poll_timeout: config.poll_timeout(),
            heartbeat_interval: config.heartbeat_interval(),
            liveness_timeout: config.liveness_timeout(),
            outbound_queue_capacity: config.outbound_queue_capacity,
        }
    }
}

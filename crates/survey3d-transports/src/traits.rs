// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transport trait definitions
//!
//! These traits define the common interface for all transport implementations.

use crate::common::TransportResult;

/// Base transport trait - implemented by all transports
pub trait Transport: Send + Sync {
    /// Start the transport (create and connect the underlying socket)
    fn start(&mut self) -> TransportResult<()>;

    /// Stop the transport
    fn stop(&mut self) -> TransportResult<()>;

    /// Check if transport is running
    fn is_running(&self) -> bool;

    /// Get transport name/type
    fn transport_type(&self) -> &str;
}

/// Publish-Subscribe pattern (Publisher side)
pub trait Publisher: Transport {
    /// Publish a two-part message: `[topic, data]`
    fn publish(&self, topic: &[u8], data: &[u8]) -> TransportResult<()>;
}

/// Publish-Subscribe pattern (Subscriber side)
pub trait Subscriber: Transport {
    /// Subscribe to a topic prefix
    fn subscribe(&mut self, topic: &[u8]) -> TransportResult<()>;

    /// Unsubscribe from a topic prefix
    fn unsubscribe(&mut self, topic: &[u8]) -> TransportResult<()>;

    /// Receive with timeout, returning `(topic, data)`
    ///
    /// Returns `TransportError::Timeout` when nothing arrived in time.
    fn receive_timeout(&self, timeout_ms: u64) -> TransportResult<(Vec<u8>, Vec<u8>)>;
}

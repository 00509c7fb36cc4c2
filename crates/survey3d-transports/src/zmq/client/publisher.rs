// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ PUB pattern, connecting side
//!
//! The bus broker binds the endpoint; this socket connects to it and publishes
//! `[topic, data]` multipart messages.

use crate::common::{TransportConfig, TransportError, TransportResult};
use crate::traits::{Publisher, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// ZMQ PUB socket implementation (publisher)
pub struct ZmqPub {
    context: Arc<zmq::Context>,
    config: TransportConfig,
    socket: Arc<Mutex<Option<zmq::Socket>>>,
    running: Arc<Mutex<bool>>,
}

impl ZmqPub {
    /// Create a new PUB socket
    pub fn new(context: Arc<zmq::Context>, config: TransportConfig) -> TransportResult<Self> {
        config.validate()?;

        Ok(Self {
            context,
            config,
            socket: Arc::new(Mutex::new(None)),
            running: Arc::new(Mutex::new(false)),
        })
    }

    /// Create with default context
    pub fn with_address(address: impl Into<String>) -> TransportResult<Self> {
        let context = Arc::new(zmq::Context::new());
        Self::new(context, TransportConfig::new(address))
    }
}

impl Transport for ZmqPub {
    fn start(&mut self) -> TransportResult<()> {
        if *self.running.lock() {
            return Err(TransportError::AlreadyRunning);
        }

        let socket = self.context.socket(zmq::PUB)?;

        socket.set_linger(0)?;
        socket.set_sndhwm(self.config.send_hwm as i32)?;
        socket.set_conflate(false)?; // Keep all messages (not just latest)

        if let Some(timeout) = self.config.send_timeout {
            socket.set_sndtimeo(timeout.as_millis() as i32)?;
        } else {
            socket.set_sndtimeo(-1)?; // Blocking
        }

        socket
            .connect(&self.config.address)
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        *self.socket.lock() = Some(socket);
        *self.running.lock() = true;

        info!("[ZMQ-PUB] Connected to {}", self.config.address);

        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        *self.running.lock() = false;
        if self.socket.lock().take().is_some() {
            debug!("[ZMQ-PUB] Closed {}", self.config.address);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        *self.running.lock()
    }

    fn transport_type(&self) -> &str {
        "zmq-pub"
    }
}

impl Publisher for ZmqPub {
    fn publish(&self, topic: &[u8], data: &[u8]) -> TransportResult<()> {
        let sock_guard = self.socket.lock();
        let sock = sock_guard.as_ref().ok_or(TransportError::NotRunning)?;

        self.config.check_size(data.len())?;

        // Send multipart message: [topic, data]
        sock.send(topic, zmq::SNDMORE)
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        sock.send(data, 0)
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pub_start_stop() {
        let mut pub_socket = ZmqPub::with_address("tcp://127.0.0.1:30021").unwrap();
        assert!(!pub_socket.is_running());

        pub_socket.start().unwrap();
        assert!(pub_socket.is_running());

        pub_socket.stop().unwrap();
        assert!(!pub_socket.is_running());
    }

    #[test]
    fn test_publish_requires_start() {
        let pub_socket = ZmqPub::with_address("tcp://127.0.0.1:30022").unwrap();
        assert!(matches!(
            pub_socket.publish(b"t", b"d"),
            Err(TransportError::NotRunning)
        ));
    }

    #[test]
    fn test_oversized_message_rejected() {
        let context = Arc::new(zmq::Context::new());
        let config = TransportConfig::new("tcp://127.0.0.1:30023").with_max_message_size(4);
        let mut pub_socket = ZmqPub::new(context, config).unwrap();
        pub_socket.start().unwrap();

        assert!(matches!(
            pub_socket.publish(b"t", b"12345"),
            Err(TransportError::MessageTooLarge { .. })
        ));
    }
}

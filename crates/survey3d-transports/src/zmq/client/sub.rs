// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ SUB pattern (client-side publish-subscribe)
//!
//! SUB sockets receive broadcast messages from the bus. Messages are filtered
//! by topic prefix.

use crate::common::{TransportConfig, TransportError, TransportResult};
use crate::traits::{Subscriber, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// ZMQ SUB socket implementation (subscriber)
pub struct ZmqSub {
    context: Arc<zmq::Context>,
    config: TransportConfig,
    socket: Arc<Mutex<Option<zmq::Socket>>>,
    running: Arc<Mutex<bool>>,
}

impl ZmqSub {
    /// Create a new SUB socket
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

impl Transport for ZmqSub {
    fn start(&mut self) -> TransportResult<()> {
        if *self.running.lock() {
            return Err(TransportError::AlreadyRunning);
        }

        let socket = self.context.socket(zmq::SUB)?;

        socket.set_linger(0)?;
        socket.set_rcvhwm(self.config.recv_hwm as i32)?;
        socket.set_conflate(false)?; // Keep all messages
        if let Some(max_size) = self.config.max_message_size {
            socket.set_maxmsgsize(max_size as i64)?;
        }

        socket
            .connect(&self.config.address)
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        *self.socket.lock() = Some(socket);
        *self.running.lock() = true;

        info!("[ZMQ-SUB] Connected to {}", self.config.address);

        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        *self.running.lock() = false;
        if self.socket.lock().take().is_some() {
            debug!("[ZMQ-SUB] Closed {}", self.config.address);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        *self.running.lock()
    }

    fn transport_type(&self) -> &str {
        "zmq-sub"
    }
}

impl Subscriber for ZmqSub {
    fn subscribe(&mut self, topic: &[u8]) -> TransportResult<()> {
        let sock_guard = self.socket.lock();
        let sock = sock_guard.as_ref().ok_or(TransportError::NotRunning)?;

        sock.set_subscribe(topic)?;

        Ok(())
    }

    fn unsubscribe(&mut self, topic: &[u8]) -> TransportResult<()> {
        let sock_guard = self.socket.lock();
        let sock = sock_guard.as_ref().ok_or(TransportError::NotRunning)?;

        sock.set_unsubscribe(topic)?;

        Ok(())
    }

    fn receive_timeout(&self, timeout_ms: u64) -> TransportResult<(Vec<u8>, Vec<u8>)> {
        let sock_guard = self.socket.lock();
        let sock = sock_guard.as_ref().ok_or(TransportError::NotRunning)?;

        let poll_items = &mut [sock.as_poll_item(zmq::POLLIN)];
        zmq::poll(poll_items, timeout_ms as i64)?;

        if !poll_items[0].is_readable() {
            return Err(TransportError::Timeout);
        }

        // Receive multipart message: [topic, data]
        let mut topic_msg = zmq::Message::new();
        sock.recv(&mut topic_msg, 0)
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        if !sock.get_rcvmore()? {
            // Single-part message (no topic frame)
            return Ok((Vec::new(), topic_msg.to_vec()));
        }

        let mut data_msg = zmq::Message::new();
        sock.recv(&mut data_msg, 0)
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        // Drain any trailing frames so the next receive starts on a message boundary
        while sock.get_rcvmore()? {
            let mut extra = zmq::Message::new();
            sock.recv(&mut extra, 0)
                .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
        }

        Ok((topic_msg.to_vec(), data_msg.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_creation() {
        let context = Arc::new(zmq::Context::new());
        let config = TransportConfig::new("tcp://127.0.0.1:30010");
        assert!(ZmqSub::new(context, config).is_ok());
    }

    #[test]
    fn test_sub_start_stop() {
        let mut sub = ZmqSub::with_address("tcp://127.0.0.1:30011").unwrap();
        assert!(!sub.is_running());

        sub.start().unwrap();
        assert!(sub.is_running());
        assert!(matches!(sub.start(), Err(TransportError::AlreadyRunning)));

        sub.stop().unwrap();
        assert!(!sub.is_running());
    }

    #[test]
    fn test_receive_times_out_without_publisher() {
        let mut sub = ZmqSub::with_address("tcp://127.0.0.1:30012").unwrap();
        sub.start().unwrap();
        sub.subscribe(b"").unwrap();
        assert!(matches!(sub.receive_timeout(20), Err(TransportError::Timeout)));
    }

    #[test]
    fn test_receive_when_stopped() {
        let sub = ZmqSub::with_address("tcp://127.0.0.1:30013").unwrap();
        assert!(matches!(sub.receive_timeout(1), Err(TransportError::NotRunning)));
    }
}

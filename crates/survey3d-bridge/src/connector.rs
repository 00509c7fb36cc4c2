// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Socket factories for the bridge
//!
//! The control loop asks its connector for a fresh, unstarted socket pair on
//! every connection attempt; it starts and subscribes them itself so each step
//! maps onto a bridge state.

use survey3d_transports::memory::{MemoryBus, MemoryPub, MemorySub};
use survey3d_transports::{Publisher, Subscriber, TransportResult};

/// Produces the subscriber/publisher pair for one connection attempt
pub trait BusConnector: Send + 'static {
    type Sub: Subscriber + 'static;
    type Pub: Publisher + 'static;

    fn sockets(&mut self) -> TransportResult<(Self::Sub, Self::Pub)>;

    /// Human-readable target for logs
    fn describe(&self) -> String;
}

/// Connector for the in-process [`MemoryBus`]
#[derive(Clone)]
pub struct MemoryConnector {
    bus: MemoryBus,
}

impl MemoryConnector {
    pub fn new(bus: MemoryBus) -> Self {
        Self { bus }
    }
}

impl BusConnector for MemoryConnector {
    type Sub = MemorySub;
    type Pub = MemoryPub;

    fn sockets(&mut self) -> TransportResult<(MemorySub, MemoryPub)> {
        Ok((self.bus.subscriber(), self.bus.publisher()))
    }

    fn describe(&self) -> String {
        "memory bus".to_string()
    }
}

#[cfg(feature = "zmq-bus")]
pub use self::zmq_bus::ZmqConnector;

#[cfg(feature = "zmq-bus")]
mod zmq_bus {
    use std::sync::Arc;
    use std::time::Duration;

    use survey3d_config::BusConfig;
    use survey3d_transports::zmq::client::{ZmqPub, ZmqSub};
    use survey3d_transports::{TransportConfig, TransportResult};

    use super::BusConnector;

    /// Connects a ZMQ SUB to the bus's outbound endpoint and a ZMQ PUB to its inbound endpoint
    pub struct ZmqConnector {
        context: Arc<zmq::Context>,
        subscribe_endpoint: String,
        publish_endpoint: String,
        send_timeout: Duration,
    }

    impl ZmqConnector {
        pub fn new(
            subscribe_endpoint: impl Into<String>,
            publish_endpoint: impl Into<String>,
        ) -> Self {
            Self {
                context: Arc::new(zmq::Context::new()),
                subscribe_endpoint: subscribe_endpoint.into(),
                publish_endpoint: publish_endpoint.into(),
                send_timeout: Duration::from_millis(1000),
            }
        }

        pub fn from_config(config: &BusConfig) -> Self {
            let mut connector = Self::new(&config.subscribe_endpoint, &config.publish_endpoint);
            connector.send_timeout = config.poll_timeout().max(Duration::from_millis(100));
            connector
        }
    }

    impl BusConnector for ZmqConnector {
        type Sub = ZmqSub;
        type Pub = ZmqPub;

        fn sockets(&mut self) -> TransportResult<(ZmqSub, ZmqPub)> {
            let sub = ZmqSub::new(
                Arc::clone(&self.context),
                TransportConfig::new(&self.subscribe_endpoint),
            )?;
            let publisher = ZmqPub::new(
                Arc::clone(&self.context),
                TransportConfig::new(&self.publish_endpoint).with_send_timeout(self.send_timeout),
            )?;
            Ok((sub, publisher))
        }

        fn describe(&self) -> String {
            format!(
                "sub={} pub={}",
                self.subscribe_endpoint, self.publish_endpoint
            )
        }
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # survey3d-transports
//!
//! Publish/subscribe transport layer used by the Survey3D bus bridge.
//!
//! The bridge is a *client* of the lab message bus: it connects a SUB socket to
//! receive control messages and a PUB socket to publish survey data. Both roles
//! are expressed as transport-agnostic traits so the bridge can run against ZMQ
//! in production and against the in-process [`memory`] bus in tests.
//!
//! ## Feature Flags
//!
//! - `zmq-client` (default): ZMQ SUB and PUB client sockets
//!
//! ## Example: Subscribe over ZMQ
//!
//! ```no_run
//! use survey3d_transports::zmq::client::ZmqSub;
//! use survey3d_transports::traits::{Transport, Subscriber};
//!
//! let mut subscriber = ZmqSub::with_address("tcp://127.0.0.1:7111")?;
//! subscriber.start()?;
//! subscriber.subscribe(b"SET_START")?;
//!
//! let (topic, data) = subscriber.receive_timeout(100)?;
//! println!("{:?} - {:?}", topic, data);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! 1. **Common**: shared error and configuration types
//! 2. **Traits**: transport-agnostic interfaces
//! 3. **Implementations**: ZMQ client sockets, in-process bus

pub mod common;
pub mod memory;
pub mod traits;

#[cfg(feature = "zmq-client")]
pub mod zmq;

// Re-export commonly used types
pub use common::{TransportConfig, TransportError, TransportResult};
pub use traits::{Publisher, Subscriber, Transport};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::common::*;
    pub use crate::memory::{MemoryBus, MemoryPub, MemorySub};
    pub use crate::traits::*;

    #[cfg(feature = "zmq-client")]
    pub use crate::zmq::client::*;
}

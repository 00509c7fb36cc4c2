// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ transport implementations
//!
//! The bus bridge connects to an external broker, so only client-side sockets
//! are provided:
//! - **SUB**: receives control messages (`SET_START`, `EXIT`, ...)
//! - **PUB**: publishes survey data, connecting to the broker's inbound endpoint
//!
//! ## Example
//!
//! ```no_run
//! use survey3d_transports::zmq::client::ZmqPub;
//! use survey3d_transports::traits::{Transport, Publisher};
//!
//! let mut publisher = ZmqPub::with_address("tcp://127.0.0.1:7112")?;
//! publisher.start()?;
//! publisher.publish(b"HEARTBEAT", b"{}")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod client;

pub use client::{ZmqPub, ZmqSub};

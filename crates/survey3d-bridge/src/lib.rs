// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # survey3d-bridge
//!
//! Connects the Survey3D session manager to the lab-wide publish/subscribe bus.
//!
//! - [`codec`]: splits vertex lists into fixed-capacity frames and back
//! - [`messages`]: the bus message schema and survey-to-message translation
//! - [`BusBridge`]: background control loop that keeps a connection alive,
//!   dispatches control messages into the [`SessionManager`] and publishes
//!   submitted surveys
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use survey3d_bridge::{BridgeConfig, BusBridge, MemoryConnector};
//! use survey3d_session::SessionManager;
//! use survey3d_structures::ParticipantConfig;
//! use survey3d_transports::memory::MemoryBus;
//!
//! let manager = Arc::new(SessionManager::new(ParticipantConfig::default(), "../data"));
//! let bus = MemoryBus::new();
//! let bridge = BusBridge::spawn(MemoryConnector::new(bus), manager, BridgeConfig::default())?;
//! println!("bridge is {}", bridge.state());
//! bridge.shutdown();
//! # Ok::<(), survey3d_bridge::BridgeError>(())
//! ```
//!
//! [`SessionManager`]: survey3d_session::SessionManager

mod bridge;
pub mod codec;
pub mod connector;
mod error;
pub mod messages;
mod state;

pub use bridge::{BridgeHandle, BusBridge};
pub use codec::{FrameAssembler, VertexFrame, FRAME_CAPACITY, MAX_FRAMES_PER_FIELD, SENTINEL};
pub use connector::{BusConnector, MemoryConnector};
pub use error::{BridgeError, BridgeResult};
pub use messages::{BusMessage, MessageKind, SurveyTrialResponse, MAX_FIELDS, MAX_QUALITIES};
pub use state::{BridgeConfig, BridgeState, BridgeStatus};

#[cfg(feature = "zmq-bus")]
pub use connector::ZmqConnector;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

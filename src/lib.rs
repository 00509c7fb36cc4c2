// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Survey3D
//!
//! Session service for projected-field perceptual surveys. A participant marks
//! where a sensation is felt on a 3D body model; the experimenter starts and
//! monitors the session; every submitted survey is saved as JSON and streamed
//! to the lab's publish/subscribe bus.
//!
//! ## Architecture
//!
//! ```text
//!  participant ws ─┐                         ┌─► <data_dir>/<participant>_<date>_<time>.json
//!                  ├─► Gateway ─► SessionManager
//!  experimenter ws ┘      │            ▲
//!                         │ submitted  │ SET_START / SAVE_MESSAGE_LOG
//!                         ▼            │
//!                      BusBridge ◄─────┴─── lab bus (ZMQ SUB)
//!                         │
//!                         └──► VERTICES_STREAM × n, SURVEY_TRIAL_RESPONSE (ZMQ PUB)
//! ```
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! survey3d = "0.3"
//! ```
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use survey3d::prelude::*;
//!
//! let manager = Arc::new(SessionManager::new(ParticipantConfig::default(), "../data"));
//! let survey = manager.new_survey("alice");
//! println!("{:?}", survey.map(|s| s.file_name()));
//! ```
//!
//! ## Feature Flags
//!
//! - `bridge` (default): bus bridge, chunking codec and ZMQ transports
//! - `server` (default): WebSocket gateway for the two client channels
//!
//! Without either flag the crate is the session core only: configuration,
//! value types, session manager and logging setup.

// Re-export foundation
pub use survey3d_config as config;
pub use survey3d_observability as observability;

// Re-export domain
pub use survey3d_session as session;
pub use survey3d_structures as structures;

// Re-export I/O layer
#[cfg(feature = "bridge")]
pub use survey3d_bridge as bridge;

#[cfg(feature = "bridge")]
pub use survey3d_transports as transports;

#[cfg(feature = "server")]
pub use survey3d_server as server;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config, Survey3dConfig};
    pub use crate::session::{SessionError, SessionManager, SessionResult, SubmissionSink};
    pub use crate::structures::{HotSpot, ParticipantConfig, ProjectedField, Quality, Survey};

    #[cfg(feature = "bridge")]
    pub use crate::bridge::{
        BridgeConfig, BridgeHandle, BridgeState, BusBridge, BusConnector, BusMessage,
        MemoryConnector,
    };

    #[cfg(feature = "server")]
    pub use crate::server::{Gateway, GatewayServer};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

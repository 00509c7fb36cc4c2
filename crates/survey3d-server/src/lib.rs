// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # survey3d-server
//!
//! Session gateway for Survey3D: two WebSocket channels that translate client
//! requests into [`SessionManager`](survey3d_session::SessionManager) calls.
//!
//! | Channel | Requests | Replies |
//! |---|---|---|
//! | participant | `waiting`, `update`, `submit` | `survey`, `submitResponse` |
//! | experimenter | `start`, `requestSurvey`, `requestConfig` | `survey`, `noSurvey`, `config` |
//!
//! Failures are reported inside replies. Only a request with an unrecognized
//! `type` closes its channel.

mod error;
pub mod gateway;
pub mod protocol;
pub mod server;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{ChannelAction, Gateway};
pub use protocol::{Channel, Reply};
pub use server::{GatewayServer, Routes};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

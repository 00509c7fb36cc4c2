// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core value types for Survey3D sessions.
//!
//! A [`Survey`] is one participant's recording session. It owns a list of
//! [`ProjectedField`]s (annotated mesh regions), each carrying a [`HotSpot`] and
//! any number of [`Quality`] ratings. All types serialize to the camelCase JSON
//! documents exchanged with browser clients and written to disk.
//!
//! Bus protocol limits (frame size, field caps) deliberately live in
//! `survey3d-bridge`, not here.

mod error;
mod participant_config;
mod projected_field;
mod quality;
mod survey;

pub use error::StructureError;
pub use participant_config::ParticipantConfig;
pub use projected_field::{HotSpot, ProjectedField};
pub use quality::Quality;
pub use survey::{Survey, DATE_FORMAT, TIME_FORMAT};

/// Result alias for structure operations
pub type StructureResult<T> = Result<T, StructureError>;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

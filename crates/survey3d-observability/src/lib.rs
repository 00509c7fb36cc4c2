// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # survey3d-observability
//!
//! Logging infrastructure shared by every Survey3D crate.
//!
//! Provides a single `init_logging` entry point and per-crate debug flag support
//! (`--debug-survey3d-bridge`, `SURVEY3D_DEBUG=all`, ...).
//!
//! ## Features
//! - `file-logging`: daily-rotated JSON log files per run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known Survey3D crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "survey3d",
    "survey3d-config",
    "survey3d-structures",
    "survey3d-session",
    "survey3d-transports",
    "survey3d-bridge",
    "survey3d-server",
];

/// Convert a crate name to the module path `tracing` uses as event target
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}

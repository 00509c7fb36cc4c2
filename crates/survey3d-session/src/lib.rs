// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Survey3D Session Manager
//!
//! Owns the single live [`Survey`] of the process and enforces its lifecycle:
//!
//! ```text
//!   new_survey(p) ──► live ──update(token, fields)──► live
//!                      │
//!                      └──submit(token, fields)──► file written ──► empty
//! ```
//!
//! Every mutator goes through one mutex, so the gateway and the bus bridge can
//! race `new_survey` and exactly one wins. The lock is held across the file
//! write in `submit`, which means a `new_survey` issued while a submission is
//! still being written waits and then sees the outcome.
//!
//! ```rust,no_run
//! use survey3d_session::SessionManager;
//! use survey3d_structures::ParticipantConfig;
//!
//! let manager = SessionManager::new(ParticipantConfig::default(), "../data");
//! if let Ok(survey) = manager.new_survey("alice") {
//!     println!("token = {}", survey.start_time);
//! }
//! ```

mod error;
mod manager;
pub mod persistence;

pub use error::{SessionError, SessionResult};
pub use manager::SessionManager;

pub use survey3d_structures::Survey;

/// Receives every survey that was verified on disk.
///
/// Implemented by the bus bridge handle; the gateway calls it after a
/// successful `submit`. Implementations must not block.
pub trait SubmissionSink: Send + Sync {
    fn submitted(&self, survey: &Survey);
}

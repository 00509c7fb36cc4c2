// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use survey3d_structures::StructureError;
use thiserror::Error;

/// Session lifecycle failures
///
/// None of these are fatal to the process; callers report them and carry on.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No survey is in progress")]
    NoLiveSession,

    #[error("A survey for '{participant}' is already in progress")]
    SessionActive { participant: String },

    #[error("Participant '{0}' is not in the participant configuration")]
    UnknownParticipant(String),

    #[error("Stale survey token: live survey started at {expected}, request carried {received}")]
    StaleToken { expected: String, received: String },

    #[error("Survey cannot be saved without any projected fields")]
    EmptySubmission,

    #[error("Invalid projected fields: {0}")]
    InvalidFields(#[source] StructureError),

    #[error("Failed to persist survey to {path}: {reason}")]
    PersistenceFailure { path: PathBuf, reason: String },

    #[error("Failed to read saved survey {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: StructureError,
    },
}

impl SessionError {
    /// True for errors caused by a request that no longer matches the live state
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::NoLiveSession | Self::StaleToken { .. })
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing, validating or loading Survey3D documents
#[derive(Error, Debug)]
pub enum StructureError {
    #[error("Failed to parse document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Projected field name '{0}' appears more than once")]
    DuplicateFieldName(String),
}

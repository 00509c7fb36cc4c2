// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Survey save/load
//!
//! Each completed survey becomes one pretty-printed JSON file named
//! `{participant}_{date}_{startTime}.json`. Files are created exclusively and
//! never rewritten.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use survey3d_structures::Survey;

use crate::{SessionError, SessionResult};

/// Write `survey` into `dir`, returning the created file path
pub fn save_survey(dir: &Path, survey: &Survey) -> SessionResult<PathBuf> {
    let path = dir.join(survey.file_name());
    let failure = |reason: String| SessionError::PersistenceFailure {
        path: path.clone(),
        reason,
    };

    let document = survey
        .to_json_pretty()
        .map_err(|e| failure(format!("Serialize failed: {}", e)))?;

    std::fs::create_dir_all(dir).map_err(|e| failure(format!("Create dir failed: {}", e)))?;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| failure(format!("Open failed: {}", e)))?;

    file.write_all(document.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| {
            // Leave nothing half-written behind
            let _ = std::fs::remove_file(&path);
            failure(format!("Write failed: {}", e))
        })?;

    Ok(path)
}

/// Read a previously saved survey back
pub fn load_survey(path: &Path) -> SessionResult<Survey> {
    let text = std::fs::read_to_string(path).map_err(|e| SessionError::Load {
        path: path.to_path_buf(),
        source: survey3d_structures::StructureError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    Survey::from_json(&text).map_err(|source| SessionError::Load {
        path: path.to_path_buf(),
        source,
    })
}

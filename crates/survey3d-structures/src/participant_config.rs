// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{StructureError, StructureResult};

/// Participant identifier -> opaque configuration document.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantConfig {
    entries: BTreeMap<String, serde_json::Value>,
}

impl ParticipantConfig {
    pub fn from_entries(entries: BTreeMap<String, serde_json::Value>) -> Self {
        Self { entries }
    }

    /// Parse a JSON object document
    pub fn from_json(text: &str) -> StructureResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(StructureError::InvalidDocument(
                "participant configuration must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn load(path: &Path) -> StructureResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| StructureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn get(&self, participant: &str) -> Option<&serde_json::Value> {
        self.entries.get(participant)
    }

    pub fn contains(&self, participant: &str) -> bool {
        self.entries.contains_key(participant)
    }

    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

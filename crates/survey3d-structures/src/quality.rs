// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// A qualitative rating attached to a projected field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quality {
    /// Rating on a 0 to 10 scale
    #[serde(default = "Quality::default_intensity")]
    pub intensity: f64,
    /// Depth tags (at / above / below skin level); may hold several
    #[serde(default)]
    pub depth: Vec<String>,
    /// Quality type label, unset until the participant picks one
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Quality {
    fn default_intensity() -> f64 {
        5.0
    }

    pub fn new(intensity: f64, depth: Vec<String>, kind: impl Into<String>) -> Self {
        Self {
            intensity,
            depth,
            kind: Some(kind.into()),
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self {
            intensity: Self::default_intensity(),
            depth: Vec::new(),
            kind: None,
        }
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::Quality;

/// Point on the model where the participant placed the hot spot.
///
/// Coordinates stay `None` until a hot spot is placed; clients send
/// `{"x": null, "y": null, "z": null}` in that case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HotSpot {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl HotSpot {
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    pub fn is_placed(&self) -> bool {
        self.x.is_some() && self.y.is_some() && self.z.is_some()
    }
}

/// One annotated region drawn onto a 3D model.
///
/// A field is always replaced as a whole; there is no partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedField {
    /// Name of the model the field is drawn on
    #[serde(default)]
    pub model: String,
    /// Unique within its survey; used as the correlation key on the bus
    pub name: String,
    /// Mesh vertex indices, in client order
    #[serde(default)]
    pub vertices: Vec<u32>,
    #[serde(default)]
    pub hot_spot: HotSpot,
    #[serde(default = "ProjectedField::default_naturalness")]
    pub naturalness: f64,
    #[serde(default)]
    pub pain: f64,
    #[serde(default)]
    pub qualities: Vec<Quality>,
}

impl ProjectedField {
    fn default_naturalness() -> f64 {
        5.0
    }

    /// Empty field with client defaults (naturalness 5, pain 0)
    pub fn new(model: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            name: name.into(),
            vertices: Vec::new(),
            hot_spot: HotSpot::default(),
            naturalness: Self::default_naturalness(),
            pain: 0.0,
            qualities: Vec::new(),
        }
    }

    pub fn with_vertices(mut self, vertices: Vec<u32>) -> Self {
        self.vertices = vertices;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.qualities.push(quality);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_document() {
        let field = ProjectedField::new("hand", "thumb").with_vertices(vec![4, 8]);
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["hotSpot"]["x"], serde_json::Value::Null);
        assert_eq!(value["vertices"], serde_json::json!([4, 8]));
        assert_eq!(value["naturalness"], 5.0);
    }

    #[test]
    fn test_negative_vertex_rejected() {
        let result: Result<ProjectedField, _> =
            serde_json::from_str(r#"{"name": "a", "vertices": [1, -2]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_hot_spot_placement() {
        assert!(!HotSpot::default().is_placed());
        assert!(HotSpot::at(0.0, 1.0, -1.0).is_placed());
    }
}

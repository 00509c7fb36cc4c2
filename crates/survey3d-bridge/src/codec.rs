// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Vertex chunking codec
//!
//! The bus caps every message at a fixed number of integers, so a field's
//! vertex list travels as a run of [`VertexFrame`]s of exactly
//! [`FRAME_CAPACITY`] slots each. The last frame is right-padded with
//! [`SENTINEL`]. Frames carry the owning field's name plus an explicit
//! `frame_index`/`frame_count`, so reassembly never depends on delivery order.
//!
//! ```text
//!   600 vertices ──encode──► [0..512)            frame 0/2
//!                            [512..600) + -1×424 frame 1/2
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Number of vertex slots in one frame
pub const FRAME_CAPACITY: usize = 512;

/// Padding value for unused slots; never a valid vertex index
pub const SENTINEL: i64 = -1;

/// Largest `frame_count` the assembler will buffer frames for
pub const MAX_FRAMES_PER_FIELD: u32 = 4096;

/// One fixed-capacity slice of a field's vertex list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexFrame {
    pub name: String,
    pub frame_index: u32,
    pub frame_count: u32,
    pub vertices: Vec<i64>,
}

impl VertexFrame {
    /// Number of real (non-sentinel) vertices in this frame
    pub fn payload_len(&self) -> usize {
        self.vertices
            .iter()
            .rposition(|&v| v != SENTINEL)
            .map_or(0, |last| last + 1)
    }
}

/// Split `vertices` into `ceil(len / FRAME_CAPACITY)` frames
///
/// An empty list produces no frames.
pub fn encode(name: &str, vertices: &[u32]) -> Vec<VertexFrame> {
    let frame_count = vertices.len().div_ceil(FRAME_CAPACITY) as u32;

    vertices
        .chunks(FRAME_CAPACITY)
        .enumerate()
        .map(|(index, chunk)| {
            let mut slots: Vec<i64> = chunk.iter().map(|&v| i64::from(v)).collect();
            slots.resize(FRAME_CAPACITY, SENTINEL);
            VertexFrame {
                name: name.to_string(),
                frame_index: index as u32,
                frame_count,
                vertices: slots,
            }
        })
        .collect()
}

/// Reassemble one field's frames, in any order, back into its vertex list
///
/// An empty frame set decodes to an empty list. Frames must agree on name and
/// `frame_count`, cover every index exactly once, and only the final frame may
/// contain padding.
pub fn decode(frames: &[VertexFrame]) -> BridgeResult<Vec<u32>> {
    let Some(first) = frames.first() else {
        return Ok(Vec::new());
    };
    let name = first.name.as_str();
    let expected = first.frame_count;

    // frame_count comes off the wire; size nothing from it until the frames back it up
    if expected == 0 {
        return Err(BridgeError::MalformedMessage(format!(
            "'{}' frame claims a frame_count of 0",
            name
        )));
    }
    if expected as usize > frames.len() {
        let received = frames
            .iter()
            .filter(|f| f.name == name && f.frame_index < expected)
            .map(|f| f.frame_index)
            .collect::<HashSet<_>>()
            .len() as u32;
        return Err(BridgeError::IncompleteField {
            name: name.to_string(),
            expected,
            received,
        });
    }

    let mut slots: Vec<Option<&VertexFrame>> = vec![None; expected as usize];
    for frame in frames {
        if frame.name != name {
            return Err(BridgeError::MalformedMessage(format!(
                "frame for '{}' mixed into '{}'",
                frame.name, name
            )));
        }
        if frame.frame_count != expected {
            return Err(BridgeError::MalformedMessage(format!(
                "'{}' frames disagree on frame_count ({} vs {})",
                name, frame.frame_count, expected
            )));
        }
        if frame.vertices.len() != FRAME_CAPACITY {
            return Err(BridgeError::MalformedMessage(format!(
                "'{}' frame {} has {} slots, expected {}",
                name,
                frame.frame_index,
                frame.vertices.len(),
                FRAME_CAPACITY
            )));
        }
        let slot = slots.get_mut(frame.frame_index as usize).ok_or_else(|| {
            BridgeError::MalformedMessage(format!(
                "'{}' frame index {} out of range 0..{}",
                name, frame.frame_index, expected
            ))
        })?;
        if slot.is_some() {
            return Err(BridgeError::MalformedMessage(format!(
                "'{}' frame {} received twice",
                name, frame.frame_index
            )));
        }
        *slot = Some(frame);
    }

    let received = slots.iter().filter(|s| s.is_some()).count() as u32;
    if received < expected {
        return Err(BridgeError::IncompleteField {
            name: name.to_string(),
            expected,
            received,
        });
    }

    let mut vertices = Vec::with_capacity(expected as usize * FRAME_CAPACITY);
    for (index, frame) in slots.into_iter().flatten().enumerate() {
        let is_last = index + 1 == expected as usize;
        let len = frame.payload_len();
        if !is_last && len != FRAME_CAPACITY {
            return Err(BridgeError::MalformedMessage(format!(
                "'{}' frame {} is padded but is not the final frame",
                name, index
            )));
        }
        for &value in &frame.vertices[..len] {
            let vertex = u32::try_from(value).map_err(|_| {
                BridgeError::MalformedMessage(format!(
                    "'{}' frame {} carries invalid vertex {}",
                    name, index, value
                ))
            })?;
            vertices.push(vertex);
        }
    }

    Ok(vertices)
}

/// Collects frames for many fields as they arrive and yields each field once complete
#[derive(Debug, Default)]
pub struct FrameAssembler {
    pending: HashMap<String, Vec<VertexFrame>>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame; returns the decoded field when its last missing frame arrives
    ///
    /// A frame whose `frame_count` exceeds [`MAX_FRAMES_PER_FIELD`] is rejected
    /// on arrival and nothing is buffered for it.
    pub fn push(&mut self, frame: VertexFrame) -> Option<BridgeResult<(String, Vec<u32>)>> {
        if frame.frame_count > MAX_FRAMES_PER_FIELD {
            return Some(Err(BridgeError::MalformedMessage(format!(
                "'{}' frame_count {} exceeds {}",
                frame.name, frame.frame_count, MAX_FRAMES_PER_FIELD
            ))));
        }
        let expected = frame.frame_count as usize;
        let name = frame.name.clone();
        let frames = self.pending.entry(name.clone()).or_default();
        frames.push(frame);

        if frames.len() < expected {
            return None;
        }
        let frames = self.pending.remove(&name)?;
        Some(decode(&frames).map(|vertices| (name, vertices)))
    }

    /// Fields with at least one frame still waiting for the rest
    pub fn incomplete(&self) -> Vec<BridgeError> {
        self.pending
            .iter()
            .map(|(name, frames)| BridgeError::IncompleteField {
                name: name.clone(),
                expected: frames.first().map_or(0, |f| f.frame_count),
                received: frames.len() as u32,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(len: usize) -> Vec<u32> {
        (0..len as u32).map(|v| v * 3 + 1).collect()
    }

    #[test]
    fn test_empty_list_has_no_frames() {
        assert!(encode("A", &[]).is_empty());
        assert_eq!(decode(&[]).unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn test_600_vertices_make_two_frames() {
        let vertices = sequence(600);
        let frames = encode("A", &vertices);

        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.vertices.len() == FRAME_CAPACITY));
        assert!(frames.iter().all(|f| f.frame_count == 2 && f.name == "A"));
        assert_eq!(frames[1].payload_len(), 88);
        assert_eq!(
            frames[1].vertices.iter().filter(|&&v| v == SENTINEL).count(),
            424
        );
        assert_eq!(decode(&frames).unwrap(), vertices);
    }

    #[test]
    fn test_exact_multiple_has_no_padding() {
        let vertices = sequence(FRAME_CAPACITY * 2);
        let frames = encode("A", &vertices);

        assert_eq!(frames.len(), 2);
        assert!(!frames[1].vertices.contains(&SENTINEL));
        assert_eq!(decode(&frames).unwrap(), vertices);
    }

    #[test]
    fn test_lengths_around_frame_boundaries() {
        for len in [1, 511, 512, 513, 1023, 1025] {
            let vertices = sequence(len);
            assert_eq!(decode(&encode("A", &vertices)).unwrap(), vertices, "len {}", len);
        }
    }

    #[test]
    fn test_decode_out_of_order() {
        let vertices = sequence(1300);
        let mut frames = encode("A", &vertices);
        frames.reverse();

        assert_eq!(decode(&frames).unwrap(), vertices);
    }

    #[test]
    fn test_missing_frame_is_incomplete() {
        let mut frames = encode("A", &sequence(1300));
        frames.remove(1);

        match decode(&frames) {
            Err(BridgeError::IncompleteField {
                name,
                expected,
                received,
            }) => {
                assert_eq!(name, "A");
                assert_eq!(expected, 3);
                assert_eq!(received, 2);
            }
            other => panic!("expected IncompleteField, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_and_foreign_frames_rejected() {
        let mut frames = encode("A", &sequence(700));
        frames.push(frames[0].clone());
        assert!(matches!(decode(&frames), Err(BridgeError::MalformedMessage(_))));

        let mut frames = encode("A", &sequence(700));
        frames[1].name = "B".to_string();
        assert!(matches!(decode(&frames), Err(BridgeError::MalformedMessage(_))));
    }

    #[test]
    fn test_padding_only_allowed_in_final_frame() {
        let mut frames = encode("A", &sequence(700));
        frames[0].vertices[FRAME_CAPACITY - 1] = SENTINEL;
        assert!(matches!(decode(&frames), Err(BridgeError::MalformedMessage(_))));
    }

    #[test]
    fn test_assembler_interleaved_fields() {
        let a = sequence(600);
        let b = sequence(30);
        let mut frames_a = encode("A", &a);
        let frames_b = encode("B", &b);

        let mut assembler = FrameAssembler::new();
        assert!(assembler.push(frames_a.remove(1)).is_none());

        let (name, decoded) = assembler.push(frames_b[0].clone()).unwrap().unwrap();
        assert_eq!(name, "B");
        assert_eq!(decoded, b);
        assert_eq!(assembler.incomplete().len(), 1);

        let (name, decoded) = assembler.push(frames_a.remove(0)).unwrap().unwrap();
        assert_eq!(name, "A");
        assert_eq!(decoded, a);
        assert!(assembler.incomplete().is_empty());
    }

    #[test]
    fn test_huge_frame_count_is_incomplete_not_allocated() {
        let mut frames = encode("A", &sequence(10));
        frames[0].frame_count = u32::MAX;

        match decode(&frames) {
            Err(BridgeError::IncompleteField {
                expected, received, ..
            }) => {
                assert_eq!(expected, u32::MAX);
                assert_eq!(received, 1);
            }
            other => panic!("expected IncompleteField, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_frame_count_rejected() {
        let mut frames = encode("A", &sequence(10));
        frames[0].frame_count = 0;
        assert!(matches!(decode(&frames), Err(BridgeError::MalformedMessage(_))));
    }

    #[test]
    fn test_assembler_refuses_oversized_frame_count() {
        let mut frame = encode("A", &sequence(10)).remove(0);
        frame.frame_count = u32::MAX;

        let mut assembler = FrameAssembler::new();
        assert!(matches!(
            assembler.push(frame),
            Some(Err(BridgeError::MalformedMessage(_)))
        ));
        assert!(assembler.incomplete().is_empty());
    }
}

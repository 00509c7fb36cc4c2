// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bus message schema
//!
//! Every bus message is a two-part `[topic, json]` frame where the topic is the
//! message kind name. The bus imposes fixed-capacity arrays, so the summary
//! message always carries exactly [`MAX_FIELDS`] field slots with
//! [`MAX_QUALITIES`] quality slots each; unused slots hold sentinel values.

use serde::{Deserialize, Serialize};
use survey3d_structures::{ProjectedField, Quality, Survey};

use crate::codec::{self, VertexFrame, FRAME_CAPACITY, SENTINEL};
use crate::error::{BridgeError, BridgeResult};

/// Field slots in one `SURVEY_TRIAL_RESPONSE`
pub const MAX_FIELDS: usize = 16;

/// Quality slots per field slot
pub const MAX_QUALITIES: usize = 16;

/// Message kinds known to the bridge; the wire topic is the kind name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    SetStart,
    Exit,
    Acknowledge,
    SaveMessageLog,
    SurveyTrialResponse,
    VerticesStream,
    Heartbeat,
}

impl MessageKind {
    /// Kinds the bridge subscribes to
    pub const INBOUND: [MessageKind; 4] = [
        MessageKind::SetStart,
        MessageKind::Exit,
        MessageKind::Acknowledge,
        MessageKind::SaveMessageLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetStart => "SET_START",
            Self::Exit => "EXIT",
            Self::Acknowledge => "ACKNOWLEDGE",
            Self::SaveMessageLog => "SAVE_MESSAGE_LOG",
            Self::SurveyTrialResponse => "SURVEY_TRIAL_RESPONSE",
            Self::VerticesStream => "VERTICES_STREAM",
            Self::Heartbeat => "HEARTBEAT",
        }
    }

    pub fn from_topic(topic: &[u8]) -> Option<Self> {
        let kind = match topic {
            b"SET_START" => Self::SetStart,
            b"EXIT" => Self::Exit,
            b"ACKNOWLEDGE" => Self::Acknowledge,
            b"SAVE_MESSAGE_LOG" => Self::SaveMessageLog,
            b"SURVEY_TRIAL_RESPONSE" => Self::SurveyTrialResponse,
            b"VERTICES_STREAM" => Self::VerticesStream,
            b"HEARTBEAT" => Self::Heartbeat,
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One quality slot of a summary field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySlot {
    pub intensity: f64,
    pub depth: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl QualitySlot {
    fn unused() -> Self {
        Self {
            intensity: SENTINEL as f64,
            depth: Vec::new(),
            kind: String::new(),
        }
    }

    fn from_quality(quality: &Quality) -> Self {
        Self {
            intensity: quality.intensity,
            depth: quality.depth.clone(),
            kind: quality.kind.clone().unwrap_or_default(),
        }
    }

    pub fn is_unused(&self) -> bool {
        self.kind.is_empty() && self.depth.is_empty() && self.intensity == SENTINEL as f64
    }
}

/// One field slot of a summary message
///
/// `vertex_count` and `frame_count` tell receivers how many
/// `VERTICES_STREAM` frames to expect for `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSlot {
    pub name: String,
    pub model: String,
    pub naturalness: f64,
    pub pain: f64,
    pub hot_spot: [f64; 3],
    pub hot_spot_placed: bool,
    pub vertex_count: u32,
    pub frame_count: u32,
    pub num_qualities: u32,
    pub qualities: Vec<QualitySlot>,
}

impl FieldSlot {
    fn unused() -> Self {
        Self {
            name: String::new(),
            model: String::new(),
            naturalness: SENTINEL as f64,
            pain: SENTINEL as f64,
            hot_spot: [0.0; 3],
            hot_spot_placed: false,
            vertex_count: 0,
            frame_count: 0,
            num_qualities: 0,
            qualities: vec![QualitySlot::unused(); MAX_QUALITIES],
        }
    }

    pub fn is_unused(&self) -> bool {
        self.name.is_empty()
    }
}

/// `SURVEY_TRIAL_RESPONSE`: every scalar of a submitted survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyTrialResponse {
    pub set_num: u32,
    pub participant: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub num_fields: u32,
    pub projected_fields: Vec<FieldSlot>,
}

impl SurveyTrialResponse {
    /// Used field slots, in survey order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSlot> {
        self.projected_fields
            .iter()
            .take(self.num_fields as usize)
    }
}

#[derive(Debug, Deserialize)]
struct SetStartPayload {
    subject_id: String,
}

#[derive(Debug, Deserialize)]
struct SaveMessageLogPayload {
    pathname: String,
}

/// A decoded bus message
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    SetStart { subject_id: String },
    Exit,
    Acknowledge,
    SaveMessageLog { pathname: String },
    SurveyTrialResponse(SurveyTrialResponse),
    VerticesStream(VertexFrame),
    Heartbeat,
    /// Topic the bridge has no schema for
    Unknown { topic: String },
}

impl BusMessage {
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Self::SetStart { .. } => Some(MessageKind::SetStart),
            Self::Exit => Some(MessageKind::Exit),
            Self::Acknowledge => Some(MessageKind::Acknowledge),
            Self::SaveMessageLog { .. } => Some(MessageKind::SaveMessageLog),
            Self::SurveyTrialResponse(_) => Some(MessageKind::SurveyTrialResponse),
            Self::VerticesStream(_) => Some(MessageKind::VerticesStream),
            Self::Heartbeat => Some(MessageKind::Heartbeat),
            Self::Unknown { .. } => None,
        }
    }

    /// Decode a `[topic, json]` pair
    ///
    /// Unknown topics decode to [`BusMessage::Unknown`]; a known topic with a
    /// payload that does not match its schema is a `MalformedMessage`.
    pub fn decode(topic: &[u8], data: &[u8]) -> BridgeResult<Self> {
        let Some(kind) = MessageKind::from_topic(topic) else {
            return Ok(Self::Unknown {
                topic: String::from_utf8_lossy(topic).into_owned(),
            });
        };

        let message = match kind {
            MessageKind::SetStart => {
                let payload: SetStartPayload = parse_payload(kind, data)?;
                if payload.subject_id.is_empty() {
                    return Err(BridgeError::MalformedMessage(
                        "SET_START with empty subject_id".to_string(),
                    ));
                }
                Self::SetStart {
                    subject_id: payload.subject_id,
                }
            }
            MessageKind::SaveMessageLog => {
                let payload: SaveMessageLogPayload = parse_payload(kind, data)?;
                if payload.pathname.trim().is_empty() {
                    return Err(BridgeError::MalformedMessage(
                        "SAVE_MESSAGE_LOG with empty pathname".to_string(),
                    ));
                }
                Self::SaveMessageLog {
                    pathname: payload.pathname,
                }
            }
            MessageKind::Exit => Self::Exit,
            MessageKind::Acknowledge => Self::Acknowledge,
            MessageKind::Heartbeat => Self::Heartbeat,
            MessageKind::SurveyTrialResponse => {
                Self::SurveyTrialResponse(parse_payload(kind, data)?)
            }
            MessageKind::VerticesStream => {
                let frame: VertexFrame = parse_payload(kind, data)?;
                if frame.vertices.len() != FRAME_CAPACITY {
                    return Err(BridgeError::MalformedMessage(format!(
                        "VERTICES_STREAM with {} slots",
                        frame.vertices.len()
                    )));
                }
                Self::VerticesStream(frame)
            }
        };
        Ok(message)
    }

    /// Encode into a `(topic, json)` pair
    pub fn encode(&self) -> BridgeResult<(Vec<u8>, Vec<u8>)> {
        let data = match self {
            Self::SetStart { subject_id } => {
                serde_json::to_vec(&serde_json::json!({ "subject_id": subject_id }))?
            }
            Self::SaveMessageLog { pathname } => {
                serde_json::to_vec(&serde_json::json!({ "pathname": pathname }))?
            }
            Self::Exit | Self::Acknowledge | Self::Heartbeat => b"{}".to_vec(),
            Self::SurveyTrialResponse(summary) => serde_json::to_vec(summary)?,
            Self::VerticesStream(frame) => serde_json::to_vec(frame)?,
            Self::Unknown { topic } => {
                return Err(BridgeError::MalformedMessage(format!(
                    "cannot encode unknown kind '{}'",
                    topic
                )))
            }
        };
        let topic = self
            .kind()
            .map(|kind| kind.as_str().as_bytes().to_vec())
            .unwrap_or_default();
        Ok((topic, data))
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(kind: MessageKind, data: &[u8]) -> BridgeResult<T> {
    serde_json::from_slice(data)
        .map_err(|e| BridgeError::MalformedMessage(format!("{} payload: {}", kind, e)))
}

/// Bus messages for one submitted survey, in send order
#[derive(Debug)]
pub struct Translation {
    /// Every `VERTICES_STREAM` frame, followed by the one `SURVEY_TRIAL_RESPONSE`
    pub messages: Vec<BusMessage>,
    /// `CapacityExceeded` for every cap the survey overflowed
    pub truncated: Vec<BridgeError>,
}

/// Translate a submitted survey into bus messages
///
/// Fields beyond [`MAX_FIELDS`] and qualities beyond [`MAX_QUALITIES`] are
/// dropped and reported in [`Translation::truncated`]. Vertex streams are only
/// produced for fields that made it into the summary.
pub fn translate_submission(survey: &Survey) -> Translation {
    let mut truncated = Vec::new();
    if survey.projected_fields.len() > MAX_FIELDS {
        truncated.push(BridgeError::CapacityExceeded {
            what: format!("survey {} projected fields", survey.file_name()),
            limit: MAX_FIELDS,
            actual: survey.projected_fields.len(),
        });
    }

    let included = &survey.projected_fields[..survey.projected_fields.len().min(MAX_FIELDS)];

    let mut messages: Vec<BusMessage> = included
        .iter()
        .flat_map(|field| codec::encode(&field.name, &field.vertices))
        .map(BusMessage::VerticesStream)
        .collect();

    let mut slots: Vec<FieldSlot> = included
        .iter()
        .map(|field| field_slot(field, &mut truncated))
        .collect();
    slots.resize(MAX_FIELDS, FieldSlot::unused());

    messages.push(BusMessage::SurveyTrialResponse(SurveyTrialResponse {
        set_num: survey.set_num,
        participant: survey.participant.clone(),
        date: survey.date.clone(),
        start_time: survey.start_time.clone(),
        end_time: survey.end_time.clone(),
        num_fields: included.len() as u32,
        projected_fields: slots,
    }));

    Translation {
        messages,
        truncated,
    }
}

fn field_slot(field: &ProjectedField, truncated: &mut Vec<BridgeError>) -> FieldSlot {
    if field.qualities.len() > MAX_QUALITIES {
        truncated.push(BridgeError::CapacityExceeded {
            what: format!("field '{}' qualities", field.name),
            limit: MAX_QUALITIES,
            actual: field.qualities.len(),
        });
    }

    let mut qualities: Vec<QualitySlot> = field
        .qualities
        .iter()
        .take(MAX_QUALITIES)
        .map(QualitySlot::from_quality)
        .collect();
    let num_qualities = qualities.len() as u32;
    qualities.resize(MAX_QUALITIES, QualitySlot::unused());

    let spot = field.hot_spot;
    FieldSlot {
        name: field.name.clone(),
        model: field.model.clone(),
        naturalness: field.naturalness,
        pain: field.pain,
        hot_spot: [
            spot.x.unwrap_or_default(),
            spot.y.unwrap_or_default(),
            spot.z.unwrap_or_default(),
        ],
        hot_spot_placed: spot.is_placed(),
        vertex_count: field.vertices.len() as u32,
        frame_count: field.vertices.len().div_ceil(FRAME_CAPACITY) as u32,
        num_qualities,
        qualities,
    }
}

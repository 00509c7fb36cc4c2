// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

use crate::{ProjectedField, StructureError, StructureResult};

/// `date` format (YYYY-MM-DD)
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// `startTime` / `endTime` format (HH-MM-SS, dashes keep it filename-safe)
pub const TIME_FORMAT: &str = "%H-%M-%S";

/// One participant's recording session.
///
/// `start_time` is stamped once at creation and doubles as the token clients
/// must echo back on update and submit. `end_time` is stamped once at submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub participant: String,
    /// Participant configuration bound at creation, passed through untouched
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub start_time: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub end_time: String,
    /// Ordinal of this survey within the running process, starting at 1
    #[serde(default)]
    pub set_num: u32,
    #[serde(default)]
    pub projected_fields: Vec<ProjectedField>,
}

/// Fresh clients send `null` for times that have not been stamped yet
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Survey {
    /// New survey stamped with the given local time
    pub fn started_at(
        participant: impl Into<String>,
        config: serde_json::Value,
        set_num: u32,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            participant: participant.into(),
            config,
            date: now.format(DATE_FORMAT).to_string(),
            start_time: now.format(TIME_FORMAT).to_string(),
            end_time: String::new(),
            set_num,
            projected_fields: Vec::new(),
        }
    }

    /// New survey stamped with the current wall-clock time
    pub fn start_now(
        participant: impl Into<String>,
        config: serde_json::Value,
        set_num: u32,
    ) -> Self {
        Self::started_at(participant, config, set_num, Local::now().naive_local())
    }

    pub fn stamp_end_now(&mut self) {
        self.end_time = Local::now().format(TIME_FORMAT).to_string();
    }

    /// `{participant}_{date}_{startTime}.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            self.participant, self.date, self.start_time
        )
    }

    pub fn is_empty(&self) -> bool {
        self.projected_fields.is_empty()
    }

    /// Fail if two fields share a name
    pub fn check_field_names(fields: &[ProjectedField]) -> StructureResult<()> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in fields {
            if !seen.insert(field.name.as_str()) {
                return Err(StructureError::DuplicateFieldName(field.name.clone()));
            }
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> StructureResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> StructureResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> StructureResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Pretty-printed document with four-space indentation, as written to disk
    pub fn to_json_pretty(&self) -> StructureResult<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        String::from_utf8(buffer).map_err(|e| StructureError::InvalidDocument(e.to_string()))
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Gateway wire messages
//!
//! Every message is a JSON object with a `type` tag. Requests are parsed in two
//! steps: the tag decides the kind, then the kind's own fields are read. That
//! keeps an unknown tag (which ends the channel) apart from a known tag with a
//! bad body (which only fails that request).

use serde::Serialize;
use serde_json::Value;
use survey3d_structures::Survey;

use crate::error::GatewayError;

/// Which client a channel serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Participant,
    Experimenter,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Experimenter => "experimenter",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests from the participant client
#[derive(Debug, Clone, PartialEq)]
pub enum ParticipantRequest {
    Waiting,
    /// The survey document, or why it could not be read
    Update(Result<Survey, String>),
    Submit(Result<Survey, String>),
}

/// Requests from the experimenter client
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimenterRequest {
    Start { subject: Option<String> },
    RequestSurvey,
    RequestConfig,
}

/// Replies sent on either channel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Reply {
    Survey { survey: Survey },
    NoSurvey,
    SubmitResponse { success: bool },
    Config { config: Value },
}

/// Split a message into its `type` tag and the whole document
fn tagged(channel: Channel, text: &str) -> Result<(String, Value), GatewayError> {
    let document: Value =
        serde_json::from_str(text).map_err(|e| GatewayError::InvalidRequest {
            channel: channel.as_str(),
            reason: e.to_string(),
        })?;
    let kind = document
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::InvalidRequest {
            channel: channel.as_str(),
            reason: "missing string field 'type'".to_string(),
        })?
        .to_string();
    Ok((kind, document))
}

fn survey_field(document: &mut Value) -> Result<Survey, String> {
    let survey = document
        .get_mut("survey")
        .map(Value::take)
        .ok_or_else(|| "missing field 'survey'".to_string())?;
    Survey::from_value(survey).map_err(|e| e.to_string())
}

impl ParticipantRequest {
    /// Errors only for text that is not a tagged request or carries an unknown tag
    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        let channel = Channel::Participant;
        let (kind, mut document) = tagged(channel, text)?;
        match kind.as_str() {
            "waiting" => Ok(Self::Waiting),
            "update" => Ok(Self::Update(survey_field(&mut document))),
            "submit" => Ok(Self::Submit(survey_field(&mut document))),
            _ => Err(GatewayError::UnknownType {
                channel: channel.as_str(),
                kind,
            }),
        }
    }
}

impl ExperimenterRequest {
    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        let channel = Channel::Experimenter;
        let (kind, document) = tagged(channel, text)?;
        match kind.as_str() {
            "start" => Ok(Self::Start {
                subject: document
                    .get("subject")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            "requestSurvey" => Ok(Self::RequestSurvey),
            "requestConfig" => Ok(Self::RequestConfig),
            _ => Err(GatewayError::UnknownType {
                channel: channel.as_str(),
                kind,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT_SURVEY: &str = r#"{
        "participant": "alice",
        "config": {},
        "date": "2025-03-14",
        "startTime": "09-26-53",
        "endTime": null,
        "setNum": 1,
        "projectedFields": []
    }"#;

    #[test]
    fn test_parse_participant_requests() {
        assert_eq!(
            ParticipantRequest::parse(r#"{"type": "waiting"}"#).unwrap(),
            ParticipantRequest::Waiting
        );

        let text = format!(r#"{{"type": "update", "survey": {}}}"#, CLIENT_SURVEY);
        let ParticipantRequest::Update(Ok(survey)) = ParticipantRequest::parse(&text).unwrap()
        else {
            panic!("expected an update with a survey");
        };
        assert_eq!(survey.start_time, "09-26-53");
    }

    #[test]
    fn test_bad_survey_body_is_not_fatal() {
        let request = ParticipantRequest::parse(r#"{"type": "submit", "survey": 7}"#).unwrap();
        assert!(matches!(request, ParticipantRequest::Submit(Err(_))));

        let request = ParticipantRequest::parse(r#"{"type": "update"}"#).unwrap();
        assert!(matches!(request, ParticipantRequest::Update(Err(_))));
    }

    #[test]
    fn test_unknown_type_is_fatal() {
        assert!(matches!(
            ParticipantRequest::parse(r#"{"type": "requestConfig"}"#),
            Err(GatewayError::UnknownType { .. })
        ));
        assert!(matches!(
            ExperimenterRequest::parse(r#"{"type": "submit"}"#),
            Err(GatewayError::UnknownType { .. })
        ));
        assert!(matches!(
            ExperimenterRequest::parse("not json"),
            Err(GatewayError::InvalidRequest { .. })
        ));
        assert!(matches!(
            ExperimenterRequest::parse(r#"{"kind": "start"}"#),
            Err(GatewayError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_parse_experimenter_requests() {
        assert_eq!(
            ExperimenterRequest::parse(r#"{"type": "start", "subject": "bob"}"#).unwrap(),
            ExperimenterRequest::Start {
                subject: Some("bob".to_string())
            }
        );
        assert_eq!(
            ExperimenterRequest::parse(r#"{"type": "requestSurvey"}"#).unwrap(),
            ExperimenterRequest::RequestSurvey
        );
    }

    #[test]
    fn test_reply_tags() {
        let text = serde_json::to_string(&Reply::SubmitResponse { success: true }).unwrap();
        assert_eq!(text, r#"{"type":"submitResponse","success":true}"#);

        let text = serde_json::to_string(&Reply::NoSurvey).unwrap();
        assert_eq!(text, r#"{"type":"noSurvey"}"#);
    }
}

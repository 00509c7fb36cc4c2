// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Full trial: the lab starts a session over the bus, the participant submits
//! through the gateway, and the bus receives the chunked result.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use survey3d::bridge::{
    BridgeConfig, BridgeState, BusBridge, BusMessage, FrameAssembler, MemoryConnector, MessageKind,
};
use survey3d::server::{Channel, ChannelAction, Gateway, Reply};
use survey3d::session::SessionManager;
use survey3d::structures::ParticipantConfig;
use survey3d::transports::memory::MemoryBus;
use tempfile::tempdir;

const WAIT: Duration = Duration::from_secs(3);

fn config() -> BridgeConfig {
    BridgeConfig {
        reconnect_delay: Duration::from_millis(50),
        poll_timeout: Duration::from_millis(10),
        heartbeat_interval: None,
        liveness_timeout: None,
        outbound_queue_capacity: 8,
    }
}

#[test]
fn test_bus_started_session_is_submitted_and_streamed() {
    let dir = tempdir().unwrap();
    let mut entries = BTreeMap::new();
    entries.insert("alice".to_string(), json!({"arm": "left"}));
    let manager = Arc::new(SessionManager::new(
        ParticipantConfig::from_entries(entries),
        dir.path(),
    ));

    let bus = MemoryBus::new();
    let bridge = Arc::new(
        BusBridge::spawn(MemoryConnector::new(bus.clone()), Arc::clone(&manager), config())
            .unwrap(),
    );
    assert!(bridge.wait_for_state(BridgeState::Ready, WAIT));
    let gateway = Gateway::new(Arc::clone(&manager)).with_sink(bridge.clone());

    // Lab starts the trial
    bus.inject(b"SET_START", br#"{"subject_id": "alice"}"#);
    assert!(bridge.wait_for(WAIT, |s| s.sessions_started == 1));

    // Participant picks it up
    let mut survey = match gateway.handle(Channel::Participant, r#"{"type": "waiting"}"#) {
        ChannelAction::Reply(Reply::Survey { survey }) => survey,
        other => panic!("expected survey, got {:?}", other),
    };
    assert_eq!(survey.participant, "alice");

    let vertices: Vec<u32> = (0..600).collect();
    survey.projected_fields = serde_json::from_value(json!([{
        "model": "hand",
        "name": "A",
        "vertices": vertices,
        "hotSpot": {"x": 0.1, "y": 0.2, "z": 0.3},
        "naturalness": 4,
        "pain": 1,
        "qualities": [{"intensity": 6, "depth": ["belowSkin"], "type": "pressure"}]
    }]))
    .unwrap();

    let submit = json!({"type": "submit", "survey": survey}).to_string();
    match gateway.handle(Channel::Participant, &submit) {
        ChannelAction::Reply(Reply::SubmitResponse { success }) => assert!(success),
        other => panic!("expected submitResponse, got {:?}", other),
    }
    assert!(!manager.has_live_survey());
    assert!(dir.path().join(survey.file_name()).exists());

    assert!(bridge.wait_for(WAIT, |s| s.submissions_published == 1));
    let published = bus.take_published();
    let kinds: Vec<MessageKind> = published
        .iter()
        .filter_map(|(topic, _)| MessageKind::from_topic(topic))
        .filter(|kind| *kind != MessageKind::Heartbeat)
        .collect();
    assert_eq!(
        kinds,
        vec![
            MessageKind::VerticesStream,
            MessageKind::VerticesStream,
            MessageKind::SurveyTrialResponse,
        ]
    );

    // A lab-side consumer rebuilds the field from the frames
    let mut assembler = FrameAssembler::new();
    let mut rebuilt = None;
    let mut summary = None;
    for (topic, data) in &published {
        match BusMessage::decode(topic, data).unwrap() {
            BusMessage::VerticesStream(frame) => {
                if let Some(result) = assembler.push(frame) {
                    rebuilt = Some(result.unwrap());
                }
            }
            BusMessage::SurveyTrialResponse(response) => summary = Some(response),
            _ => {}
        }
    }

    let (name, received) = rebuilt.unwrap();
    assert_eq!(name, "A");
    assert_eq!(received, vertices);
    assert!(assembler.incomplete().is_empty());

    let summary = summary.unwrap();
    assert_eq!(summary.participant, "alice");
    assert_eq!(summary.num_fields, 1);
    let field = summary.fields().next().unwrap();
    assert_eq!(field.vertex_count, 600);
    assert_eq!(field.frame_count, 2);
    assert_eq!(field.hot_spot, [0.1, 0.2, 0.3]);
    assert_eq!(field.qualities[0].kind, "pressure");

    bridge.shutdown();
    assert_eq!(bridge.state(), BridgeState::Closed);
}

#[test]
fn test_gateway_works_without_bus() {
    let dir = tempdir().unwrap();
    let mut entries = BTreeMap::new();
    entries.insert("alice".to_string(), json!({}));
    let manager = Arc::new(SessionManager::new(
        ParticipantConfig::from_entries(entries),
        dir.path(),
    ));
    let gateway = Gateway::new(Arc::clone(&manager));

    gateway.handle(Channel::Experimenter, r#"{"type": "start", "subject": "alice"}"#);
    let survey = manager.current_survey().unwrap();
    let field = json!([{"model": "hand", "name": "A", "vertices": [1, 2, 3]}]);
    let submit = json!({
        "type": "submit",
        "survey": {
            "participant": survey.participant,
            "config": survey.config,
            "date": survey.date,
            "startTime": survey.start_time,
            "endTime": null,
            "setNum": survey.set_num,
            "projectedFields": field
        }
    })
    .to_string();

    match gateway.handle(Channel::Participant, &submit) {
        ChannelAction::Reply(Reply::SubmitResponse { success }) => assert!(success),
        other => panic!("expected submitResponse, got {:?}", other),
    }
    assert!(matches!(
        gateway.handle(Channel::Experimenter, r#"{"type": "requestSurvey"}"#),
        ChannelAction::Reply(Reply::NoSurvey)
    ));
}

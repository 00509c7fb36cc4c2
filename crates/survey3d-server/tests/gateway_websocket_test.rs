// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Gateway channels over real WebSocket connections

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use survey3d_config::GatewayConfig;
use survey3d_server::{Gateway, GatewayServer};
use survey3d_session::{SessionManager, SubmissionSink};
use survey3d_structures::{ParticipantConfig, Survey};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Default)]
struct RecordingSink {
    surveys: Mutex<Vec<Survey>>,
}

impl SubmissionSink for RecordingSink {
    fn submitted(&self, survey: &Survey) {
        self.surveys.lock().push(survey.clone());
    }
}

struct Harness {
    addr: SocketAddr,
    manager: Arc<SessionManager>,
    sink: Arc<RecordingSink>,
    _stop: oneshot::Sender<()>,
}

async fn start(dir: &Path) -> Harness {
    let mut entries = BTreeMap::new();
    entries.insert("alice".to_string(), json!({"arm": "left"}));
    let manager = Arc::new(SessionManager::new(
        ParticipantConfig::from_entries(entries),
        dir,
    ));
    let sink = Arc::new(RecordingSink::default());
    let gateway = Gateway::new(Arc::clone(&manager)).with_sink(sink.clone());

    let config = GatewayConfig {
        port: 0,
        ..GatewayConfig::default()
    };
    let server = GatewayServer::bind(&config, gateway).await.unwrap();
    let addr = server.local_addr().unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(server.serve(async {
        let _ = stopped.await;
    }));

    Harness {
        addr,
        manager,
        sink,
        _stop: stop,
    }
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{}{}", addr, path))
        .await
        .unwrap();
    client
}

async fn send(client: &mut Client, message: Value) {
    client.send(Message::Text(message.to_string())).await.unwrap();
}

async fn receive(client: &mut Client) -> Value {
    let message = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("reply timed out")
        .expect("stream ended")
        .unwrap();
    match message {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("unexpected frame {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_session_over_both_channels() {
    let dir = tempfile::tempdir().unwrap();
    let harness = start(dir.path()).await;

    let mut experimenter = connect(harness.addr, "/experimenter-ws").await;
    let mut participant = connect(harness.addr, "/participant-ws").await;

    send(&mut experimenter, json!({"type": "requestSurvey"})).await;
    assert_eq!(receive(&mut experimenter).await["type"], "noSurvey");

    send(&mut experimenter, json!({"type": "requestConfig"})).await;
    let reply = receive(&mut experimenter).await;
    assert_eq!(reply["type"], "config");
    assert_eq!(reply["config"]["alice"]["arm"], "left");

    // start has no reply; the follow-up request orders it before the participant's
    send(&mut experimenter, json!({"type": "start", "subject": "alice"})).await;
    send(&mut experimenter, json!({"type": "requestSurvey"})).await;
    assert_eq!(receive(&mut experimenter).await["type"], "survey");

    send(&mut participant, json!({"type": "waiting"})).await;
    let reply = receive(&mut participant).await;
    assert_eq!(reply["type"], "survey");
    assert_eq!(reply["survey"]["participant"], "alice");

    let mut survey = reply["survey"].clone();
    survey["projectedFields"] = json!([{
        "model": "hand",
        "name": "A",
        "vertices": (0..600).collect::<Vec<u32>>(),
        "hotSpot": {"x": 0.1, "y": 0.2, "z": 0.3},
        "naturalness": 4,
        "pain": 0,
        "qualities": [{"intensity": 6, "depth": ["belowSkin"], "type": "pressure"}]
    }]);

    send(&mut participant, json!({"type": "update", "survey": survey})).await;
    send(&mut participant, json!({"type": "waiting"})).await;
    let reply = receive(&mut participant).await;
    assert_eq!(reply["type"], "survey");
    assert_eq!(reply["survey"]["projectedFields"][0]["name"], "A");

    send(&mut participant, json!({"type": "submit", "survey": survey})).await;
    let reply = receive(&mut participant).await;
    assert_eq!(reply, json!({"type": "submitResponse", "success": true}));

    assert!(!harness.manager.has_live_survey());
    let submitted = harness.sink.surveys.lock().clone();
    assert_eq!(submitted.len(), 1);
    let saved = dir.path().join(submitted[0].file_name());
    let on_disk = SessionManager::load_saved(&saved).unwrap();
    assert_eq!(on_disk.projected_fields.len(), 1);
    assert_eq!(on_disk.projected_fields[0].vertices.len(), 600);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_submit_keeps_channel_open() {
    let dir = tempfile::tempdir().unwrap();
    let harness = start(dir.path()).await;
    let survey = harness.manager.new_survey("alice").unwrap();

    let mut participant = connect(harness.addr, "/participant-ws").await;
    send(&mut participant, json!({"type": "submit", "survey": survey})).await;
    assert_eq!(
        receive(&mut participant).await,
        json!({"type": "submitResponse", "success": false})
    );

    send(&mut participant, json!({"type": "waiting"})).await;
    assert_eq!(receive(&mut participant).await["type"], "survey");
    assert!(harness.sink.surveys.lock().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_type_closes_channel() {
    let dir = tempfile::tempdir().unwrap();
    let harness = start(dir.path()).await;

    let mut experimenter = connect(harness.addr, "/experimenter-ws").await;
    send(&mut experimenter, json!({"type": "launch"})).await;

    let next = tokio::time::timeout(Duration::from_secs(5), experimenter.next())
        .await
        .expect("close timed out");
    assert!(matches!(next, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_path_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let harness = start(dir.path()).await;

    let result = connect_async(format!("ws://{}/nowhere", harness.addr)).await;
    assert!(result.is_err());
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bus bridge control loop
//!
//! Runs on its own thread for the lifetime of the process. Each connection
//! attempt walks `Connecting -> Subscribing -> Ready`; any failure drops the
//! sockets, returns to `Disconnected` and waits a fixed delay before trying
//! again. While `Ready`, a bus that stays silent for longer than the liveness
//! timeout counts as a failure: ZMQ reports neither a missing nor a departed
//! peer, so any inbound message (normally the `ACKNOWLEDGE` for a heartbeat)
//! is what keeps the connection alive. Inbound messages that arrive while the sockets are down are lost on
//! purpose: nothing is buffered across a reconnect.
//!
//! A single crossbeam channel carries the shutdown signal. Every blocking wait
//! in the loop is bounded by the poll timeout or the reconnect delay, so a
//! shutdown is observed promptly but never in the middle of a send.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::{Condvar, Mutex};
use survey3d_session::{SessionManager, SubmissionSink};
use survey3d_structures::Survey;
use survey3d_transports::{Publisher, Subscriber, Transport};
use tracing::{debug, error, info, warn};

use crate::connector::BusConnector;
use crate::error::{BridgeError, BridgeResult};
use crate::messages::{translate_submission, BusMessage, MessageKind};
use crate::state::{BridgeConfig, BridgeState, BridgeStatus};

struct Shared {
    status: Mutex<BridgeStatus>,
    changed: Condvar,
}

impl Shared {
    fn update<F: FnOnce(&mut BridgeStatus)>(&self, apply: F) {
        apply(&mut self.status.lock());
        self.changed.notify_all();
    }

    fn set_state(&self, state: BridgeState) {
        self.update(|status| status.state = state);
        debug!("[BRIDGE] State -> {}", state);
    }
}

/// Entry point for starting the bridge
pub struct BusBridge;

impl BusBridge {
    /// Start the control loop on a dedicated thread
    pub fn spawn<C: BusConnector>(
        connector: C,
        manager: Arc<SessionManager>,
        config: BridgeConfig,
    ) -> BridgeResult<BridgeHandle> {
        let shared = Arc::new(Shared {
            status: Mutex::new(BridgeStatus::default()),
            changed: Condvar::new(),
        });
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let (outbound_tx, outbound_rx) = channel::bounded(config.outbound_queue_capacity.max(1));

        let worker = BridgeWorker {
            connector,
            manager,
            config,
            shared: Arc::clone(&shared),
            shutdown_rx,
            outbound_rx,
            retry: None,
        };

        let thread = std::thread::Builder::new()
            .name("survey3d-bridge".to_string())
            .spawn(move || worker.run())
            .map_err(BridgeError::Spawn)?;

        Ok(BridgeHandle {
            shared,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            outbound_tx,
            thread: Mutex::new(Some(thread)),
        })
    }
}

/// Owner-side handle to a running bridge
///
/// Dropping the handle shuts the bridge down.
pub struct BridgeHandle {
    shared: Arc<Shared>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    outbound_tx: Sender<Survey>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeHandle {
    pub fn state(&self) -> BridgeState {
        self.shared.status.lock().state
    }

    pub fn status(&self) -> BridgeStatus {
        self.shared.status.lock().clone()
    }

    /// Block until `predicate` holds for the status or `timeout` passes
    pub fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> bool
    where
        F: FnMut(&BridgeStatus) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut status = self.shared.status.lock();
        while !predicate(&status) {
            if self
                .shared
                .changed
                .wait_until(&mut status, deadline)
                .timed_out()
            {
                return predicate(&status);
            }
        }
        true
    }

    pub fn wait_for_state(&self, state: BridgeState, timeout: Duration) -> bool {
        self.wait_for(timeout, |status| status.state == state)
    }

    /// Queue a submitted survey for publishing
    ///
    /// Never blocks. Returns `false` when the queue is full or the bridge has
    /// stopped; the survey is then dropped.
    pub fn publish_submission(&self, survey: &Survey) -> bool {
        match self.outbound_tx.try_send(survey.clone()) {
            Ok(()) => {
                debug!(
                    "[BRIDGE] Queued submission {} for publishing",
                    survey.file_name()
                );
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(
                    "[BRIDGE] Outbound queue full, dropping submission {}",
                    survey.file_name()
                );
                self.shared.update(|status| status.submissions_dropped += 1);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(
                    "[BRIDGE] Bridge stopped, dropping submission {}",
                    survey.file_name()
                );
                self.shared.update(|status| status.submissions_dropped += 1);
                false
            }
        }
    }

    /// Stop the control loop and wait for its thread; safe to call repeatedly
    pub fn shutdown(&self) {
        let Some(shutdown_tx) = self.shutdown_tx.lock().take() else {
            return;
        };
        info!("[BRIDGE] Shutdown requested");
        let _ = shutdown_tx.send(());
        drop(shutdown_tx);

        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                error!("[BRIDGE] Control loop thread panicked");
            }
        }
        self.shared.set_state(BridgeState::Closed);
    }
}

impl SubmissionSink for BridgeHandle {
    fn submitted(&self, survey: &Survey) {
        self.publish_submission(survey);
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// How a `Ready` session ended
enum ReadyExit {
    Shutdown,
    Failed(BridgeError),
}

struct BridgeWorker<C: BusConnector> {
    connector: C,
    manager: Arc<SessionManager>,
    config: BridgeConfig,
    shared: Arc<Shared>,
    shutdown_rx: Receiver<()>,
    outbound_rx: Receiver<Survey>,
    /// Submission interrupted by a connection failure, republished on the next `Ready`
    retry: Option<Survey>,
}

impl<C: BusConnector> BridgeWorker<C> {
    fn run(mut self) {
        info!(
            "[BRIDGE] Control loop started ({})",
            self.connector.describe()
        );

        loop {
            if self.shutdown_requested() {
                break;
            }

            let failure = match self.connect() {
                Ok((mut sub, mut publisher)) => {
                    let exit = self.serve(&sub, &publisher);
                    let _ = sub.stop();
                    let _ = publisher.stop();
                    match exit {
                        ReadyExit::Shutdown => break,
                        ReadyExit::Failed(err) => err,
                    }
                }
                Err(err) => err,
            };

            warn!(
                "[BRIDGE] Disconnected: {}; reconnecting in {:?}",
                failure, self.config.reconnect_delay
            );
            let reason = failure.to_string();
            self.shared.update(|status| {
                status.state = BridgeState::Disconnected;
                status.last_error = Some(reason);
            });

            if self.wait_before_reconnect() {
                break;
            }
        }

        self.shared.set_state(BridgeState::Closed);
        info!("[BRIDGE] Control loop stopped");
    }

    fn shutdown_requested(&self) -> bool {
        !matches!(self.shutdown_rx.try_recv(), Err(TryRecvError::Empty))
    }

    /// Returns true if shutdown arrived during the wait
    fn wait_before_reconnect(&self) -> bool {
        match self.shutdown_rx.recv_timeout(self.config.reconnect_delay) {
            Err(RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }

    fn connect(&mut self) -> BridgeResult<(C::Sub, C::Pub)> {
        self.shared.update(|status| {
            status.state = BridgeState::Connecting;
            status.connect_attempts += 1;
        });
        debug!("[BRIDGE] Connecting to {}", self.connector.describe());

        let (mut sub, mut publisher) = self.connector.sockets()?;
        sub.start()?;
        publisher.start()?;

        self.shared.set_state(BridgeState::Subscribing);
        for kind in MessageKind::INBOUND {
            sub.subscribe(kind.as_str().as_bytes())?;
        }

        Ok((sub, publisher))
    }

    fn serve(&mut self, sub: &C::Sub, publisher: &C::Pub) -> ReadyExit {
        self.shared.update(|status| {
            status.state = BridgeState::Ready;
            status.connections += 1;
            status.last_error = None;
        });
        info!("[BRIDGE] Ready ({})", self.connector.describe());

        let poll_ms = self.config.poll_timeout.as_millis() as u64;
        let mut last_heartbeat = Instant::now();
        let mut last_inbound = Instant::now();

        loop {
            if self.shutdown_requested() {
                return ReadyExit::Shutdown;
            }

            if let Some(timeout) = self.config.liveness_timeout {
                let silent_for = last_inbound.elapsed();
                if silent_for >= timeout {
                    return ReadyExit::Failed(BridgeError::PeerSilent {
                        silent_for,
                        timeout,
                    });
                }
            }

            if let Err(err) = self.flush_outbound(publisher) {
                return ReadyExit::Failed(err);
            }

            if let Some(interval) = self.config.heartbeat_interval {
                if last_heartbeat.elapsed() >= interval {
                    if let Err(err) = publish(publisher, &BusMessage::Heartbeat) {
                        return ReadyExit::Failed(err);
                    }
                    last_heartbeat = Instant::now();
                    self.shared.update(|status| status.heartbeats_sent += 1);
                }
            }

            match sub.receive_timeout(poll_ms) {
                Ok((topic, data)) => {
                    last_inbound = Instant::now();
                    if let Err(err) = self.dispatch(&topic, &data) {
                        return ReadyExit::Failed(err);
                    }
                }
                Err(err) if err.is_timeout() => {}
                Err(err) => {
                    let err = BridgeError::from(err);
                    if err.requires_reconnect() {
                        return ReadyExit::Failed(err);
                    }
                    warn!("[BRIDGE] Receive failed: {}", err);
                }
            }
        }
    }

    /// Handle one inbound message; only connection-ending conditions are returned
    fn dispatch(&mut self, topic: &[u8], data: &[u8]) -> BridgeResult<()> {
        let message = match BusMessage::decode(topic, data) {
            Ok(message) => message,
            Err(err) => {
                warn!("[BRIDGE] Dropping message: {}", err);
                self.shared.update(|status| status.messages_dropped += 1);
                return Ok(());
            }
        };

        match message {
            BusMessage::SetStart { subject_id } => match self.manager.new_survey(&subject_id) {
                Ok(survey) => {
                    info!(
                        "[BRIDGE] Started survey for {} (set {}, token {})",
                        subject_id, survey.set_num, survey.start_time
                    );
                    self.shared.update(|status| status.sessions_started += 1);
                }
                Err(err) => {
                    warn!("[BRIDGE] Cannot start survey for {}: {}", subject_id, err);
                    self.shared.update(|status| status.sessions_refused += 1);
                }
            },
            BusMessage::Acknowledge => {
                debug!("[BRIDGE] Acknowledged");
                self.shared.update(|status| {
                    status.last_acknowledged = Some(Utc::now());
                    status.acknowledgements += 1;
                });
            }
            BusMessage::SaveMessageLog { pathname } => {
                match self.manager.set_data_path(&pathname) {
                    Ok(()) => info!("[BRIDGE] Data path changed to {}", pathname),
                    Err(err) => warn!("[BRIDGE] Cannot change data path to {}: {}", pathname, err),
                }
            }
            BusMessage::Exit => {
                info!("[BRIDGE] Remote requested exit");
                return Err(BridgeError::RemoteExit);
            }
            BusMessage::Unknown { topic } => {
                warn!("[BRIDGE] Dropping unknown message kind '{}'", topic);
                self.shared.update(|status| status.messages_dropped += 1);
            }
            other => {
                debug!("[BRIDGE] Ignoring inbound {:?}", other.kind());
                self.shared.update(|status| status.messages_dropped += 1);
            }
        }
        Ok(())
    }

    fn flush_outbound(&mut self, publisher: &C::Pub) -> BridgeResult<()> {
        if let Some(survey) = self.retry.take() {
            self.publish_submission(publisher, survey)?;
        }
        while let Ok(survey) = self.outbound_rx.try_recv() {
            self.publish_submission(publisher, survey)?;
        }
        Ok(())
    }

    /// Publish every vertex frame of a survey, then its summary
    fn publish_submission(&mut self, publisher: &C::Pub, survey: Survey) -> BridgeResult<()> {
        let translation = translate_submission(&survey);
        for limit in &translation.truncated {
            warn!("[BRIDGE] {}; extra entries not sent", limit);
        }

        for message in &translation.messages {
            if let Err(err) = publish(publisher, message) {
                let retry = matches!(&err, BridgeError::Transport(e) if e.is_retryable());
                if retry {
                    self.retry = Some(survey);
                    return Err(err);
                }
                warn!(
                    "[BRIDGE] Dropping submission {}: {}",
                    survey.file_name(),
                    err
                );
                self.shared.update(|status| status.submissions_dropped += 1);
                return Ok(());
            }
        }

        info!(
            "[BRIDGE] Published {} ({} messages)",
            survey.file_name(),
            translation.messages.len()
        );
        self.shared.update(|status| status.submissions_published += 1);
        Ok(())
    }
}

fn publish<P: Publisher>(publisher: &P, message: &BusMessage) -> BridgeResult<()> {
    let (topic, data) = message.encode()?;
    publisher.publish(&topic, &data)?;
    Ok(())
}

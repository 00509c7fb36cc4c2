// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Request handling for the participant and experimenter channels
//!
//! Transport-free: the WebSocket server feeds text frames in and writes back
//! whatever [`ChannelAction`] says.

use std::sync::Arc;

use survey3d_session::{SessionManager, SubmissionSink};
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::protocol::{Channel, ExperimenterRequest, ParticipantRequest, Reply};

/// Outcome of handling one request
#[derive(Debug)]
pub enum ChannelAction {
    Reply(Reply),
    /// Handled; the protocol has no reply for this request
    Silent,
    /// Structurally invalid request; the channel must be closed
    Terminate(GatewayError),
}

/// Maps channel requests onto the session manager
pub struct Gateway {
    manager: Arc<SessionManager>,
    sink: Option<Arc<dyn SubmissionSink>>,
}

impl Gateway {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            sink: None,
        }
    }

    /// Forward every verified submission to `sink` (normally the bus bridge)
    pub fn with_sink(mut self, sink: Arc<dyn SubmissionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub fn handle(&self, channel: Channel, text: &str) -> ChannelAction {
        match channel {
            Channel::Participant => self.handle_participant(text),
            Channel::Experimenter => self.handle_experimenter(text),
        }
    }

    pub fn handle_participant(&self, text: &str) -> ChannelAction {
        let request = match ParticipantRequest::parse(text) {
            Ok(request) => request,
            Err(err) => return ChannelAction::Terminate(err),
        };

        match request {
            ParticipantRequest::Waiting => match self.manager.current_survey() {
                Some(survey) => {
                    debug!("[GATEWAY] Sending live survey to participant");
                    ChannelAction::Reply(Reply::Survey { survey })
                }
                None => ChannelAction::Silent,
            },
            ParticipantRequest::Update(Ok(survey)) => {
                if let Err(err) = self
                    .manager
                    .update(&survey.start_time, survey.projected_fields)
                {
                    warn!("[GATEWAY] Update rejected: {}", err);
                }
                ChannelAction::Silent
            }
            ParticipantRequest::Update(Err(reason)) => {
                warn!("[GATEWAY] Update ignored, unreadable survey: {}", reason);
                ChannelAction::Silent
            }
            ParticipantRequest::Submit(Ok(survey)) => {
                let success = match self
                    .manager
                    .submit(&survey.start_time, survey.projected_fields)
                {
                    Ok(saved) => {
                        info!("[GATEWAY] Submission saved: {}", saved.file_name());
                        if let Some(sink) = &self.sink {
                            sink.submitted(&saved);
                        }
                        true
                    }
                    Err(err) => {
                        warn!("[GATEWAY] Submission failed: {}", err);
                        false
                    }
                };
                ChannelAction::Reply(Reply::SubmitResponse { success })
            }
            ParticipantRequest::Submit(Err(reason)) => {
                warn!("[GATEWAY] Submission failed, unreadable survey: {}", reason);
                ChannelAction::Reply(Reply::SubmitResponse { success: false })
            }
        }
    }

    pub fn handle_experimenter(&self, text: &str) -> ChannelAction {
        let request = match ExperimenterRequest::parse(text) {
            Ok(request) => request,
            Err(err) => return ChannelAction::Terminate(err),
        };

        match request {
            ExperimenterRequest::Start {
                subject: Some(subject),
            } => {
                match self.manager.new_survey(&subject) {
                    Ok(survey) => info!(
                        "[GATEWAY] Starting survey for {} (set {})",
                        subject, survey.set_num
                    ),
                    Err(err) => warn!("[GATEWAY] Cannot start survey for {}: {}", subject, err),
                }
                ChannelAction::Silent
            }
            ExperimenterRequest::Start { subject: None } => {
                warn!("[GATEWAY] Start request without a subject");
                ChannelAction::Silent
            }
            ExperimenterRequest::RequestSurvey => match self.manager.current_survey() {
                Some(survey) => ChannelAction::Reply(Reply::Survey { survey }),
                None => ChannelAction::Reply(Reply::NoSurvey),
            },
            ExperimenterRequest::RequestConfig => ChannelAction::Reply(Reply::Config {
                config: self.manager.participant_config().to_value(),
            }),
        }
    }
}

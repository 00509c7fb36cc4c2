// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! WebSocket server for the gateway channels
//!
//! One listener serves both channels; the HTTP upgrade path picks the channel.
//! Each connection is handled on its own task, strictly request by request, and
//! session calls run on the blocking pool because `submit` writes a file.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use survey3d_config::GatewayConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, error, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{ChannelAction, Gateway};
use crate::protocol::Channel;

/// Upgrade paths for the two channels
#[derive(Debug, Clone)]
pub struct Routes {
    pub participant: String,
    pub experimenter: String,
}

impl Routes {
    pub fn route(&self, path: &str) -> Option<Channel> {
        if path == self.participant {
            Some(Channel::Participant)
        } else if path == self.experimenter {
            Some(Channel::Experimenter)
        } else {
            None
        }
    }
}

impl From<&GatewayConfig> for Routes {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            participant: config.participant_path.clone(),
            experimenter: config.experimenter_path.clone(),
        }
    }
}

/// A bound gateway listener, ready to serve
pub struct GatewayServer {
    listener: TcpListener,
    routes: Arc<Routes>,
    gateway: Arc<Gateway>,
}

impl GatewayServer {
    pub async fn bind(config: &GatewayConfig, gateway: Gateway) -> GatewayResult<Self> {
        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| GatewayError::Bind {
                address: address.clone(),
                source,
            })?;

        info!(
            "[GATEWAY] Listening on {} (participant {}, experimenter {})",
            address, config.participant_path, config.experimenter_path
        );

        Ok(Self {
            listener,
            routes: Arc::new(Routes::from(config)),
            gateway: Arc::new(gateway),
        })
    }

    pub fn local_addr(&self) -> GatewayResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|source| GatewayError::Bind {
                address: "listener".to_string(),
                source,
            })
    }

    /// Accept connections until `shutdown` completes
    pub async fn serve<F>(self, shutdown: F) -> GatewayResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("[GATEWAY] Shutting down listener");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("[GATEWAY] New connection from {}", peer);
                        let routes = Arc::clone(&self.routes);
                        let gateway = Arc::clone(&self.gateway);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, peer, routes, gateway).await {
                                warn!("[GATEWAY] Client {} error: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => error!("[GATEWAY] Accept error: {}", e),
                },
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    routes: Arc<Routes>,
    gateway: Arc<Gateway>,
) -> GatewayResult<()> {
    let mut channel = None;
    let ws_stream = accept_hdr_async(stream, |request: &Request, response: Response| {
        channel = routes.route(request.uri().path());
        if channel.is_some() {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("unknown channel".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    })
    .await?;
    let Some(channel) = channel else {
        return Ok(());
    };

    info!("[GATEWAY] {} client {} connected", channel, peer);
    let (mut write, mut read) = ws_stream.split();

    while let Some(message) = read.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => {
                    warn!("[GATEWAY] {} client {} sent non-UTF-8 data", channel, peer);
                    break;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("[GATEWAY] Message error from {}: {}", peer, e);
                break;
            }
        };

        let handler = Arc::clone(&gateway);
        let action = tokio::task::spawn_blocking(move || handler.handle(channel, &text))
            .await
            .map_err(|e| GatewayError::Handler(e.to_string()))?;

        match action {
            ChannelAction::Reply(reply) => {
                let body = serde_json::to_string(&reply)?;
                write.send(Message::Text(body)).await?;
            }
            ChannelAction::Silent => {}
            ChannelAction::Terminate(err) => {
                warn!("[GATEWAY] Closing {} client {}: {}", channel, peer, err);
                let frame = CloseFrame {
                    code: CloseCode::Policy,
                    reason: err.to_string().into(),
                };
                let _ = write.send(Message::Close(Some(frame))).await;
                break;
            }
        }
    }

    info!("[GATEWAY] {} client {} disconnected", channel, peer);
    Ok(())
}

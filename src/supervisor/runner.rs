// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The connection supervisor task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::command::CommandKind;
use crate::dispatcher::CommandDispatcher;
use crate::error::{CommandError, ParseError};
use crate::event::{BridgeEvent, EventBus};
use crate::protocol::{InboundFrame, Link, WebSocketTransport, duration_ms};
use crate::state::StateStore;
use crate::telemetry::{self, InboundRecord};

use super::{Backoff, BridgeConfig, ConnectionState, ConnectionStatus};

/// Resolves once shutdown is requested or the bridge is dropped.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Why a connected session ended.
#[derive(Debug)]
enum SessionEnd {
    Shutdown,
    Lost(String),
}

/// Owns the connection lifecycle of one bridge.
///
/// Runs until shutdown is requested: connect, serve the link until it drops,
/// wait out the backoff, repeat. There is no give-up state.
pub(crate) struct Supervisor {
    config: BridgeConfig,
    transport: WebSocketTransport,
    store: Arc<StateStore>,
    dispatcher: Arc<CommandDispatcher>,
    events: EventBus,
    status: watch::Sender<ConnectionStatus>,
    decode_errors: Arc<AtomicU64>,
}

impl Supervisor {
    pub(crate) fn new(
        config: BridgeConfig,
        store: Arc<StateStore>,
        dispatcher: Arc<CommandDispatcher>,
        events: EventBus,
        status: watch::Sender<ConnectionStatus>,
        decode_errors: Arc<AtomicU64>,
    ) -> Self {
        Self {
            transport: WebSocketTransport::new(config.connect_timeout),
            config,
            store,
            dispatcher,
            events,
            status,
            decode_errors,
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        tracing::debug!(state = %status.state, retry_count = status.retry_count, "connection state");
        self.status.send_replace(status.clone());
        self.events.publish(BridgeEvent::ConnectionChanged(status));
    }

    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = Backoff::new(self.config.reconnection.clone());
        let mut retry_count: u32 = 0;
        let mut last_error: Option<String> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.set_status(ConnectionStatus {
                state: ConnectionState::Connecting,
                last_error: last_error.clone(),
                retry_count,
                next_retry_at: None,
                connected_since: None,
            });

            let opened = tokio::select! {
                result = self.transport.open(&self.config.endpoint) => Some(result),
                () = stopped(&mut shutdown) => None,
            };
            let Some(opened) = opened else { break };

            match opened {
                Ok(link) => {
                    backoff.reset();
                    retry_count = 0;
                    match self.serve(link, &mut shutdown).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Lost(reason) => {
                            tracing::error!(endpoint = %self.config.endpoint, %reason, "link lost");
                            last_error = Some(reason);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(endpoint = %self.config.endpoint, error = %e, "connect failed");
                    last_error = Some(e.to_string());
                }
            }

            retry_count = retry_count.saturating_add(1);
            let delay = backoff.next_delay();
            let next_retry_at = chrono::Duration::from_std(delay)
                .ok()
                .map(|d| Utc::now() + d);
            tracing::info!(
                delay_ms = duration_ms(delay),
                attempt = retry_count,
                "reconnecting"
            );
            self.set_status(ConnectionStatus {
                state: ConnectionState::Reconnecting,
                last_error: last_error.clone(),
                retry_count,
                next_retry_at,
                connected_since: None,
            });

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = stopped(&mut shutdown) => break,
            }
        }

        self.set_status(ConnectionStatus {
            last_error,
            ..ConnectionStatus::disconnected()
        });
        tracing::info!(endpoint = %self.config.endpoint, "supervisor stopped");
    }

    async fn serve(&self, link: Link, shutdown: &mut watch::Receiver<bool>) -> SessionEnd {
        let (writer, mut reader, mut down) = link.into_parts();
        self.dispatcher.attach(writer.clone());
        self.set_status(ConnectionStatus {
            state: ConnectionState::Connected,
            last_error: None,
            retry_count: 0,
            next_retry_at: None,
            connected_since: Some(Utc::now()),
        });
        tracing::info!(endpoint = %self.config.endpoint, "connected");
        self.prime();

        let interval = self.config.heartbeat_interval;
        let window = self.config.heartbeat_timeout;
        let mut ping = tokio::time::interval_at(Instant::now() + interval, interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let liveness = tokio::time::sleep(window);
        tokio::pin!(liveness);

        let end = loop {
            tokio::select! {
                biased;

                () = stopped(shutdown) => break SessionEnd::Shutdown,
                lost = &mut down => {
                    break SessionEnd::Lost(lost.map_or_else(|_| "link dropped".to_string(), |d| d.reason));
                }
                frame = reader.receive() => match frame {
                    Ok(InboundFrame::Text(text)) => {
                        liveness.as_mut().reset(Instant::now() + window);
                        self.ingest(text.as_bytes());
                    }
                    Ok(InboundFrame::Binary(bytes)) => {
                        liveness.as_mut().reset(Instant::now() + window);
                        self.ingest(&bytes);
                    }
                    Ok(InboundFrame::Heartbeat) => liveness.as_mut().reset(Instant::now() + window),
                    Ok(InboundFrame::Closed) => break SessionEnd::Lost("closed by peer".to_string()),
                    Err(e) => break SessionEnd::Lost(e.to_string()),
                },
                _ = ping.tick() => {
                    if let Err(e) = writer.ping().await {
                        break SessionEnd::Lost(e.to_string());
                    }
                }
                () = &mut liveness => {
                    break SessionEnd::Lost(format!("no frame within {} ms", duration_ms(window)));
                }
            }
        };

        self.dispatcher.detach();
        writer.close().await;
        self.dispatcher.fail_all(&CommandError::ConnectionLost);
        self.store.mark_unavailable();
        end
    }

    /// Requests firmware details and the profile list for a fresh link.
    fn prime(&self) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let state = self.store.machine();
        tokio::spawn(async move {
            let diagnostics = dispatcher.issue(CommandKind::RequestDiagnostics, &state).await;
            let profiles = dispatcher.issue(CommandKind::RequestProfiles, &state).await;
            for handle in [diagnostics, profiles] {
                let command = handle.kind().name();
                if let Err(e) = handle.outcome().await {
                    tracing::debug!(command, error = %e, "priming request failed");
                }
            }
        });
    }

    /// Decodes one frame and routes its records in order.
    fn ingest(&self, frame: &[u8]) {
        let records = match telemetry::decode_bytes(frame) {
            Ok(records) => records,
            Err(e) => {
                let total = self.decode_errors.fetch_add(1, Ordering::Relaxed) + 1;
                if matches!(e, ParseError::UnknownType(_)) {
                    tracing::debug!(error = %e, total, "ignored frame");
                } else {
                    tracing::warn!(
                        error = %e,
                        total,
                        frame = %String::from_utf8_lossy(frame),
                        "failed to decode frame"
                    );
                }
                return;
            }
        };

        for record in records {
            match record {
                InboundRecord::Ack(id) => {
                    self.dispatcher.resolve_ack(id);
                }
                InboundRecord::Nack { id, reason } => {
                    self.dispatcher.resolve_nack(id, reason);
                }
                other => {
                    self.store.apply(&other);
                }
            }
        }
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process mock of a GaggiMate WebSocket server.

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gaggimate_bridge::supervisor::{BridgeConfig, ReconnectionPolicy};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

/// A listening mock machine. Each accepted WebSocket becomes a [`MockConnection`].
pub struct MockMachine {
    pub port: u16,
    connections: mpsc::UnboundedReceiver<MockConnection>,
    accept_task: JoinHandle<()>,
}

impl MockMachine {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, connections) = mpsc::unbounded_channel();

        let accept_task = tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let Ok(ws) = accept_async(tcp).await else {
                    continue;
                };
                if tx.send(MockConnection::spawn(ws)).is_err() {
                    break;
                }
            }
        });

        Self {
            port,
            connections,
            accept_task,
        }
    }

    /// Bridge configuration pointing at this mock, with short test timings.
    pub fn config(&self) -> BridgeConfig {
        BridgeConfig::new("127.0.0.1")
            .with_port(self.port)
            .with_connect_timeout(Duration::from_secs(2))
            .with_command_timeout(Duration::from_millis(400))
            .with_heartbeat_interval(Duration::from_millis(500))
            .with_heartbeat_timeout(Duration::from_secs(3))
            .with_reconnection(
                ReconnectionPolicy::new()
                    .with_initial_delay(Duration::from_millis(50))
                    .with_max_delay(Duration::from_millis(200)),
            )
    }

    /// Waits for the next client connection.
    pub async fn accept(&mut self) -> MockConnection {
        tokio::time::timeout(WAIT, self.connections.recv())
            .await
            .expect("no connection within the wait window")
            .expect("accept loop stopped")
    }
}

impl Drop for MockMachine {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// One server-side WebSocket.
pub struct MockConnection {
    outbound: mpsc::UnboundedSender<Message>,
    inbound: mpsc::UnboundedReceiver<String>,
    task: JoinHandle<()>,
}

impl MockConnection {
    fn spawn(ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Self {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let (in_tx, inbound) = mpsc::unbounded_channel();
        let (mut sink, mut stream) = ws.split();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = out_rx.recv() => match message {
                        Some(message) => {
                            if sink.send(message).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    frame = stream.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            let _ = in_tx.send(text);
                        }
                        Some(Ok(_)) => {}
                        _ => break,
                    },
                }
            }
        });

        Self {
            outbound: out_tx,
            inbound,
            task,
        }
    }

    /// Sends a raw text frame to the bridge.
    pub fn send_text(&self, text: &str) {
        self.outbound
            .send(Message::Text(text.to_string()))
            .expect("connection task stopped");
    }

    /// Sends a raw binary frame to the bridge.
    pub fn send_binary(&self, bytes: &[u8]) {
        self.outbound
            .send(Message::Binary(bytes.to_vec()))
            .expect("connection task stopped");
    }

    /// Sends a JSON frame to the bridge.
    pub fn send(&self, frame: &Value) {
        self.send_text(&frame.to_string());
    }

    /// Sends an `evt:status` frame with the given fields.
    pub fn status(&self, fields: Value) {
        let mut frame = fields;
        frame["tp"] = json!("evt:status");
        self.send(&frame);
    }

    /// Waits for the next frame from the bridge, parsed as JSON.
    ///
    /// Returns `None` once the bridge closed the connection.
    pub async fn next_frame(&mut self) -> Option<Value> {
        let text = tokio::time::timeout(WAIT, self.inbound.recv())
            .await
            .expect("no frame within the wait window")?;
        Some(serde_json::from_str(&text).expect("bridge sent invalid JSON"))
    }

    /// Waits for a request of type `tp`, skipping others.
    pub async fn expect_request(&mut self, tp: &str) -> Value {
        loop {
            let frame = self
                .next_frame()
                .await
                .unwrap_or_else(|| panic!("connection closed while waiting for {tp}"));
            if frame["tp"] == tp {
                return frame;
            }
        }
    }

    /// Acknowledges `request`.
    pub fn ack(&self, request: &Value) {
        self.send(&json!({ "tp": response_type(request), "rid": request["rid"] }));
    }

    /// Rejects `request` with `reason`.
    pub fn nack(&self, request: &Value, reason: &str) {
        self.send(&json!({
            "tp": response_type(request),
            "rid": request["rid"],
            "error": reason,
        }));
    }

    /// Answers the diagnostics request sent on connect.
    pub async fn answer_ota_settings(&mut self, body: Value) {
        let request = self.expect_request("req:ota-settings").await;
        let mut frame = body;
        frame["tp"] = json!("res:ota-settings");
        frame["rid"] = request["rid"].clone();
        self.send(&frame);
    }

    /// Answers the profile list request sent on connect.
    pub async fn answer_profiles(&mut self, profiles: Value) {
        let request = self.expect_request("req:profiles:list").await;
        self.send(&json!({
            "tp": "res:profiles:list",
            "rid": request["rid"],
            "profiles": profiles,
        }));
    }

    /// Kills the TCP connection without a close handshake.
    pub fn drop_link(self) {
        self.task.abort();
    }

    /// Returns `true` once the bridge side has gone away.
    pub async fn closed_by_bridge(&mut self) -> bool {
        loop {
            match tokio::time::timeout(WAIT, self.inbound.recv()).await {
                Ok(Some(_)) => {}
                Ok(None) => return true,
                Err(_) => return false,
            }
        }
    }
}

fn response_type(request: &Value) -> String {
    let tp = request["tp"].as_str().unwrap_or_default();
    format!("res:{}", tp.trim_start_matches("req:"))
}

/// Polls `condition` until it holds or the wait window passes.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

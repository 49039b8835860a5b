// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WebSocket link to a GaggiMate machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::ProtocolError;

use super::{Endpoint, FrameSink, InboundFrame, duration_ms};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a link went down. Delivered once per link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDown {
    /// Human-readable cause.
    pub reason: String,
}

/// Shared between both halves of a link so link-down fires once.
#[derive(Debug)]
struct LinkMonitor {
    closed: AtomicBool,
    down: parking_lot::Mutex<Option<oneshot::Sender<LinkDown>>>,
}

impl LinkMonitor {
    fn new(down: oneshot::Sender<LinkDown>) -> Self {
        Self {
            closed: AtomicBool::new(false),
            down: parking_lot::Mutex::new(Some(down)),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Marks the link closed and fires the link-down signal if not yet fired.
    fn signal(&self, reason: impl Into<String>) {
        self.closed.store(true, Ordering::Release);
        if let Some(tx) = self.down.lock().take() {
            let reason = reason.into();
            tracing::debug!(%reason, "link down");
            // The supervisor may already have stopped listening
            let _ = tx.send(LinkDown { reason });
        }
    }
}

/// Opens WebSocket links to a machine.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    connect_timeout: Duration,
}

impl WebSocketTransport {
    /// Creates a transport whose connection attempts give up after
    /// `connect_timeout`.
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Opens one link.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` for an unusable endpoint,
    /// `ProtocolError::ConnectTimeout` if the handshake does not finish in
    /// time, and `ProtocolError::ConnectFailed` for any other failure.
    pub async fn open(&self, endpoint: &Endpoint) -> Result<Link, ProtocolError> {
        endpoint.validate()?;
        let url = endpoint.url();
        tracing::debug!(%url, "opening websocket");

        let (stream, _response) =
            match tokio::time::timeout(self.connect_timeout, connect_async(url.as_str())).await {
                Ok(Ok(connected)) => connected,
                Ok(Err(e)) => return Err(ProtocolError::ConnectFailed(e.to_string())),
                Err(_) => {
                    return Err(ProtocolError::ConnectTimeout(duration_ms(
                        self.connect_timeout,
                    )));
                }
            };

        let (sink, stream) = stream.split();
        let (down_tx, down_rx) = oneshot::channel();
        let monitor = Arc::new(LinkMonitor::new(down_tx));

        Ok(Link {
            writer: LinkWriter {
                sink: Arc::new(Mutex::new(sink)),
                monitor: Arc::clone(&monitor),
            },
            reader: LinkReader { stream, monitor },
            down: down_rx,
        })
    }
}

/// An open WebSocket link.
#[derive(Debug)]
pub struct Link {
    writer: LinkWriter,
    reader: LinkReader,
    down: oneshot::Receiver<LinkDown>,
}

impl Link {
    /// Splits the link into its writer, reader and link-down signal.
    #[must_use]
    pub fn into_parts(self) -> (LinkWriter, LinkReader, oneshot::Receiver<LinkDown>) {
        (self.writer, self.reader, self.down)
    }
}

/// Write half of a link. Cheap to clone; clones share the socket.
#[derive(Clone)]
pub struct LinkWriter {
    sink: Arc<Mutex<SplitSink<WsStream, Message>>>,
    monitor: Arc<LinkMonitor>,
}

impl LinkWriter {
    /// Returns `true` once the link has gone down or been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.monitor.is_closed()
    }

    async fn write(&self, message: Message) -> Result<(), ProtocolError> {
        if self.monitor.is_closed() {
            return Err(ProtocolError::LinkClosed);
        }
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(message).await {
            self.monitor.signal(format!("send failed: {e}"));
            return Err(ProtocolError::Send(e.to_string()));
        }
        Ok(())
    }

    /// Sends a text frame.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::LinkClosed` if the link is already down, or
    /// `ProtocolError::Send` if the write fails (which closes the link).
    pub async fn send_text(&self, text: String) -> Result<(), ProtocolError> {
        tracing::trace!(frame = %text, "sending frame");
        self.write(Message::Text(text)).await
    }

    /// Sends a WebSocket ping.
    ///
    /// # Errors
    ///
    /// Same as [`send_text`](Self::send_text).
    pub async fn ping(&self) -> Result<(), ProtocolError> {
        self.write(Message::Ping(Vec::new())).await
    }

    /// Closes the link. Idempotent.
    pub async fn close(&self) {
        if self.monitor.is_closed() {
            return;
        }
        self.monitor.signal("closed locally");
        let mut sink = self.sink.lock().await;
        // The peer may already be gone
        let _ = sink.close().await;
    }
}

impl FrameSink for LinkWriter {
    async fn send_frame(&self, frame: String) -> Result<(), ProtocolError> {
        self.send_text(frame).await
    }
}

impl std::fmt::Debug for LinkWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkWriter")
            .field("closed", &self.monitor.is_closed())
            .finish_non_exhaustive()
    }
}

/// Read half of a link.
pub struct LinkReader {
    stream: SplitStream<WsStream>,
    monitor: Arc<LinkMonitor>,
}

impl LinkReader {
    /// Receives the next frame.
    ///
    /// Pings and pongs surface as [`InboundFrame::Heartbeat`]; pongs to the
    /// machine's pings are answered by the WebSocket layer.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Receive` on a read failure, which closes the
    /// link.
    pub async fn receive(&mut self) -> Result<InboundFrame, ProtocolError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(InboundFrame::Text(text)),
                Some(Ok(Message::Binary(bytes))) => return Ok(InboundFrame::Binary(bytes)),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    return Ok(InboundFrame::Heartbeat);
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map_or_else(
                        || "closed by peer".to_string(),
                        |f| format!("closed by peer: {} {}", f.code, f.reason),
                    );
                    self.monitor.signal(reason);
                    return Ok(InboundFrame::Closed);
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    self.monitor.signal(format!("receive failed: {e}"));
                    return Err(ProtocolError::Receive(e.to_string()));
                }
                None => {
                    self.monitor.signal("stream ended");
                    return Ok(InboundFrame::Closed);
                }
            }
        }
    }
}

impl std::fmt::Debug for LinkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkReader")
            .field("closed", &self.monitor.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn echo_server() -> (u16, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Text(text) = message {
                    ws.send(Message::Text(text)).await.unwrap();
                }
            }
        });
        (port, handle)
    }

    fn endpoint(port: u16) -> Endpoint {
        Endpoint {
            host: "127.0.0.1".to_string(),
            port,
            path: "/ws".to_string(),
        }
    }

    #[test]
    fn link_down_fires_once() {
        let (tx, mut rx) = oneshot::channel();
        let monitor = LinkMonitor::new(tx);
        monitor.signal("first");
        monitor.signal("second");
        assert!(monitor.is_closed());
        assert_eq!(rx.try_recv().unwrap().reason, "first");
    }

    #[tokio::test]
    async fn send_and_receive_text() {
        let (port, _server) = echo_server().await;
        let transport = WebSocketTransport::new(Duration::from_secs(5));
        let (writer, mut reader, _down) = transport.open(&endpoint(port)).await.unwrap().into_parts();

        writer.send_text(r#"{"tp":"req:ota-settings"}"#.to_string()).await.unwrap();
        let frame = reader.receive().await.unwrap();
        assert_eq!(frame, InboundFrame::Text(r#"{"tp":"req:ota-settings"}"#.to_string()));
    }

    #[tokio::test]
    async fn binary_frames_are_not_coerced() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(Message::Binary(vec![0xff, 0xfe, 0x7b])).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let transport = WebSocketTransport::new(Duration::from_secs(5));
        let (_writer, mut reader, _down) = transport.open(&endpoint(port)).await.unwrap().into_parts();
        assert_eq!(
            reader.receive().await.unwrap(),
            InboundFrame::Binary(vec![0xff, 0xfe, 0x7b])
        );
    }

    #[tokio::test]
    async fn close_signals_link_down_and_rejects_sends() {
        let (port, _server) = echo_server().await;
        let transport = WebSocketTransport::new(Duration::from_secs(5));
        let (writer, _reader, down) = transport.open(&endpoint(port)).await.unwrap().into_parts();

        writer.close().await;
        assert!(writer.is_closed());
        assert_eq!(down.await.unwrap().reason, "closed locally");
        assert!(matches!(
            writer.send_text("{}".to_string()).await,
            Err(ProtocolError::LinkClosed)
        ));
    }

    #[tokio::test]
    async fn connect_refused() {
        // Bind then drop to get a port with no listener.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = WebSocketTransport::new(Duration::from_secs(5));
        let result = transport.open(&endpoint(port)).await;
        assert!(matches!(result, Err(ProtocolError::ConnectFailed(_))));
    }

    #[tokio::test]
    async fn invalid_endpoint() {
        let transport = WebSocketTransport::new(Duration::from_secs(1));
        let result = transport.open(&Endpoint::new("")).await;
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }
}

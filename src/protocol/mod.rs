// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport to GaggiMate machines.
//!
//! A GaggiMate controller serves a WebSocket at `ws://<host>:<port>/ws`. The
//! [`WebSocketTransport`] opens one [`Link`] per connection attempt; the link
//! never reconnects by itself. Reconnection is the supervisor's job.
//!
//! # Link Lifecycle
//!
//! A link splits into a [`LinkWriter`] (cloneable, used by the dispatcher and
//! the heartbeat), a [`LinkReader`] (owned by the read loop), and a one-shot
//! [`LinkDown`] signal. Any I/O failure on either half closes the link and
//! fires the signal exactly once.

mod websocket;

pub use websocket::{Link, LinkDown, LinkReader, LinkWriter, WebSocketTransport};

use std::fmt;
use std::time::Duration;

use crate::error::ProtocolError;

/// Default TCP port of the GaggiMate web server.
pub const DEFAULT_PORT: u16 = 80;

/// Default WebSocket path.
pub const DEFAULT_PATH: &str = "/ws";

/// Network location of a machine's WebSocket.
///
/// # Examples
///
/// ```
/// use gaggimate_bridge::protocol::Endpoint;
///
/// let endpoint = Endpoint::new("192.168.1.60");
/// assert_eq!(endpoint.url(), "ws://192.168.1.60:80/ws");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Request path.
    pub path: String,
}

impl Endpoint {
    /// Creates an endpoint with the default port and path.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
        }
    }

    /// Returns the WebSocket URL.
    #[must_use]
    pub fn url(&self) -> String {
        let separator = if self.path.starts_with('/') { "" } else { "/" };
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("ws://[{}]:{}{separator}{}", self.host, self.port, self.path)
        } else {
            format!("ws://{}:{}{separator}{}", self.host, self.port, self.path)
        }
    }

    /// Checks that the endpoint can be dialed.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` for an empty host or a host
    /// containing whitespace or a URL scheme.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ProtocolError::InvalidAddress("empty host".to_string()));
        }
        if host.contains("://") || host.chars().any(char::is_whitespace) {
            return Err(ProtocolError::InvalidAddress(self.host.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// One frame received from a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A text frame carrying JSON.
    Text(String),
    /// A binary frame, passed on undecoded.
    Binary(Vec<u8>),
    /// A WebSocket ping or pong.
    Heartbeat,
    /// The peer closed the link.
    Closed,
}

/// Something that can carry outbound text frames to a machine.
///
/// Implemented by [`LinkWriter`]. The command dispatcher is generic over this
/// trait so it can run without a network.
#[allow(async_fn_in_trait)]
pub trait FrameSink {
    /// Sends one text frame.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the frame cannot be written. The link is
    /// closed afterwards.
    async fn send_frame(&self, frame: String) -> Result<(), ProtocolError>;
}

/// Converts a duration to whole milliseconds for error reporting.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

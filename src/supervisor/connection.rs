// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle state of the link to the machine.
///
/// ```text
/// Disconnected --start--> Connecting --success--> Connected
///      ^                     |    ^                  |
///      |                  failure |            link down / silence
///    close                   v    |                  v
///      +--------------- Reconnecting <---------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No link and no attempt in progress.
    Disconnected,
    /// Opening the link.
    Connecting,
    /// Link is up.
    Connected,
    /// Waiting out the backoff before the next attempt.
    Reconnecting,
}

impl ConnectionState {
    /// Returns `true` if the link is up.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Snapshot of the connection published by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Last link or connect error, kept until the next successful connect.
    pub last_error: Option<String>,
    /// Failed attempts since the last successful connect.
    pub retry_count: u32,
    /// When the next attempt starts, while reconnecting.
    pub next_retry_at: Option<DateTime<Utc>>,
    /// When the current link came up.
    pub connected_since: Option<DateTime<Utc>>,
}

impl ConnectionStatus {
    /// Status of a bridge that has not started.
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_error: None,
            retry_count: 0,
            next_retry_at: None,
            connected_since: None,
        }
    }

    /// Returns `true` if the link is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::disconnected()
    }
}

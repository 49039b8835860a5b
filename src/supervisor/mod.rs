// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection supervision.
//!
//! The supervisor keeps one WebSocket link to the machine alive:
//!
//! - opens the link, bounded by the connect timeout
//! - pings every heartbeat interval and drops the link after a silent window
//! - on link loss fails in-flight commands, marks the store unavailable and
//!   retries with exponential backoff, forever
//!
//! Its progress is published as [`ConnectionStatus`] snapshots.

mod config;
mod connection;
mod runner;

pub use config::{
    Backoff, BridgeConfig, DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_EVENT_CAPACITY, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_HEARTBEAT_TIMEOUT,
    ReconnectionPolicy,
};
pub use connection::{ConnectionState, ConnectionStatus};

pub(crate) use runner::Supervisor;

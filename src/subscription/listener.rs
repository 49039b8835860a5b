// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Task feeding bus events into a callback registry.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::event::BridgeEvent;

use super::CallbackRegistry;

/// Spawns a task that dispatches every event from `events` to `registry`.
///
/// The task ends when the bus is dropped. If callbacks fall behind, the
/// skipped events are logged and delivery resumes with the oldest retained
/// event.
pub(crate) fn spawn_listener(
    registry: Arc<CallbackRegistry>,
    mut events: broadcast::Receiver<BridgeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => registry.dispatch(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "callbacks lagging; events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("callback listener stopped");
    })
}

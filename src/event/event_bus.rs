// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded fan-out of bridge notifications.

use tokio::sync::broadcast;

use super::BridgeEvent;
use crate::state::StateChange;
use crate::supervisor::DEFAULT_EVENT_CAPACITY;

/// Broadcast channel carrying [`BridgeEvent`]s from the store and the
/// supervisor to hosts.
///
/// Publishing never waits. A receiver that falls `capacity` events behind
/// sees `RecvError::Lagged` and resumes from the oldest retained event.
///
/// # Examples
///
/// ```
/// use gaggimate_bridge::event::{BridgeEvent, EventBus};
///
/// let bus = EventBus::with_capacity(16);
/// let mut rx = bus.subscribe();
///
/// bus.publish(BridgeEvent::AvailabilityChanged(true));
/// assert_eq!(rx.try_recv().unwrap(), BridgeEvent::AvailabilityChanged(true));
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Creates a bus holding up to the default number of undelivered events.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates a bus holding up to `capacity` undelivered events (at least 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    /// Publishes `event`. Dropped silently when nobody listens.
    pub fn publish(&self, event: BridgeEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("event dropped, no receivers");
        }
    }

    /// Publishes one [`BridgeEvent::StateChanged`] per change, in order.
    pub fn publish_changes(&self, changes: &[StateChange]) {
        for change in changes {
            self.publish(BridgeEvent::StateChanged(change.clone()));
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

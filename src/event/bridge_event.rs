// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge event types.

use serde::Serialize;

use crate::entity::EntityId;
use crate::state::StateChange;
use crate::supervisor::ConnectionStatus;

/// Events emitted by a bridge.
///
/// # Examples
///
/// ```
/// use gaggimate_bridge::entity::{EntityId, EntityValue};
/// use gaggimate_bridge::event::BridgeEvent;
/// use gaggimate_bridge::state::StateChange;
///
/// let event = BridgeEvent::StateChanged(StateChange::new(
///     EntityId::PumpFlow,
///     Some(EntityValue::Number(2.1)),
/// ));
/// assert_eq!(event.entity(), Some(EntityId::PumpFlow));
///
/// let offline = BridgeEvent::AvailabilityChanged(false);
/// assert_eq!(offline.entity(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// An entity's value changed.
    StateChanged(StateChange),

    /// The machine became available or unavailable.
    AvailabilityChanged(bool),

    /// The connection lifecycle moved.
    ConnectionChanged(ConnectionStatus),

    /// The profile catalogue changed. Carries the new labels in order.
    ProfilesChanged(Vec<String>),
}

impl BridgeEvent {
    /// Returns the entity this event concerns, if any.
    #[must_use]
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::StateChanged(change) => Some(change.entity),
            _ => None,
        }
    }

    /// Returns `true` for connection lifecycle events.
    #[must_use]
    pub fn is_connection_event(&self) -> bool {
        matches!(self, Self::ConnectionChanged(_))
    }
}

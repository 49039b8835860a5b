// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity-level change representation.

use serde::Serialize;

use crate::entity::{EntityId, EntityValue};
use crate::types::{MachineMode, MachineStatus};

/// A change of one entity's value.
///
/// Produced by [`StateStore::apply`](super::StateStore::apply) only when the
/// value actually differs from the previous one.
///
/// # Examples
///
/// ```
/// use gaggimate_bridge::entity::{EntityId, EntityValue};
/// use gaggimate_bridge::state::StateChange;
///
/// let change = StateChange::new(EntityId::CurrentTemperature, Some(EntityValue::Number(92.3)));
/// assert_eq!(change.entity, EntityId::CurrentTemperature);
/// assert!(change.mode().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateChange {
    /// The entity that changed.
    pub entity: EntityId,
    /// Its new value. `None` means the value became unknown.
    pub value: Option<EntityValue>,
}

impl StateChange {
    /// Creates a change.
    #[must_use]
    pub fn new(entity: EntityId, value: Option<EntityValue>) -> Self {
        Self { entity, value }
    }

    /// Returns the new mode if this is a change of the mode sensor.
    #[must_use]
    pub fn mode(&self) -> Option<MachineMode> {
        match (self.entity, &self.value) {
            (EntityId::Mode, Some(EntityValue::Mode(mode))) => Some(*mode),
            _ => None,
        }
    }

    /// Returns the new status if this is a change of the status sensor.
    #[must_use]
    pub fn status(&self) -> Option<MachineStatus> {
        match (self.entity, &self.value) {
            (EntityId::Status, Some(EntityValue::Status(status))) => Some(*status),
            _ => None,
        }
    }

    /// Returns the numeric value, if any.
    #[must_use]
    pub fn number(&self) -> Option<f32> {
        match self.value {
            Some(EntityValue::Number(n)) => Some(n),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors() {
        let mode = StateChange::new(EntityId::Mode, Some(EntityValue::Mode(MachineMode::Steam)));
        assert_eq!(mode.mode(), Some(MachineMode::Steam));
        assert_eq!(mode.status(), None);

        // The mode select carries the same value but is not the mode sensor.
        let select = StateChange::new(
            EntityId::ModeSelect,
            Some(EntityValue::Mode(MachineMode::Steam)),
        );
        assert_eq!(select.mode(), None);

        let status = StateChange::new(
            EntityId::Status,
            Some(EntityValue::Status(MachineStatus::Steaming)),
        );
        assert_eq!(status.status(), Some(MachineStatus::Steaming));

        let temp = StateChange::new(EntityId::CurrentTemperature, Some(EntityValue::Number(92.3)));
        assert_eq!(temp.number(), Some(92.3));
    }
}

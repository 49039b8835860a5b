// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The single source of truth for machine state.

use parking_lot::RwLock;

use crate::entity::{EntityId, EntityState, EntityValue};
use crate::event::{BridgeEvent, EventBus};
use crate::telemetry::InboundRecord;

use super::{DiagnosticState, MachineState, ProfileCatalog, StateChange};

#[derive(Debug, Default)]
struct StoreInner {
    machine: MachineState,
    diagnostics: DiagnosticState,
    profiles: ProfileCatalog,
    available: bool,
}

impl StoreInner {
    fn entity_values(&self) -> Vec<Option<EntityValue>> {
        EntityId::ALL
            .iter()
            .map(|id| id.value(&self.machine, &self.diagnostics))
            .collect()
    }
}

/// Holds machine, diagnostic and profile state and publishes changes.
///
/// The store is the only writer of this state. Every other component reads
/// snapshots. Notifications are published on the [`EventBus`] after the
/// write lock is released, one per entity whose value actually changed.
///
/// # Availability
///
/// The store starts unavailable. It becomes available at the first telemetry
/// frame and unavailable again on [`mark_unavailable`](Self::mark_unavailable).
/// Values are retained while unavailable.
#[derive(Debug)]
pub struct StateStore {
    inner: RwLock<StoreInner>,
    events: EventBus,
}

impl StateStore {
    /// Creates an empty, unavailable store publishing to `events`.
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            events,
        }
    }

    /// Applies a decoded record and returns the entity changes it caused.
    ///
    /// Records that carry no state (acks, heartbeats) change nothing.
    pub fn apply(&self, record: &InboundRecord) -> Vec<StateChange> {
        let mut became_available = false;
        let mut new_profiles = None;

        let changes = {
            let mut inner = self.inner.write();
            let before = inner.entity_values();
            match record {
                InboundRecord::Telemetry(update) => {
                    inner.machine.merge(update);
                    became_available = !inner.available;
                    inner.available = true;
                }
                InboundRecord::Diagnostic(update) => inner.diagnostics.merge(update),
                InboundRecord::Profiles(entries) => {
                    if inner.profiles.replace(entries) {
                        new_profiles = Some(inner.profiles.labels());
                    }
                }
                InboundRecord::Ack(_) | InboundRecord::Nack { .. } => {
                    return Vec::new();
                }
            }
            let after = inner.entity_values();

            EntityId::ALL
                .iter()
                .zip(before.into_iter().zip(after))
                .filter(|(_, (old, new))| old != new)
                .map(|(id, (_, new))| StateChange::new(*id, new))
                .collect::<Vec<_>>()
        };

        if became_available {
            tracing::info!("machine available");
            self.events.publish(BridgeEvent::AvailabilityChanged(true));
        }
        for change in &changes {
            tracing::debug!(entity = %change.entity, value = ?change.value, "entity changed");
        }
        self.events.publish_changes(&changes);
        if let Some(labels) = new_profiles {
            tracing::debug!(count = labels.len(), "profile catalogue updated");
            self.events.publish(BridgeEvent::ProfilesChanged(labels));
        }
        changes
    }

    /// Marks every entity unavailable, keeping values.
    ///
    /// Returns `true` if the store was available before.
    pub fn mark_unavailable(&self) -> bool {
        let was_available = std::mem::replace(&mut self.inner.write().available, false);
        if was_available {
            tracing::info!("machine unavailable");
            self.events.publish(BridgeEvent::AvailabilityChanged(false));
        }
        was_available
    }

    /// Returns `true` while the machine is reporting telemetry.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.inner.read().available
    }

    /// Returns a snapshot of the machine state.
    #[must_use]
    pub fn machine(&self) -> MachineState {
        self.inner.read().machine.clone()
    }

    /// Returns a snapshot of the diagnostic state.
    #[must_use]
    pub fn diagnostics(&self) -> DiagnosticState {
        self.inner.read().diagnostics.clone()
    }

    /// Returns a snapshot of the profile catalogue.
    #[must_use]
    pub fn profiles(&self) -> ProfileCatalog {
        self.inner.read().profiles.clone()
    }

    /// Returns one entity as the host sees it.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> EntityState {
        let inner = self.inner.read();
        EntityState {
            id,
            available: inner.available,
            value: id.value(&inner.machine, &inner.diagnostics),
        }
    }

    /// Returns every entity as the host sees it.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityState> {
        let inner = self.inner.read();
        EntityId::ALL
            .iter()
            .map(|id| EntityState {
                id: *id,
                available: inner.available,
                value: id.value(&inner.machine, &inner.diagnostics),
            })
            .collect()
    }
}

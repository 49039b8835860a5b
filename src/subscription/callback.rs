// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for bridge subscriptions.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry that stores callbacks and dispatches events

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::entity::{EntityId, EntityValue};
use crate::event::BridgeEvent;
use crate::state::StateChange;
use crate::supervisor::ConnectionStatus;
use crate::types::{MachineMode, MachineStatus};

/// Unique identifier for a subscription.
///
/// Returned when registering a callback; pass it to `unsubscribe` to remove
/// the callback. Ids are unique within a bridge's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type StateChangedCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;
type EntityCallback = Arc<dyn Fn(Option<&EntityValue>) + Send + Sync>;
type AvailabilityCallback = Arc<dyn Fn(bool) + Send + Sync>;
type ConnectionCallback = Arc<dyn Fn(&ConnectionStatus) + Send + Sync>;
type ModeCallback = Arc<dyn Fn(MachineMode) + Send + Sync>;
type StatusCallback = Arc<dyn Fn(MachineStatus) + Send + Sync>;
type ProfilesCallback = Arc<dyn Fn(&[String]) + Send + Sync>;

/// Registry of subscription callbacks.
///
/// Uses `parking_lot::RwLock` maps, one per event kind. Callbacks are
/// invoked synchronously from [`dispatch`](Self::dispatch) while a read lock
/// is held, so a callback must not register or unregister callbacks on the
/// same registry.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    state_changed_callbacks: RwLock<HashMap<SubscriptionId, StateChangedCallback>>,
    entity_callbacks: RwLock<HashMap<SubscriptionId, (EntityId, EntityCallback)>>,
    availability_callbacks: RwLock<HashMap<SubscriptionId, AvailabilityCallback>>,
    connection_callbacks: RwLock<HashMap<SubscriptionId, ConnectionCallback>>,
    mode_callbacks: RwLock<HashMap<SubscriptionId, ModeCallback>>,
    status_callbacks: RwLock<HashMap<SubscriptionId, StatusCallback>>,
    profiles_callbacks: RwLock<HashMap<SubscriptionId, ProfilesCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state_changed_callbacks: RwLock::new(HashMap::new()),
            entity_callbacks: RwLock::new(HashMap::new()),
            availability_callbacks: RwLock::new(HashMap::new()),
            connection_callbacks: RwLock::new(HashMap::new()),
            mode_callbacks: RwLock::new(HashMap::new()),
            status_callbacks: RwLock::new(HashMap::new()),
            profiles_callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback for every entity change.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for changes of one entity.
    ///
    /// The callback receives the new value, or `None` when it became unknown.
    pub fn on_entity_changed<F>(&self, entity: EntityId, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&EntityValue>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.entity_callbacks
            .write()
            .insert(id, (entity, Arc::new(callback)));
        id
    }

    /// Registers a callback for availability changes.
    pub fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.availability_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for connection lifecycle changes.
    pub fn on_connection_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ConnectionStatus) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.connection_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for mode changes.
    pub fn on_mode_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(MachineMode) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.mode_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for status changes.
    pub fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(MachineStatus) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.status_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for profile catalogue changes.
    pub fn on_profiles_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.profiles_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state_changed_callbacks.write().remove(&id).is_some()
            || self.entity_callbacks.write().remove(&id).is_some()
            || self.availability_callbacks.write().remove(&id).is_some()
            || self.connection_callbacks.write().remove(&id).is_some()
            || self.mode_callbacks.write().remove(&id).is_some()
            || self.status_callbacks.write().remove(&id).is_some()
            || self.profiles_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.state_changed_callbacks.write().clear();
        self.entity_callbacks.write().clear();
        self.availability_callbacks.write().clear();
        self.connection_callbacks.write().clear();
        self.mode_callbacks.write().clear();
        self.status_callbacks.write().clear();
        self.profiles_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Delivers an event to every matching callback.
    pub fn dispatch(&self, event: &BridgeEvent) {
        match event {
            BridgeEvent::StateChanged(change) => self.dispatch_change(change),
            BridgeEvent::AvailabilityChanged(available) => {
                for callback in self.availability_callbacks.read().values() {
                    callback(*available);
                }
            }
            BridgeEvent::ConnectionChanged(status) => {
                for callback in self.connection_callbacks.read().values() {
                    callback(status);
                }
            }
            BridgeEvent::ProfilesChanged(labels) => {
                for callback in self.profiles_callbacks.read().values() {
                    callback(labels);
                }
            }
        }
    }

    fn dispatch_change(&self, change: &StateChange) {
        for callback in self.state_changed_callbacks.read().values() {
            callback(change);
        }

        for (entity, callback) in self.entity_callbacks.read().values() {
            if *entity == change.entity {
                callback(change.value.as_ref());
            }
        }

        if let Some(mode) = change.mode() {
            for callback in self.mode_callbacks.read().values() {
                callback(mode);
            }
        }
        if let Some(status) = change.status() {
            for callback in self.status_callbacks.read().values() {
                callback(status);
            }
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.state_changed_callbacks.read().len()
            + self.entity_callbacks.read().len()
            + self.availability_callbacks.read().len()
            + self.connection_callbacks.read().len()
            + self.mode_callbacks.read().len()
            + self.status_callbacks.read().len()
            + self.profiles_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

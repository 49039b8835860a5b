// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that deliver bridge events to callbacks.

use crate::entity::{EntityId, EntityValue};
use crate::state::StateChange;
use crate::subscription::SubscriptionId;
use crate::supervisor::ConnectionStatus;
use crate::types::{MachineMode, MachineStatus};

/// Trait for types that support event subscriptions.
///
/// Callbacks run on the bridge's listener task, in publication order. A
/// callback that blocks delays later callbacks but never frame ingestion.
///
/// # Examples
///
/// ```no_run
/// use gaggimate_bridge::Bridge;
/// use gaggimate_bridge::entity::EntityId;
/// use gaggimate_bridge::subscription::Subscribable;
/// use gaggimate_bridge::supervisor::BridgeConfig;
///
/// # async fn example() -> gaggimate_bridge::Result<()> {
/// let bridge = Bridge::start(BridgeConfig::new("gaggimate.local"))?;
///
/// let sub_id = bridge.on_entity_changed(EntityId::CurrentTemperature, |value| {
///     println!("Boiler: {value:?}");
/// });
///
/// bridge.on_status_changed(|status| println!("Machine is {status}"));
///
/// bridge.unsubscribe(sub_id);
/// # Ok(())
/// # }
/// ```
pub trait Subscribable {
    /// Subscribes to every entity change.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static;

    /// Subscribes to changes of one entity.
    fn on_entity_changed<F>(&self, entity: EntityId, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&EntityValue>) + Send + Sync + 'static;

    /// Subscribes to availability changes.
    fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static;

    /// Subscribes to connection lifecycle changes.
    fn on_connection_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ConnectionStatus) + Send + Sync + 'static;

    /// Subscribes to operating mode changes.
    fn on_mode_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(MachineMode) + Send + Sync + 'static;

    /// Subscribes to derived status changes.
    fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(MachineStatus) + Send + Sync + 'static;

    /// Subscribes to profile catalogue changes.
    fn on_profiles_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[String]) + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for bridge notifications.
//!
//! The state store and the connection supervisor publish [`BridgeEvent`]s on
//! an [`EventBus`]. Hosts can consume the bus directly, or register callbacks
//! through [`Subscribable`](crate::subscription::Subscribable).
//!
//! # Examples
//!
//! ```
//! use gaggimate_bridge::event::{BridgeEvent, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(BridgeEvent::ProfilesChanged(vec!["Classic".to_string()]));
//! assert!(matches!(rx.try_recv(), Ok(BridgeEvent::ProfilesChanged(_))));
//! ```

mod bridge_event;
mod event_bus;

pub use bridge_event::BridgeEvent;
pub use event_bus::EventBus;

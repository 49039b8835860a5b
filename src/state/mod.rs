// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Machine state management types.
//!
//! [`MachineState`] and [`DiagnosticState`] hold the last known values.
//! [`StateStore`] owns both, applies decoded records, and publishes one
//! [`StateChange`] per entity whose value changed.
//!
//! # Examples
//!
//! ```
//! use gaggimate_bridge::entity::EntityId;
//! use gaggimate_bridge::event::EventBus;
//! use gaggimate_bridge::state::StateStore;
//! use gaggimate_bridge::telemetry::decode;
//!
//! let store = StateStore::new(EventBus::new());
//! for record in decode(r#"{"tp":"evt:status","ct":92.3,"tt":93.0}"#).unwrap() {
//!     store.apply(&record);
//! }
//!
//! // Applying the same frame again changes nothing.
//! for record in decode(r#"{"tp":"evt:status","ct":92.3,"tt":93.0}"#).unwrap() {
//!     assert!(store.apply(&record).is_empty());
//! }
//!
//! assert!(store.entity(EntityId::CurrentTemperature).available);
//! ```

mod diagnostic_state;
mod machine_state;
mod profiles;
mod state_change;
mod store;

pub use diagnostic_state::DiagnosticState;
pub use machine_state::MachineState;
pub use profiles::ProfileCatalog;
pub use state_change::StateChange;
pub use store::StateStore;

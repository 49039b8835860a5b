// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `GaggiMate` Bridge - A Rust library connecting `GaggiMate` espresso machine
//! controllers to home automation hosts.
//!
//! A `GaggiMate` controller streams its state as JSON frames over a local
//! WebSocket and accepts commands on the same socket. This library keeps that
//! link alive, turns the frames into typed entities, and correlates commands
//! with their acknowledgments.
//!
//! # Supported Features
//!
//! - **Telemetry**: Boiler temperature and target, pressure, pump flow, mode,
//!   derived status, process phase, scale weight and shot progress
//! - **Diagnostics**: Hardware model, firmware versions, update availability
//! - **Control**: Mode, brew temperature, brew/steam/flush, profile selection
//! - **Resilience**: Heartbeat, liveness window, exponential reconnect backoff
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use gaggimate_bridge::{Bridge, BridgeConfig, MachineMode};
//!
//! #[tokio::main]
//! async fn main() -> gaggimate_bridge::Result<()> {
//!     let bridge = Bridge::start(BridgeConfig::new("gaggimate.local"))?;
//!     bridge.wait_until_available(Duration::from_secs(10)).await?;
//!
//!     let machine = bridge.machine();
//!     println!("{:?} at {:?} °C", machine.mode(), machine.current_temperature());
//!
//!     bridge.set_mode(MachineMode::Brew).await?;
//!     bridge.set_target_temperature(93.0).await?;
//!     bridge.start_brew().await?;
//!
//!     bridge.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Entity Subscriptions
//!
//! ```no_run
//! use gaggimate_bridge::{Bridge, BridgeConfig, EntityId, Subscribable};
//!
//! # async fn example() -> gaggimate_bridge::Result<()> {
//! let bridge = Bridge::start(BridgeConfig::new("192.168.1.60"))?;
//!
//! bridge.on_entity_changed(EntityId::CurrentPressure, |value| {
//!     println!("Pressure: {value:?}");
//! });
//! bridge.on_availability_changed(|available| {
//!     println!("Machine available: {available}");
//! });
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! The library logs through [`tracing`] and installs no subscriber.

mod bridge;
pub mod command;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod event;
pub mod protocol;
pub mod state;
pub mod subscription;
pub mod supervisor;
pub mod telemetry;
pub mod types;

pub use bridge::Bridge;
pub use command::{Command, CommandKind, CorrelationId, WireCommand};
pub use dispatcher::{CommandHandle, CommandOutcome};
pub use entity::{EntityId, EntityState, EntityValue, Platform};
pub use error::{CommandError, Error, ParseError, ProtocolError, Result, ValueError};
pub use event::{BridgeEvent, EventBus};
pub use state::{DiagnosticState, MachineState, StateChange};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use supervisor::{BridgeConfig, ConnectionState, ConnectionStatus, ReconnectionPolicy};
pub use types::{FirmwareVersion, MachineMode, MachineStatus, ScaleConnection, Setpoint};

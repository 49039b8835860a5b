// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for GaggiMate machine state and commands.
//!
//! # Types
//!
//! - [`MachineMode`] - Operating mode (Standby, Brew, Steam, Hot Water, Grind)
//! - [`MachineStatus`] - Status derived from mode and process
//! - [`ScaleConnection`] - Bluetooth scale pairing state
//! - [`Setpoint`] - Brew temperature setpoint (0-160 °C)
//! - [`FirmwareVersion`] - Firmware version with optional semver ordering

mod mode;
mod scale;
mod setpoint;
mod status;
mod version;

pub use mode::MachineMode;
pub use scale::ScaleConnection;
pub use setpoint::Setpoint;
pub use status::MachineStatus;
pub use version::FirmwareVersion;

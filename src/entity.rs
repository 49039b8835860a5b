// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-facing entity table.
//!
//! Every value the bridge exposes is an entity with a stable key. Keys match
//! the unique-id suffixes used by existing GaggiMate home-automation setups,
//! so entity registries keep working across bridge implementations.
//!
//! | Platform | Entities |
//! |----------|----------|
//! | Sensor | temperatures, pressures, flow, mode, status, phase, profile, scale, weights, firmware |
//! | Switch | `power` |
//! | Select | `mode_select`, `profile_select` |
//! | Number | `target_temperature_setpoint` |
//! | Button | `brew_start`, `brew_stop`, `steam_start`, `flush` |

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::command::CommandKind;
use crate::error::ValueError;
use crate::state::{DiagnosticState, MachineState};
use crate::types::{MachineMode, MachineStatus, ScaleConnection, Setpoint};

/// How a host platform should present an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Read-only value.
    Sensor,
    /// On/off control.
    Switch,
    /// Choice among options.
    Select,
    /// Numeric control.
    Number,
    /// Stateless action.
    Button,
}

/// Entity grouping for host UIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    /// Hardware and firmware details.
    Diagnostic,
}

/// Bounds of a number entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumberRange {
    /// Lowest accepted value.
    pub min: f32,
    /// Highest accepted value.
    pub max: f32,
    /// Step between values.
    pub step: f32,
}

/// Stable identifier of an exposed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum EntityId {
    CurrentTemperature,
    TargetTemperature,
    TargetTemperatureSetpoint,
    CurrentPressure,
    TargetPressure,
    PumpFlow,
    Mode,
    ModeSelect,
    Power,
    Status,
    ProcessPhase,
    SelectedProfile,
    ProfileSelect,
    ScaleConnectionStatus,
    CurrentWeight,
    TargetShotVolume,
    ShotVolumeProgress,
    HardwareModel,
    SoftwareDisplayVersion,
    SoftwareControllerVersion,
    LatestSoftwareVersion,
    DisplaySoftwareUpdate,
    ControllerSoftwareUpdate,
    BrewStart,
    BrewStop,
    SteamStart,
    Flush,
}

impl EntityId {
    /// Every entity, in notification order.
    ///
    /// Inputs come before values derived from them, so a mode change is
    /// reported before the status change it causes.
    pub const ALL: [Self; 27] = [
        Self::CurrentTemperature,
        Self::TargetTemperature,
        Self::TargetTemperatureSetpoint,
        Self::CurrentPressure,
        Self::TargetPressure,
        Self::PumpFlow,
        Self::Mode,
        Self::ModeSelect,
        Self::Power,
        Self::Status,
        Self::ProcessPhase,
        Self::SelectedProfile,
        Self::ProfileSelect,
        Self::ScaleConnectionStatus,
        Self::CurrentWeight,
        Self::TargetShotVolume,
        Self::ShotVolumeProgress,
        Self::HardwareModel,
        Self::SoftwareDisplayVersion,
        Self::SoftwareControllerVersion,
        Self::LatestSoftwareVersion,
        Self::DisplaySoftwareUpdate,
        Self::ControllerSoftwareUpdate,
        Self::BrewStart,
        Self::BrewStop,
        Self::SteamStart,
        Self::Flush,
    ];

    /// Returns the stable key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::CurrentTemperature => "current_temperature",
            Self::TargetTemperature => "target_temperature",
            Self::TargetTemperatureSetpoint => "target_temperature_setpoint",
            Self::CurrentPressure => "current_pressure",
            Self::TargetPressure => "target_pressure",
            Self::PumpFlow => "pump_flow",
            Self::Mode => "mode",
            Self::ModeSelect => "mode_select",
            Self::Power => "power",
            Self::Status => "status",
            Self::ProcessPhase => "process_phase",
            Self::SelectedProfile => "selected_profile",
            Self::ProfileSelect => "profile_select",
            Self::ScaleConnectionStatus => "scale_connection_status",
            Self::CurrentWeight => "current_weight",
            Self::TargetShotVolume => "target_shot_volume",
            Self::ShotVolumeProgress => "shot_volume_progress",
            Self::HardwareModel => "hardware_model",
            Self::SoftwareDisplayVersion => "software_display_version",
            Self::SoftwareControllerVersion => "software_controller_version",
            Self::LatestSoftwareVersion => "latest_software_version",
            Self::DisplaySoftwareUpdate => "display_software_update",
            Self::ControllerSoftwareUpdate => "controller_software_update",
            Self::BrewStart => "brew_start",
            Self::BrewStop => "brew_stop",
            Self::SteamStart => "steam_start",
            Self::Flush => "flush",
        }
    }

    /// Returns the display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CurrentTemperature => "Current Temperature",
            Self::TargetTemperature => "Target Temperature",
            Self::TargetTemperatureSetpoint => "Target Temperature Setpoint",
            Self::CurrentPressure => "Current Pressure",
            Self::TargetPressure => "Target Pressure",
            Self::PumpFlow => "Pump Flow",
            Self::Mode => "Mode",
            Self::ModeSelect => "Mode Select",
            Self::Power => "Power",
            Self::Status => "Status",
            Self::ProcessPhase => "Process Phase",
            Self::SelectedProfile => "Selected Profile",
            Self::ProfileSelect => "Profile",
            Self::ScaleConnectionStatus => "Scale Connection",
            Self::CurrentWeight => "Current Weight",
            Self::TargetShotVolume => "Target Shot Volume",
            Self::ShotVolumeProgress => "Shot Volume Progress",
            Self::HardwareModel => "Hardware Model",
            Self::SoftwareDisplayVersion => "Display Firmware Version",
            Self::SoftwareControllerVersion => "Controller Firmware Version",
            Self::LatestSoftwareVersion => "Latest Software Version",
            Self::DisplaySoftwareUpdate => "Display Update Available",
            Self::ControllerSoftwareUpdate => "Controller Update Available",
            Self::BrewStart => "Start Brew",
            Self::BrewStop => "Stop Brew",
            Self::SteamStart => "Start Steam",
            Self::Flush => "Flush",
        }
    }

    /// Returns the host platform.
    #[must_use]
    pub const fn platform(self) -> Platform {
        match self {
            Self::Power => Platform::Switch,
            Self::ModeSelect | Self::ProfileSelect => Platform::Select,
            Self::TargetTemperatureSetpoint => Platform::Number,
            Self::BrewStart | Self::BrewStop | Self::SteamStart | Self::Flush => Platform::Button,
            _ => Platform::Sensor,
        }
    }

    /// Returns the unit of measurement.
    #[must_use]
    pub const fn unit(self) -> Option<&'static str> {
        match self {
            Self::CurrentTemperature | Self::TargetTemperature | Self::TargetTemperatureSetpoint => {
                Some("°C")
            }
            Self::CurrentPressure | Self::TargetPressure => Some("bar"),
            Self::PumpFlow => Some("mL/s"),
            Self::CurrentWeight | Self::TargetShotVolume | Self::ShotVolumeProgress => Some("g"),
            _ => None,
        }
    }

    /// Returns the entity category.
    #[must_use]
    pub const fn category(self) -> Option<EntityCategory> {
        match self {
            Self::HardwareModel
            | Self::SoftwareDisplayVersion
            | Self::SoftwareControllerVersion
            | Self::LatestSoftwareVersion
            | Self::DisplaySoftwareUpdate
            | Self::ControllerSoftwareUpdate => Some(EntityCategory::Diagnostic),
            _ => None,
        }
    }

    /// Returns the bounds of a number entity.
    #[must_use]
    pub const fn number_range(self) -> Option<NumberRange> {
        match self {
            Self::TargetTemperatureSetpoint => Some(NumberRange {
                min: Setpoint::MIN_CELSIUS,
                max: Setpoint::MAX_CELSIUS,
                step: 1.0,
            }),
            _ => None,
        }
    }

    /// Returns the command a button entity issues.
    #[must_use]
    pub const fn press_command(self) -> Option<CommandKind> {
        match self {
            Self::BrewStart => Some(CommandKind::StartBrew),
            Self::BrewStop => Some(CommandKind::StopBrew),
            Self::SteamStart => Some(CommandKind::StartSteam),
            Self::Flush => Some(CommandKind::Flush),
            _ => None,
        }
    }

    /// Reads the entity's value from the machine and diagnostic state.
    ///
    /// Buttons have no value.
    #[must_use]
    pub fn value(self, machine: &MachineState, diagnostics: &DiagnosticState) -> Option<EntityValue> {
        use EntityValue::{Flag, Number, Text};

        match self {
            Self::CurrentTemperature => machine.current_temperature().map(Number),
            Self::TargetTemperature | Self::TargetTemperatureSetpoint => {
                machine.target_temperature().map(Number)
            }
            Self::CurrentPressure => machine.current_pressure().map(Number),
            Self::TargetPressure => machine.target_pressure().map(Number),
            Self::PumpFlow => machine.pump_flow().map(Number),
            Self::Mode | Self::ModeSelect => machine.mode().map(EntityValue::Mode),
            Self::Power => machine.mode().map(|m| Flag(m.is_powered())),
            Self::Status => machine.mode().map(|_| EntityValue::Status(machine.status())),
            Self::ProcessPhase => machine.process_phase().map(|p| Text(p.to_string())),
            Self::SelectedProfile | Self::ProfileSelect => {
                machine.selected_profile().map(|p| Text(p.to_string()))
            }
            Self::ScaleConnectionStatus => machine.scale().map(EntityValue::Scale),
            Self::CurrentWeight => machine.scale_weight().map(Number),
            Self::TargetShotVolume => machine.target_weight().map(Number),
            Self::ShotVolumeProgress => machine.shot_progress().map(Number),
            Self::HardwareModel => diagnostics.hardware().map(|h| Text(h.to_string())),
            Self::SoftwareDisplayVersion => {
                diagnostics.display_version().map(|v| Text(v.to_string()))
            }
            Self::SoftwareControllerVersion => {
                diagnostics.controller_version().map(|v| Text(v.to_string()))
            }
            Self::LatestSoftwareVersion => {
                diagnostics.latest_version().map(|v| Text(v.to_string()))
            }
            Self::DisplaySoftwareUpdate => diagnostics.display_update_available().map(Flag),
            Self::ControllerSoftwareUpdate => diagnostics.controller_update_available().map(Flag),
            Self::BrewStart | Self::BrewStop | Self::SteamStart | Self::Flush => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EntityId {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.key() == s)
            .ok_or_else(|| ValueError::UnknownEntity(s.to_string()))
    }
}

/// A typed entity value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityValue {
    /// Numeric reading in the entity's unit.
    Number(f32),
    /// Free text.
    Text(String),
    /// Boolean state.
    Flag(bool),
    /// Operating mode.
    Mode(MachineMode),
    /// Derived status.
    Status(MachineStatus),
    /// Scale pairing state.
    Scale(ScaleConnection),
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(t) => f.write_str(t),
            Self::Flag(true) => f.write_str("on"),
            Self::Flag(false) => f.write_str("off"),
            Self::Mode(m) => fmt::Display::fmt(m, f),
            Self::Status(s) => fmt::Display::fmt(s, f),
            Self::Scale(s) => fmt::Display::fmt(s, f),
        }
    }
}

/// Snapshot of one entity as the host sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    /// Which entity.
    pub id: EntityId,
    /// `false` while the machine link is down.
    pub available: bool,
    /// Last known value, kept while unavailable.
    pub value: Option<EntityValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryUpdate;

    #[test]
    fn keys_are_unique_and_parse_back() {
        for id in EntityId::ALL {
            assert_eq!(id.key().parse::<EntityId>(), Ok(id));
        }
        let mut keys: Vec<_> = EntityId::ALL.iter().map(|id| id.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), EntityId::ALL.len());
    }

    #[test]
    fn unknown_key() {
        assert!("boiler".parse::<EntityId>().is_err());
    }

    #[test]
    fn platforms() {
        assert_eq!(EntityId::Power.platform(), Platform::Switch);
        assert_eq!(EntityId::ProfileSelect.platform(), Platform::Select);
        assert_eq!(EntityId::Flush.platform(), Platform::Button);
        assert_eq!(EntityId::TargetTemperatureSetpoint.platform(), Platform::Number);
        assert_eq!(EntityId::PumpFlow.platform(), Platform::Sensor);
    }

    #[test]
    fn units_and_categories() {
        assert_eq!(EntityId::PumpFlow.unit(), Some("mL/s"));
        assert_eq!(EntityId::CurrentPressure.unit(), Some("bar"));
        assert_eq!(EntityId::Mode.unit(), None);
        assert_eq!(
            EntityId::LatestSoftwareVersion.category(),
            Some(EntityCategory::Diagnostic)
        );
        assert_eq!(EntityId::CurrentWeight.category(), None);
    }

    #[test]
    fn setpoint_range() {
        let range = EntityId::TargetTemperatureSetpoint.number_range().unwrap();
        assert_eq!((range.min, range.max, range.step), (0.0, 160.0, 1.0));
    }

    #[test]
    fn buttons_map_to_commands() {
        assert_eq!(EntityId::SteamStart.press_command(), Some(CommandKind::StartSteam));
        assert_eq!(EntityId::Mode.press_command(), None);
    }

    #[test]
    fn values_from_state() {
        let mut machine = MachineState::new();
        machine.merge(&TelemetryUpdate {
            target_temperature: Some(93.0),
            mode: Some(MachineMode::HotWater),
            ..TelemetryUpdate::default()
        });
        let diagnostics = DiagnosticState::new();

        assert_eq!(
            EntityId::TargetTemperatureSetpoint.value(&machine, &diagnostics),
            Some(EntityValue::Number(93.0))
        );
        assert_eq!(
            EntityId::Power.value(&machine, &diagnostics),
            Some(EntityValue::Flag(true))
        );
        assert_eq!(
            EntityId::Status.value(&machine, &diagnostics),
            Some(EntityValue::Status(MachineStatus::Idle))
        );
        assert_eq!(EntityId::Flush.value(&machine, &diagnostics), None);
        assert_eq!(EntityId::HardwareModel.value(&machine, &diagnostics), None);
    }

    #[test]
    fn value_display() {
        assert_eq!(EntityValue::Mode(MachineMode::HotWater).to_string(), "Hot Water");
        assert_eq!(EntityValue::Flag(false).to_string(), "off");
        assert_eq!(EntityValue::Number(92.5).to_string(), "92.5");
    }
}

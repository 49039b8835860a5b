// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operating mode of the espresso machine.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ValueError;

/// Operating mode reported in the `m` field of status frames.
///
/// The wire encoding is a small integer (0-4).
///
/// # Examples
///
/// ```
/// use gaggimate_bridge::types::MachineMode;
///
/// let mode = MachineMode::try_from(3).unwrap();
/// assert_eq!(mode, MachineMode::HotWater);
/// assert_eq!(mode.display_name(), "Hot Water");
/// assert_eq!(mode.code(), 3);
///
/// assert!(MachineMode::try_from(7).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineMode {
    /// Heater idle, no process possible.
    Standby,
    /// Brewing espresso.
    Brew,
    /// Steaming milk.
    Steam,
    /// Dispensing hot water.
    HotWater,
    /// Grinding beans.
    Grind,
}

impl MachineMode {
    /// All modes in wire-code order.
    pub const ALL: [Self; 5] = [
        Self::Standby,
        Self::Brew,
        Self::Steam,
        Self::HotWater,
        Self::Grind,
    ];

    /// Returns the wire code for this mode.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Standby => 0,
            Self::Brew => 1,
            Self::Steam => 2,
            Self::HotWater => 3,
            Self::Grind => 4,
        }
    }

    /// Returns the human-readable name shown by the mode sensor and select.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Standby => "Standby",
            Self::Brew => "Brew",
            Self::Steam => "Steam",
            Self::HotWater => "Hot Water",
            Self::Grind => "Grind",
        }
    }

    /// Returns the Material Design icon used for this mode.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Standby => "mdi:power-standby",
            Self::Brew => "mdi:coffee",
            Self::Steam => "mdi:cloud",
            Self::HotWater => "mdi:water",
            Self::Grind => "mdi:grain",
        }
    }

    /// Returns `true` unless the machine is in standby.
    #[must_use]
    pub const fn is_powered(self) -> bool {
        !matches!(self, Self::Standby)
    }
}

impl fmt::Display for MachineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl TryFrom<u8> for MachineMode {
    type Error = ValueError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.code() == code)
            .ok_or(ValueError::InvalidMode(code))
    }
}

impl FromStr for MachineMode {
    type Err = ValueError;

    /// Parses either the display name (`"Hot Water"`) or a compact form
    /// (`"hot_water"`, `"hotwater"`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "standby" => Ok(Self::Standby),
            "brew" => Ok(Self::Brew),
            "steam" => Ok(Self::Steam),
            "hotwater" | "water" => Ok(Self::HotWater),
            "grind" => Ok(Self::Grind),
            _ => Err(ValueError::UnknownModeName(s.to_string())),
        }
    }
}

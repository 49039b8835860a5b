// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-frame commands understood by the machine.

use serde_json::{Map, Value};

use crate::types::MachineMode;

use super::Command;

/// One outbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireCommand {
    /// Switch the operating mode.
    ChangeMode(MachineMode),
    /// Start the process of the current mode.
    ProcessActivate,
    /// Stop the running process.
    ProcessDeactivate,
    /// Run a group-head flush.
    FlushStart,
    /// Select a brew profile by id.
    SelectProfile(String),
    /// Ask for the profile catalogue.
    ListProfiles,
    /// Ask for firmware information.
    OtaSettings,
    /// Raise the target temperature by one degree.
    RaiseTemperature,
    /// Lower the target temperature by one degree.
    LowerTemperature,
}

impl Command for WireCommand {
    fn message_type(&self) -> &'static str {
        match self {
            Self::ChangeMode(_) => "req:change-mode",
            Self::ProcessActivate => "req:process:activate",
            Self::ProcessDeactivate => "req:process:deactivate",
            Self::FlushStart => "req:flush:start",
            Self::SelectProfile(_) => "req:profiles:select",
            Self::ListProfiles => "req:profiles:list",
            Self::OtaSettings => "req:ota-settings",
            Self::RaiseTemperature => "req:raise-temp",
            Self::LowerTemperature => "req:lower-temp",
        }
    }

    fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        match self {
            Self::ChangeMode(mode) => {
                fields.insert("mode".to_string(), Value::from(mode.code()));
            }
            Self::SelectProfile(id) => {
                fields.insert("id".to_string(), Value::String(id.clone()));
            }
            _ => {}
        }
        fields
    }
}

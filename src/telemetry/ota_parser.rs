// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for `res:ota-settings` firmware information frames.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;

use super::lenient_flag;

/// Firmware information reported by the machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticUpdate {
    /// Hardware model name.
    pub hardware: Option<String>,
    /// Installed display firmware version.
    pub display_version: Option<String>,
    /// Installed controller firmware version.
    pub controller_version: Option<String>,
    /// Latest released firmware version.
    pub latest_version: Option<String>,
    /// Update flag for the display as reported by the machine.
    pub display_update_available: Option<bool>,
    /// Update flag for the controller as reported by the machine.
    pub controller_update_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOtaSettings {
    hardware: Option<String>,
    display_version: Option<String>,
    controller_version: Option<String>,
    latest_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    display_update_available: Option<bool>,
    #[serde(default, deserialize_with = "lenient_flag")]
    controller_update_available: Option<bool>,
}

pub(crate) fn parse_ota_settings(frame: Value) -> Result<DiagnosticUpdate, ParseError> {
    let raw: RawOtaSettings = serde_json::from_value(frame)?;
    Ok(DiagnosticUpdate {
        hardware: raw.hardware,
        display_version: raw.display_version,
        controller_version: raw.controller_version,
        latest_version: raw.latest_version,
        display_update_available: raw.display_update_available,
        controller_update_available: raw.controller_update_available,
    })
}

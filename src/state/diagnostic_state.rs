// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hardware and firmware information.

use serde::Serialize;

use crate::telemetry::DiagnosticUpdate;
use crate::types::FirmwareVersion;

/// Firmware information of the machine.
///
/// Only `res:ota-settings` frames change this state, and it survives
/// reconnections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagnosticState {
    hardware: Option<String>,
    display_version: Option<FirmwareVersion>,
    controller_version: Option<FirmwareVersion>,
    latest_version: Option<FirmwareVersion>,
    reported_display_update: Option<bool>,
    reported_controller_update: Option<bool>,
}

impl DiagnosticState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a firmware information frame.
    pub fn merge(&mut self, update: &DiagnosticUpdate) {
        if let Some(hardware) = &update.hardware {
            self.hardware = Some(hardware.clone());
        }
        if let Some(v) = &update.display_version {
            self.display_version = Some(FirmwareVersion::new(v.as_str()));
        }
        if let Some(v) = &update.controller_version {
            self.controller_version = Some(FirmwareVersion::new(v.as_str()));
        }
        if let Some(v) = &update.latest_version {
            self.latest_version = Some(FirmwareVersion::new(v.as_str()));
        }
        if update.display_update_available.is_some() {
            self.reported_display_update = update.display_update_available;
        }
        if update.controller_update_available.is_some() {
            self.reported_controller_update = update.controller_update_available;
        }
    }

    /// Hardware model name.
    #[must_use]
    pub fn hardware(&self) -> Option<&str> {
        self.hardware.as_deref()
    }

    /// Installed display firmware.
    #[must_use]
    pub fn display_version(&self) -> Option<&FirmwareVersion> {
        self.display_version.as_ref()
    }

    /// Installed controller firmware.
    #[must_use]
    pub fn controller_version(&self) -> Option<&FirmwareVersion> {
        self.controller_version.as_ref()
    }

    /// Latest released firmware.
    #[must_use]
    pub fn latest_version(&self) -> Option<&FirmwareVersion> {
        self.latest_version.as_ref()
    }

    /// Whether a display firmware update is available.
    ///
    /// Computed by comparing the installed and latest versions. When either
    /// does not parse as a semantic version, the machine's own flag is used.
    #[must_use]
    pub fn display_update_available(&self) -> Option<bool> {
        update_available(
            self.display_version.as_ref(),
            self.latest_version.as_ref(),
            self.reported_display_update,
        )
    }

    /// Whether a controller firmware update is available.
    ///
    /// Same rules as [`display_update_available`](Self::display_update_available).
    #[must_use]
    pub fn controller_update_available(&self) -> Option<bool> {
        update_available(
            self.controller_version.as_ref(),
            self.latest_version.as_ref(),
            self.reported_controller_update,
        )
    }
}

fn update_available(
    installed: Option<&FirmwareVersion>,
    latest: Option<&FirmwareVersion>,
    reported: Option<bool>,
) -> Option<bool> {
    installed
        .zip(latest)
        .and_then(|(installed, latest)| installed.is_older_than(latest))
        .or(reported)
}

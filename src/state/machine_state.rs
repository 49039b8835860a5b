// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Live machine state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::telemetry::TelemetryUpdate;
use crate::types::{MachineMode, MachineStatus, ScaleConnection};

/// Last known telemetry of a GaggiMate machine.
///
/// All fields are optional because nothing is known until the machine
/// reports it. Values are kept across reconnections; staleness is signalled by
/// the store's availability flag, not by clearing values.
///
/// The [`status`](Self::status) is derived on every read and is never stored.
///
/// # Examples
///
/// ```
/// use gaggimate_bridge::state::MachineState;
/// use gaggimate_bridge::telemetry::TelemetryUpdate;
/// use gaggimate_bridge::types::{MachineMode, MachineStatus};
///
/// let mut state = MachineState::new();
/// state.merge(&TelemetryUpdate {
///     current_temperature: Some(92.3),
///     mode: Some(MachineMode::Brew),
///     ..TelemetryUpdate::default()
/// });
///
/// assert_eq!(state.current_temperature(), Some(92.3));
/// assert_eq!(state.status(), MachineStatus::Idle);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MachineState {
    current_temperature: Option<f32>,
    target_temperature: Option<f32>,
    current_pressure: Option<f32>,
    target_pressure: Option<f32>,
    pump_flow: Option<f32>,
    mode: Option<MachineMode>,
    process_phase: Option<String>,
    process_active: Option<bool>,
    selected_profile: Option<String>,
    target_weight: Option<f32>,
    shot_progress: Option<f32>,
    scale: Option<ScaleConnection>,
    scale_weight: Option<f32>,
    last_update: Option<DateTime<Utc>>,
}

impl MachineState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a telemetry update into the state.
    ///
    /// Fields absent from the update keep their value. The process fields are
    /// the exception: a frame that reports a mode but no `process` object means
    /// no process is running, so phase, active flag and progress are cleared.
    pub fn merge(&mut self, update: &TelemetryUpdate) {
        fn keep<T: Clone>(slot: &mut Option<T>, value: Option<&T>) {
            if let Some(value) = value {
                *slot = Some(value.clone());
            }
        }

        keep(&mut self.current_temperature, update.current_temperature.as_ref());
        keep(&mut self.target_temperature, update.target_temperature.as_ref());
        keep(&mut self.current_pressure, update.current_pressure.as_ref());
        keep(&mut self.target_pressure, update.target_pressure.as_ref());
        keep(&mut self.pump_flow, update.pump_flow.as_ref());
        keep(&mut self.mode, update.mode.as_ref());
        keep(&mut self.selected_profile, update.selected_profile.as_ref());
        keep(&mut self.target_weight, update.target_weight.as_ref());
        keep(&mut self.scale_weight, update.scale_weight.as_ref());
        if let Some(connected) = update.scale_connected {
            self.scale = Some(ScaleConnection::from(connected));
        }

        match &update.process {
            Some(process) => {
                self.process_active = process.active;
                self.process_phase.clone_from(&process.phase);
                self.shot_progress = process.progress;
            }
            None if update.mode.is_some() => {
                self.process_active = None;
                self.process_phase = None;
                self.shot_progress = None;
            }
            None => {}
        }

        self.last_update = Some(Utc::now());
    }

    /// Boiler temperature in °C.
    #[must_use]
    pub fn current_temperature(&self) -> Option<f32> {
        self.current_temperature
    }

    /// Target boiler temperature in °C.
    #[must_use]
    pub fn target_temperature(&self) -> Option<f32> {
        self.target_temperature
    }

    /// Brew pressure in bar.
    #[must_use]
    pub fn current_pressure(&self) -> Option<f32> {
        self.current_pressure
    }

    /// Target brew pressure in bar.
    #[must_use]
    pub fn target_pressure(&self) -> Option<f32> {
        self.target_pressure
    }

    /// Pump flow in mL/s.
    #[must_use]
    pub fn pump_flow(&self) -> Option<f32> {
        self.pump_flow
    }

    /// Operating mode.
    #[must_use]
    pub fn mode(&self) -> Option<MachineMode> {
        self.mode
    }

    /// Label of the running process phase.
    #[must_use]
    pub fn process_phase(&self) -> Option<&str> {
        self.process_phase.as_deref()
    }

    /// Explicit process active flag, when the machine reports one.
    #[must_use]
    pub fn process_active(&self) -> Option<bool> {
        self.process_active
    }

    /// Label of the selected brew profile.
    #[must_use]
    pub fn selected_profile(&self) -> Option<&str> {
        self.selected_profile.as_deref()
    }

    /// Target shot weight in grams.
    #[must_use]
    pub fn target_weight(&self) -> Option<f32> {
        self.target_weight
    }

    /// Shot weight progress in grams (volumetric shots only).
    #[must_use]
    pub fn shot_progress(&self) -> Option<f32> {
        self.shot_progress
    }

    /// Scale pairing state.
    #[must_use]
    pub fn scale(&self) -> Option<ScaleConnection> {
        self.scale
    }

    /// Weight on the scale in grams, absent unless a scale is connected.
    #[must_use]
    pub fn scale_weight(&self) -> Option<f32> {
        match self.scale {
            Some(ScaleConnection::Connected) => self.scale_weight,
            _ => None,
        }
    }

    /// When the last telemetry frame was merged.
    #[must_use]
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Derived machine status.
    #[must_use]
    pub fn status(&self) -> MachineStatus {
        MachineStatus::derive(self.mode, self.process_phase(), self.process_active)
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for `evt:status` telemetry frames.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::types::MachineMode;

use super::{lenient_flag, round_to};

/// Process target type for which shot weight progress is meaningful.
const VOLUMETRIC: &str = "volumetric";

/// Field values carried by one `evt:status` frame.
///
/// Every field is optional. A missing field means "no news" and the store
/// keeps the last known value. Numeric fields are already rounded to their
/// display precision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryUpdate {
    /// Boiler temperature in °C.
    pub current_temperature: Option<f32>,
    /// Target boiler temperature in °C.
    pub target_temperature: Option<f32>,
    /// Brew pressure in bar.
    pub current_pressure: Option<f32>,
    /// Target brew pressure in bar.
    pub target_pressure: Option<f32>,
    /// Pump flow in mL/s.
    pub pump_flow: Option<f32>,
    /// Operating mode.
    pub mode: Option<MachineMode>,
    /// Label of the selected brew profile.
    pub selected_profile: Option<String>,
    /// Whether a Bluetooth scale is connected.
    pub scale_connected: Option<bool>,
    /// Weight on the scale in grams.
    pub scale_weight: Option<f32>,
    /// Target shot weight in grams.
    pub target_weight: Option<f32>,
    /// Running process, if the frame reports one.
    pub process: Option<ProcessUpdate>,
}

/// The `process` object of a status frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessUpdate {
    /// Explicit active flag.
    pub active: Option<bool>,
    /// Free-text phase label (for example `"infusion"`).
    pub phase: Option<String>,
    /// Shot weight progress in grams. Only set for volumetric targets.
    pub progress: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    ct: Option<f64>,
    tt: Option<f64>,
    pr: Option<f64>,
    pt: Option<f64>,
    fl: Option<f64>,
    m: Option<u8>,
    p: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    bc: Option<bool>,
    cw: Option<f64>,
    tw: Option<f64>,
    process: Option<RawProcess>,
}

#[derive(Debug, Deserialize)]
struct RawProcess {
    #[serde(default, deserialize_with = "lenient_flag")]
    a: Option<bool>,
    l: Option<String>,
    s: Option<String>,
    tt: Option<String>,
    pp: Option<f64>,
}

/// Parses the body of an `evt:status` frame.
///
/// # Errors
///
/// Returns `ParseError::Json` if a field has the wrong JSON type, or
/// `ParseError::InvalidValue` if the mode code is outside 0-4.
pub(crate) fn parse_status(frame: Value) -> Result<TelemetryUpdate, ParseError> {
    let raw: RawStatus = serde_json::from_value(frame)?;

    let mode = raw
        .m
        .map(MachineMode::try_from)
        .transpose()
        .map_err(|e| ParseError::InvalidValue {
            field: "m".to_string(),
            message: e.to_string(),
        })?;

    let process = raw.process.map(|p| {
        let volumetric = p.tt.as_deref() == Some(VOLUMETRIC);
        ProcessUpdate {
            active: p.a,
            phase: p.l.or(p.s),
            progress: if volumetric { p.pp.map(|v| round_to(v, 1)) } else { None },
        }
    });

    Ok(TelemetryUpdate {
        current_temperature: raw.ct.map(|v| round_to(v, 1)),
        target_temperature: raw.tt.map(|v| round_to(v, 1)),
        current_pressure: raw.pr.map(|v| round_to(v, 2)),
        target_pressure: raw.pt.map(|v| round_to(v, 2)),
        pump_flow: raw.fl.map(|v| round_to(v, 1)),
        mode,
        selected_profile: raw.p,
        scale_connected: raw.bc,
        scale_weight: raw.cw.map(|v| round_to(v, 1)),
        target_weight: raw.tw.map(|v| round_to(v, 1)),
        process,
    })
}

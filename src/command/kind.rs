// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-level command intents and their expansion into wire frames.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::CommandError;
use crate::state::MachineState;
use crate::types::{MachineMode, Setpoint};

use super::{CorrelationId, WireCommand};

/// Gap between consecutive temperature steps.
pub const TEMPERATURE_STEP_SPACING: Duration = Duration::from_millis(50);

/// Gap between entering steam mode and activating the process.
pub const STEAM_ACTIVATE_SPACING: Duration = Duration::from_millis(100);

/// A command a host can issue.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Switch the operating mode.
    SetMode(MachineMode),
    /// Select a brew profile by id.
    SelectProfile(String),
    /// Move the brew temperature target.
    SetTargetTemperature(Setpoint),
    /// Start the process of the current mode.
    StartBrew,
    /// Stop the running process.
    StopBrew,
    /// Enter steam mode and start steaming.
    StartSteam,
    /// Run a group-head flush.
    Flush,
    /// Refresh the profile catalogue.
    RequestProfiles,
    /// Refresh firmware information.
    RequestDiagnostics,
}

/// The frames needed to carry out a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPlan {
    /// Send these frames in order. The last one carries the correlation id.
    Send(Vec<WireCommand>),
    /// The machine is already in the requested state.
    NoOp,
}

impl CommandKind {
    /// Returns a short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetMode(_) => "set_mode",
            Self::SelectProfile(_) => "select_profile",
            Self::SetTargetTemperature(_) => "set_target_temperature",
            Self::StartBrew => "start_brew",
            Self::StopBrew => "stop_brew",
            Self::StartSteam => "start_steam",
            Self::Flush => "flush",
            Self::RequestProfiles => "request_profiles",
            Self::RequestDiagnostics => "request_diagnostics",
        }
    }

    /// Returns how long to wait between consecutive frames of this command.
    ///
    /// The controller drops steps that arrive back to back.
    #[must_use]
    pub const fn frame_spacing(&self) -> Duration {
        match self {
            Self::SetTargetTemperature(_) => TEMPERATURE_STEP_SPACING,
            Self::StartSteam => STEAM_ACTIVATE_SPACING,
            _ => Duration::ZERO,
        }
    }

    /// Validates the command against `state` and expands it into frames.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Precondition` when a temperature change is
    /// requested before the machine has reported its current target.
    pub fn plan(&self, state: &MachineState) -> Result<CommandPlan, CommandError> {
        let frames = match self {
            Self::SetMode(mode) => vec![WireCommand::ChangeMode(*mode)],
            Self::SelectProfile(id) => vec![WireCommand::SelectProfile(id.clone())],
            Self::StartBrew => vec![WireCommand::ProcessActivate],
            Self::StopBrew => {
                if !state.status().is_busy() {
                    return Ok(CommandPlan::NoOp);
                }
                vec![WireCommand::ProcessDeactivate]
            }
            Self::StartSteam => vec![
                WireCommand::ChangeMode(MachineMode::Steam),
                WireCommand::ProcessActivate,
            ],
            Self::Flush => vec![WireCommand::FlushStart],
            Self::RequestProfiles => vec![WireCommand::ListProfiles],
            Self::RequestDiagnostics => vec![WireCommand::OtaSettings],
            Self::SetTargetTemperature(setpoint) => {
                let current = state.target_temperature().ok_or_else(|| {
                    CommandError::Precondition(
                        "current target temperature is not known yet".to_string(),
                    )
                })?;
                let steps = setpoint.steps_from(current);
                let step = if steps > 0 {
                    WireCommand::RaiseTemperature
                } else {
                    WireCommand::LowerTemperature
                };
                let count = usize::try_from(steps.unsigned_abs()).unwrap_or(0);
                if count == 0 {
                    return Ok(CommandPlan::NoOp);
                }
                vec![step; count]
            }
        };
        Ok(CommandPlan::Send(frames))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetMode(mode) => write!(f, "set_mode({mode})"),
            Self::SelectProfile(id) => write!(f, "select_profile({id})"),
            Self::SetTargetTemperature(sp) => write!(f, "set_target_temperature({sp})"),
            other => f.write_str(other.name()),
        }
    }
}

/// An issued command awaiting resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    /// Correlation id carried by the final frame.
    pub id: CorrelationId,
    /// What was asked for.
    pub kind: CommandKind,
    /// When the request times out.
    pub deadline: Instant,
}

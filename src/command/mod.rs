// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GaggiMate command definitions.
//!
//! Commands exist at two levels:
//!
//! - [`CommandKind`] is what a host asks for ("set the brew temperature to
//!   93 °C"). It is validated against the current machine state.
//! - [`WireCommand`] is one frame the machine understands
//!   (`req:raise-temp`). A kind expands into zero or more wire commands
//!   through [`CommandKind::plan`].
//!
//! # Wire Commands
//!
//! | Wire command | Frame type | Fields |
//! |-------------|------------|--------|
//! | [`WireCommand::ChangeMode`] | `req:change-mode` | `mode` |
//! | [`WireCommand::ProcessActivate`] | `req:process:activate` | |
//! | [`WireCommand::ProcessDeactivate`] | `req:process:deactivate` | |
//! | [`WireCommand::FlushStart`] | `req:flush:start` | |
//! | [`WireCommand::SelectProfile`] | `req:profiles:select` | `id` |
//! | [`WireCommand::ListProfiles`] | `req:profiles:list` | |
//! | [`WireCommand::OtaSettings`] | `req:ota-settings` | |
//! | [`WireCommand::RaiseTemperature`] | `req:raise-temp` | |
//! | [`WireCommand::LowerTemperature`] | `req:lower-temp` | |
//!
//! # Examples
//!
//! ```
//! use gaggimate_bridge::command::{Command, CorrelationId, WireCommand};
//! use gaggimate_bridge::types::MachineMode;
//!
//! let cmd = WireCommand::ChangeMode(MachineMode::Steam);
//! assert_eq!(cmd.message_type(), "req:change-mode");
//! assert_eq!(
//!     cmd.to_frame(Some(CorrelationId::new(7))),
//!     r#"{"mode":2,"rid":"7","tp":"req:change-mode"}"#
//! );
//! ```

mod kind;
mod wire;

pub use kind::{
    CommandKind, CommandPlan, CommandRequest, STEAM_ACTIVATE_SPACING, TEMPERATURE_STEP_SPACING,
};
pub use wire::WireCommand;

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Identifier linking a command frame to its acknowledgment.
///
/// Ids are allocated from a monotonically increasing counter and sent as
/// their decimal string in the `rid` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A frame that can be sent to a GaggiMate machine.
pub trait Command {
    /// Returns the `tp` value of the frame.
    fn message_type(&self) -> &'static str;

    /// Returns the fields sent alongside `tp`.
    ///
    /// Most commands carry no fields.
    fn fields(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Serializes the command to a JSON text frame.
    ///
    /// When `rid` is given, the machine echoes it in its response.
    fn to_frame(&self, rid: Option<CorrelationId>) -> String {
        let mut object = self.fields();
        object.insert(
            "tp".to_string(),
            Value::String(self.message_type().to_string()),
        );
        if let Some(rid) = rid {
            object.insert("rid".to_string(), Value::String(rid.to_string()));
        }
        Value::Object(object).to_string()
    }
}

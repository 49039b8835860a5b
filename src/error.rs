// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the GaggiMate bridge.
//!
//! The hierarchy mirrors the layers of the bridge: value validation, link
//! (transport) faults, frame decoding, and command resolution.
//!
//! Link and decode faults are absorbed by the connection supervisor and only
//! surface as connection state changes. Command errors are delivered to the
//! caller that issued the command.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred on the link to the machine.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while decoding a frame.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A command did not complete successfully.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// The requested entity does not accept this kind of control.
    #[error("entity {0} does not support this control")]
    UnsupportedControl(String),

    /// Waiting for the machine took longer than allowed.
    #[error("timed out after {0} ms waiting for the machine")]
    WaitTimeout(u64),

    /// The bridge has been closed.
    #[error("bridge is closed")]
    Closed,
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A temperature setpoint is outside the range the machine accepts.
    #[error("setpoint {actual} °C is out of range [{min}, {max}]")]
    SetpointOutOfRange {
        /// Minimum allowed value.
        min: f32,
        /// Maximum allowed value.
        max: f32,
        /// The value that was provided.
        actual: f32,
    },

    /// A raw mode code does not match any machine mode.
    #[error("invalid machine mode: {0}")]
    InvalidMode(u8),

    /// A mode name could not be recognized.
    #[error("unknown machine mode name: {0}")]
    UnknownModeName(String),

    /// A profile label is not part of the catalogue.
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    /// An entity key could not be recognized.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// A configured duration must be longer than zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Errors related to the WebSocket link.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Opening the link failed.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// Opening the link did not finish in time.
    #[error("connection timed out after {0} ms")]
    ConnectTimeout(u64),

    /// Writing a frame failed. The link is closed afterwards.
    #[error("send failed: {0}")]
    Send(String),

    /// Reading a frame failed. The link is closed afterwards.
    #[error("receive failed: {0}")]
    Receive(String),

    /// The link is already closed.
    #[error("link is closed")]
    LinkClosed,

    /// Invalid endpoint address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors related to decoding inbound frames.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A binary frame was not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Expected field is missing from the frame.
    #[error("missing field in frame: {0}")]
    MissingField(String),

    /// The frame type is not one the bridge understands.
    #[error("unrecognized frame type: {0}")]
    UnknownType(String),

    /// A field carried a value of the wrong type or unit.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Terminal failure of a single command request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    /// The machine did not acknowledge the command within the timeout window.
    #[error("command timed out after {0} ms")]
    Timeout(u64),

    /// The machine rejected the command.
    #[error("command rejected by machine: {0}")]
    Rejected(String),

    /// The link was lost (or never up) while the command was outstanding.
    #[error("connection lost before the command completed")]
    ConnectionLost,

    /// The current machine state does not allow the command.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The command payload is invalid.
    #[error("invalid command: {0}")]
    Invalid(#[from] ValueError),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setpoint_error_display() {
        let err = ValueError::SetpointOutOfRange {
            min: 0.0,
            max: 160.0,
            actual: 170.0,
        };
        assert_eq!(err.to_string(), "setpoint 170 °C is out of range [0, 160]");
    }

    #[test]
    fn error_from_command_error() {
        let err: Error = CommandError::ConnectionLost.into();
        assert!(matches!(err, Error::Command(CommandError::ConnectionLost)));
    }

    #[test]
    fn command_error_from_value_error() {
        let err: CommandError = ValueError::InvalidMode(9).into();
        assert_eq!(err, CommandError::Invalid(ValueError::InvalidMode(9)));
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::MissingField("tp".to_string());
        assert_eq!(err.to_string(), "missing field in frame: tp");
    }

    #[test]
    fn zero_duration_display() {
        assert_eq!(
            ValueError::ZeroDuration("heartbeat_interval").to_string(),
            "heartbeat_interval must be greater than zero"
        );
    }

    #[test]
    fn timeout_display() {
        assert_eq!(
            CommandError::Timeout(5000).to_string(),
            "command timed out after 5000 ms"
        );
    }
}

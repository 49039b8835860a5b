// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of inbound GaggiMate frames.
//!
//! The machine sends one JSON object per WebSocket text frame. The `tp` field
//! tags the frame type:
//!
//! - `evt:status` - Periodic machine telemetry
//! - `res:ota-settings` - Firmware information
//! - `res:profiles:list` - Brew profile catalogue
//!
//! Any other frame carrying a `rid` is the response to a command and resolves
//! the request with that correlation id.
//!
//! # Examples
//!
//! ```
//! use gaggimate_bridge::telemetry::{InboundRecord, decode};
//!
//! let records = decode(r#"{"tp":"evt:status","ct":92.3,"tt":93.0,"m":1}"#).unwrap();
//! match &records[0] {
//!     InboundRecord::Telemetry(update) => {
//!         assert_eq!(update.current_temperature, Some(92.3));
//!     }
//!     other => panic!("unexpected record: {other:?}"),
//! }
//! ```

mod ota_parser;
mod profiles_parser;
mod status_parser;

pub use ota_parser::DiagnosticUpdate;
pub use profiles_parser::ProfileEntry;
pub use status_parser::{ProcessUpdate, TelemetryUpdate};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::command::CorrelationId;
use crate::error::ParseError;

/// Frame type of periodic machine telemetry.
pub const TYPE_STATUS: &str = "evt:status";

/// Frame type of firmware information responses.
pub const TYPE_OTA_SETTINGS: &str = "res:ota-settings";

/// Frame type of profile list responses.
pub const TYPE_PROFILES_LIST: &str = "res:profiles:list";

/// A typed record decoded from one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundRecord {
    /// Machine telemetry.
    Telemetry(TelemetryUpdate),
    /// Firmware information.
    Diagnostic(DiagnosticUpdate),
    /// Brew profile catalogue.
    Profiles(Vec<ProfileEntry>),
    /// A command was accepted.
    Ack(CorrelationId),
    /// A command was rejected.
    Nack {
        /// The rejected request.
        id: CorrelationId,
        /// Reason given by the machine.
        reason: String,
    },
}

/// Decodes a binary frame, which must hold UTF-8 JSON.
///
/// # Errors
///
/// Returns `ParseError::Utf8` for invalid UTF-8, otherwise as [`decode`].
pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<InboundRecord>, ParseError> {
    decode(std::str::from_utf8(bytes)?)
}

/// Decodes one text frame into records.
///
/// A frame yields more than one record when a response both carries state and
/// resolves a request (for example a `res:profiles:list` with a `rid`).
///
/// # Errors
///
/// Returns a `ParseError` for malformed JSON, non-object frames, frames with
/// neither `tp` nor `rid`, unknown frame types, and fields of the wrong type.
pub fn decode(text: &str) -> Result<Vec<InboundRecord>, ParseError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(ref object) = value else {
        return Err(ParseError::InvalidValue {
            field: "frame".to_string(),
            message: "expected a JSON object".to_string(),
        });
    };

    let frame_type = match object.get("tp") {
        Some(Value::String(tp)) => Some(tp.clone()),
        Some(other) => {
            return Err(ParseError::InvalidValue {
                field: "tp".to_string(),
                message: format!("expected string, got {other}"),
            });
        }
        None => None,
    };
    let rid = object.get("rid").map(parse_rid).transpose()?;
    let response = rid.map(|id| response_record(id, object));

    let mut records = Vec::with_capacity(2);
    match frame_type.as_deref() {
        Some(TYPE_STATUS) => {
            records.push(InboundRecord::Telemetry(status_parser::parse_status(value)?));
        }
        Some(TYPE_OTA_SETTINGS) => {
            records.push(InboundRecord::Diagnostic(ota_parser::parse_ota_settings(
                value,
            )?));
            records.extend(response);
        }
        Some(TYPE_PROFILES_LIST) => {
            records.push(InboundRecord::Profiles(profiles_parser::parse_profiles(
                value,
            )?));
            records.extend(response);
        }
        Some(other) => match response {
            Some(record) => records.push(record),
            None => return Err(ParseError::UnknownType(other.to_string())),
        },
        None => match response {
            Some(record) => records.push(record),
            None => return Err(ParseError::MissingField("tp".to_string())),
        },
    }
    Ok(records)
}

fn parse_rid(value: &Value) -> Result<CorrelationId, ParseError> {
    let parsed = match value {
        Value::String(s) => s.parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    parsed.map(CorrelationId::new).ok_or_else(|| ParseError::InvalidValue {
        field: "rid".to_string(),
        message: format!("not a correlation id: {value}"),
    })
}

fn response_record(id: CorrelationId, object: &serde_json::Map<String, Value>) -> InboundRecord {
    match object.get("error") {
        Some(Value::Null) | None => {}
        Some(Value::String(reason)) => {
            return InboundRecord::Nack {
                id,
                reason: reason.clone(),
            };
        }
        Some(other) => {
            return InboundRecord::Nack {
                id,
                reason: other.to_string(),
            };
        }
    }
    if matches!(object.get("success"), Some(Value::Bool(false))) {
        return InboundRecord::Nack {
            id,
            reason: "rejected".to_string(),
        };
    }
    InboundRecord::Ack(id)
}

/// Accepts `true`/`false` as well as `0`/`1` for boolean fields.
pub(crate) fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Flag::Bool(b)) => Ok(Some(b)),
        Some(Flag::Int(0)) => Ok(Some(false)),
        Some(Flag::Int(1)) => Ok(Some(true)),
        Some(Flag::Int(n)) => Err(D::Error::custom(format!(
            "expected boolean or 0/1, got {n}"
        ))),
    }
}

/// Rounds to `places` decimal places.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn round_to(value: f64, places: i32) -> f32 {
    let factor = 10f64.powi(places);
    ((value * factor).round() / factor) as f32
}

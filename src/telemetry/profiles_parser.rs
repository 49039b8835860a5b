// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for `res:profiles:list` frames.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;

/// One brew profile as listed by the machine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileEntry {
    /// Opaque profile identifier used by `req:profiles:select`.
    pub id: String,
    /// Human-readable label.
    pub label: String,
}

#[derive(Debug, Deserialize)]
struct RawProfiles {
    profiles: Option<Vec<ProfileEntry>>,
}

pub(crate) fn parse_profiles(frame: Value) -> Result<Vec<ProfileEntry>, ParseError> {
    let raw: RawProfiles = serde_json::from_value(frame)?;
    raw.profiles
        .ok_or_else(|| ParseError::MissingField("profiles".to_string()))
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brew profile catalogue.

use serde::Serialize;

use crate::error::ValueError;
use crate::telemetry::ProfileEntry;

/// The machine's brew profiles in the order it lists them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileCatalog {
    entries: Vec<(String, String)>,
}

impl ProfileCatalog {
    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the catalogue. Returns `true` if it changed.
    pub fn replace(&mut self, profiles: &[ProfileEntry]) -> bool {
        let entries: Vec<(String, String)> = profiles
            .iter()
            .map(|p| (p.label.clone(), p.id.clone()))
            .collect();
        if entries == self.entries {
            return false;
        }
        self.entries = entries;
        true
    }

    /// Returns the profile labels.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|(label, _)| label.clone()).collect()
    }

    /// Looks up a profile id by its label.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::UnknownProfile` if no profile has this label.
    pub fn id_for_label(&self, label: &str) -> Result<&str, ValueError> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, id)| id.as_str())
            .ok_or_else(|| ValueError::UnknownProfile(label.to_string()))
    }

    /// Returns the number of profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no profiles are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

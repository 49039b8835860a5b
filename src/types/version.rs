// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Firmware version strings.
//!
//! GaggiMate firmware reports versions such as `v1.4.2` or `1.5`. The raw
//! string is always kept for display; a semantic version is attached when the
//! string can be normalized into one.

use std::cmp::Ordering;
use std::fmt;

use semver::Version;
use serde::Serialize;

/// A firmware version as reported by the machine.
///
/// # Examples
///
/// ```
/// use gaggimate_bridge::types::FirmwareVersion;
///
/// let installed = FirmwareVersion::new("v1.4.2");
/// let latest = FirmwareVersion::new("1.5");
/// assert_eq!(installed.is_older_than(&latest), Some(true));
///
/// let nightly = FirmwareVersion::new("nightly-2024-10");
/// assert!(nightly.semver().is_none());
/// assert_eq!(nightly.is_older_than(&latest), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareVersion {
    raw: String,
    #[serde(skip)]
    parsed: Option<Version>,
}

impl FirmwareVersion {
    /// Wraps a raw version string, parsing it when possible.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = normalize(&raw);
        Self { raw, parsed }
    }

    /// Returns the string exactly as reported.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed semantic version, if the string is one.
    #[must_use]
    pub fn semver(&self) -> Option<&Version> {
        self.parsed.as_ref()
    }

    /// Compares two versions semantically.
    ///
    /// Returns `None` when either side is not a semantic version.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(self.parsed.as_ref()?.cmp(other.parsed.as_ref()?))
    }

    /// Returns `Some(true)` if `self` is strictly older than `other`.
    #[must_use]
    pub fn is_older_than(&self, other: &Self) -> Option<bool> {
        self.compare(other).map(Ordering::is_lt)
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn normalize(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if let Ok(version) = Version::parse(stripped) {
        return Some(version);
    }

    // Pad "x" and "x.y" to "x.y.z", keeping any pre-release/build suffix.
    let split_at = stripped.find(['-', '+']).unwrap_or(stripped.len());
    let (core, suffix) = stripped.split_at(split_at);
    let dots = core.matches('.').count();
    let padded = match dots {
        0 => format!("{core}.0.0{suffix}"),
        1 => format!("{core}.0{suffix}"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix() {
        let v = FirmwareVersion::new("v1.2.3");
        assert_eq!(v.semver(), Some(&Version::new(1, 2, 3)));
        assert_eq!(v.as_str(), "v1.2.3");
    }

    #[test]
    fn pads_short_versions() {
        assert_eq!(
            FirmwareVersion::new("1.5").semver(),
            Some(&Version::new(1, 5, 0))
        );
        assert_eq!(
            FirmwareVersion::new("2").semver(),
            Some(&Version::new(2, 0, 0))
        );
    }

    #[test]
    fn keeps_prerelease() {
        let v = FirmwareVersion::new("v1.6-beta.1");
        let parsed = v.semver().unwrap();
        assert_eq!(parsed.minor, 6);
        assert!(!parsed.pre.is_empty());
    }

    #[test]
    fn non_semver_has_no_ordering() {
        let a = FirmwareVersion::new("dev");
        let b = FirmwareVersion::new("1.0.0");
        assert_eq!(a.compare(&b), None);
        assert_eq!(b.is_older_than(&a), None);
    }

    #[test]
    fn ordering() {
        let old = FirmwareVersion::new("1.4.9");
        let new = FirmwareVersion::new("v1.10.0");
        assert_eq!(old.is_older_than(&new), Some(true));
        assert_eq!(new.is_older_than(&old), Some(false));
        assert_eq!(new.is_older_than(&new), Some(false));
    }
}

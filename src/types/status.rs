// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Derived machine status.

use std::fmt;

use serde::Serialize;

use super::MachineMode;

/// Display-level status derived from mode, process phase and active flag.
///
/// The status is never transmitted by the machine. It is recomputed from its
/// inputs whenever they are read.
///
/// # Examples
///
/// ```
/// use gaggimate_bridge::types::{MachineMode, MachineStatus};
///
/// let status = MachineStatus::derive(Some(MachineMode::Brew), Some("infusion"), None);
/// assert_eq!(status, MachineStatus::Brewing);
///
/// let idle = MachineStatus::derive(Some(MachineMode::Brew), None, Some(false));
/// assert_eq!(idle, MachineStatus::Idle);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    /// No process running.
    Idle,
    /// A brew process is running.
    Brewing,
    /// A steam process is running.
    Steaming,
    /// A grind process is running.
    Grinding,
    /// A hot water process is running.
    PouringWater,
}

impl MachineStatus {
    /// Computes the status.
    ///
    /// A process is running when `active` is `Some(true)`. When the machine
    /// does not report the active flag, a non-empty phase counts as running.
    #[must_use]
    pub fn derive(mode: Option<MachineMode>, phase: Option<&str>, active: Option<bool>) -> Self {
        let running = match active {
            Some(flag) => flag,
            None => phase.is_some_and(|p| !p.trim().is_empty()),
        };
        if !running {
            return Self::Idle;
        }
        match mode {
            Some(MachineMode::Brew) => Self::Brewing,
            Some(MachineMode::Steam) => Self::Steaming,
            Some(MachineMode::Grind) => Self::Grinding,
            Some(MachineMode::HotWater) => Self::PouringWater,
            Some(MachineMode::Standby) | None => Self::Idle,
        }
    }

    /// Returns `true` if any process is running.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Returns the human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Brewing => "Brewing",
            Self::Steaming => "Steaming",
            Self::Grinding => "Grinding",
            Self::PouringWater => "Pouring Water",
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brew_with_phase_is_brewing() {
        assert_eq!(
            MachineStatus::derive(Some(MachineMode::Brew), Some("infusion"), None),
            MachineStatus::Brewing
        );
    }

    #[test]
    fn active_flag_wins_over_phase() {
        assert_eq!(
            MachineStatus::derive(Some(MachineMode::Brew), Some("infusion"), Some(false)),
            MachineStatus::Idle
        );
        assert_eq!(
            MachineStatus::derive(Some(MachineMode::Steam), None, Some(true)),
            MachineStatus::Steaming
        );
    }

    #[test]
    fn standby_is_always_idle() {
        assert_eq!(
            MachineStatus::derive(Some(MachineMode::Standby), Some("brew"), Some(true)),
            MachineStatus::Idle
        );
    }

    #[test]
    fn empty_phase_is_not_running() {
        assert_eq!(
            MachineStatus::derive(Some(MachineMode::Grind), Some("  "), None),
            MachineStatus::Idle
        );
    }

    #[test]
    fn every_mode_maps() {
        let cases = [
            (MachineMode::Brew, MachineStatus::Brewing),
            (MachineMode::Steam, MachineStatus::Steaming),
            (MachineMode::Grind, MachineStatus::Grinding),
            (MachineMode::HotWater, MachineStatus::PouringWater),
        ];
        for (mode, expected) in cases {
            assert_eq!(MachineStatus::derive(Some(mode), None, Some(true)), expected);
        }
    }

    #[test]
    fn unknown_mode_is_idle() {
        assert_eq!(
            MachineStatus::derive(None, Some("brew"), Some(true)),
            MachineStatus::Idle
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let first = MachineStatus::derive(Some(MachineMode::HotWater), Some("pour"), None);
        for _ in 0..10 {
            assert_eq!(
                MachineStatus::derive(Some(MachineMode::HotWater), Some("pour"), None),
                first
            );
        }
    }
}

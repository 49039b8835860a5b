// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brew temperature setpoint.
//!
//! The machine has no absolute "set temperature" request. A setpoint is
//! reached by stepping the target up or down one degree at a time, so this
//! type also computes the number of steps from a current target.

use std::fmt;

use serde::Serialize;

use crate::error::ValueError;

/// Target boiler temperature in °C (0-160).
///
/// # Examples
///
/// ```
/// use gaggimate_bridge::types::Setpoint;
///
/// let sp = Setpoint::new(93.0).unwrap();
/// assert_eq!(sp.celsius(), 93.0);
/// assert_eq!(sp.steps_from(90.0), 3);
/// assert_eq!(sp.steps_from(95.4), -2);
///
/// assert!(Setpoint::new(170.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Setpoint(f32);

impl Setpoint {
    /// Lowest accepted setpoint.
    pub const MIN_CELSIUS: f32 = 0.0;

    /// Highest accepted setpoint.
    pub const MAX_CELSIUS: f32 = 160.0;

    /// Creates a validated setpoint.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::SetpointOutOfRange` if the value is outside
    /// 0-160 °C or is not a finite number.
    pub fn new(celsius: f32) -> Result<Self, ValueError> {
        if !celsius.is_finite() || !(Self::MIN_CELSIUS..=Self::MAX_CELSIUS).contains(&celsius) {
            return Err(ValueError::SetpointOutOfRange {
                min: Self::MIN_CELSIUS,
                max: Self::MAX_CELSIUS,
                actual: celsius,
            });
        }
        Ok(Self(celsius))
    }

    /// Returns the setpoint in °C.
    #[must_use]
    pub const fn celsius(self) -> f32 {
        self.0
    }

    /// Returns the signed number of one-degree steps from `current` to this
    /// setpoint. Positive means raise, negative means lower.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn steps_from(self, current: f32) -> i32 {
        // Bounded by the 0-160 range, so the cast cannot overflow.
        (self.0 - current).round() as i32
    }
}

impl fmt::Display for Setpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} °C", self.0)
    }
}

impl TryFrom<f32> for Setpoint {
    type Error = ValueError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        assert!(Setpoint::new(0.0).is_ok());
        assert!(Setpoint::new(160.0).is_ok());
        assert!(Setpoint::new(-0.5).is_err());
        assert!(Setpoint::new(160.1).is_err());
    }

    #[test]
    fn non_finite_rejected() {
        assert!(Setpoint::new(f32::NAN).is_err());
        assert!(Setpoint::new(f32::INFINITY).is_err());
    }

    #[test]
    fn steps_round_to_whole_degrees() {
        let sp = Setpoint::new(93.0).unwrap();
        assert_eq!(sp.steps_from(93.0), 0);
        assert_eq!(sp.steps_from(92.6), 0);
        assert_eq!(sp.steps_from(92.4), 1);
        assert_eq!(sp.steps_from(100.0), -7);
    }

    #[test]
    fn display() {
        assert_eq!(Setpoint::new(92.5).unwrap().to_string(), "92.5 °C");
    }
}

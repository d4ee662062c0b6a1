// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver volume type with the telnet wire grammar.
//!
//! AV receivers transmit volume as a 2-or-3-digit ASCII string where a
//! third digit encodes a half step:
//!
//! | wire  | value |
//! |-------|-------|
//! | `"45"`  | 45.0  |
//! | `"455"` | 45.5  |
//! | `"04"`  | 4.0   |
//! | `"045"` | 4.5   |
//!
//! The decode rule is: divide the numeric value by 10 when it exceeds 99
//! OR when the string has a leading zero and more than two digits. The rule
//! is preserved exactly as the devices implement it, including its edge
//! cases (`"100"` decodes to 10.0, not 100.0); see the pinned tests.

use std::fmt;

use crate::error::{ParseError, ValueError};

/// A receiver volume in device units (dB-like, half-step resolution).
///
/// Stored internally in tenths so that decoded values compare exactly.
/// Values with a fractional part other than .0 or .5 can be *stored*
/// (a garbled device report like `"453"` still decodes losslessly) but
/// cannot be [`encoded`](Volume::encode) back onto the wire.
///
/// # Examples
///
/// ```
/// use avrelay_lib::types::Volume;
///
/// let vol = Volume::decode("455").unwrap();
/// assert_eq!(vol.value(), 45.5);
/// assert_eq!(vol.encode().unwrap(), "455");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Volume(u16);

impl Volume {
    /// Minimum volume (0.0).
    pub const MIN: Self = Self(0);

    /// Maximum wire-representable volume (99.9; three digits divided by 10).
    pub const MAX: Self = Self(999);

    /// Creates a volume from a device-unit value.
    ///
    /// The value is kept at tenth resolution; anything finer is rounded.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the value is outside
    /// [0.0, 99.9].
    pub fn new(value: f64) -> Result<Self, ValueError> {
        if !(0.0..=99.9).contains(&value) {
            return Err(ValueError::OutOfRange {
                min: 0.0,
                max: 99.9,
                actual: value,
            });
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self((value * 10.0).round() as u16))
    }

    /// Returns the volume in device units.
    #[must_use]
    pub fn value(self) -> f64 {
        f64::from(self.0) / 10.0
    }

    /// Returns `true` if the value sits on a half step (.0 or .5).
    #[must_use]
    pub fn is_half_step(self) -> bool {
        self.0 % 5 == 0
    }

    /// Rounds to the nearest half step.
    #[must_use]
    pub fn rounded_to_half_step(self) -> Self {
        let steps = (f64::from(self.0) / 5.0).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self((steps * 5.0) as u16)
    }

    /// Decodes a 2-or-3-digit wire string.
    ///
    /// The numeric value is divided by 10 when it exceeds 99 OR when the
    /// string has a leading `0` and more than two digits. This reproduces
    /// the device rule exactly; do not "fix" it.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::UnexpectedFormat` if the string is not 2 or 3
    /// ASCII digits.
    pub fn decode(s: &str) -> Result<Self, ParseError> {
        if !(2..=3).contains(&s.len()) || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::UnexpectedFormat(format!(
                "volume string {s:?} does not match the 2-3 digit grammar"
            )));
        }
        let raw: u16 = s.parse().map_err(|_| ParseError::InvalidValue {
            field: "volume".to_string(),
            message: format!("cannot parse {s:?}"),
        })?;
        let tenths = if raw > 99 || (s.starts_with('0') && s.len() > 2) {
            raw
        } else {
            raw * 10
        };
        Ok(Self(tenths))
    }

    /// Encodes to the wire string.
    ///
    /// Whole values below 10 are padded to two digits; a `.5` fraction
    /// appends a trailing `5`.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::NotRepresentable` if the fractional part is
    /// neither .0 nor .5 (round with [`rounded_to_half_step`](Self::rounded_to_half_step)
    /// first).
    pub fn encode(self) -> Result<String, ValueError> {
        if !self.is_half_step() {
            return Err(ValueError::NotRepresentable(self.value()));
        }
        let whole = self.0 / 10;
        let half = self.0 % 10 == 5;
        let mut s = format!("{whole:02}");
        if half {
            s.push('5');
        }
        Ok(s)
    }

    /// Converts a percentage into a volume, rounded to the nearest half
    /// step and clamped to `[0, max]`.
    #[must_use]
    pub fn from_percent(percent: f64, max: Self) -> Self {
        let raw = percent.clamp(0.0, 100.0) / 100.0 * f64::from(max.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let tenths = ((raw / 5.0).round() * 5.0) as u16;
        Self(tenths.min(max.0))
    }

    /// Converts this volume into a percentage of `max`, rounded to the
    /// nearest whole percent.
    #[must_use]
    pub fn percent(self, max: Self) -> u8 {
        if max.0 == 0 {
            return 0;
        }
        let pct = f64::from(self.0) / f64::from(max.0) * 100.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rounded = pct.round().clamp(0.0, 100.0) as u8;
        rounded
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 10 == 0 {
            write!(f, "{}", self.0 / 10)
        } else {
            write!(f, "{}", self.value())
        }
    }
}

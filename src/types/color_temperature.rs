// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kelvin↔percent color temperature transcoding.
//!
//! Tunable-white channels are addressed in percent while the device
//! reports kelvin. The mapping is linear over a configured range; the
//! `min`/`max` names follow the percent axis of the devices (0% at
//! `min_kelvin`, 100% at `max_kelvin`), not numeric order, so
//! `min_kelvin` is typically the *larger* number (cold white).

use crate::error::ValueError;

/// Configured kelvin range for a tunable-white channel.
///
/// # Examples
///
/// ```
/// use avrelay_lib::types::ColorTemperatureRange;
///
/// let range = ColorTemperatureRange::new(4000, 2202).unwrap();
/// assert_eq!(range.percent(4000), 0);
/// assert_eq!(range.percent(2202), 100);
/// assert_eq!(range.kelvin(0), 4000);
/// assert_eq!(range.kelvin(100), 2202);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColorTemperatureRange {
    /// Kelvin at 0% (cold end).
    min_kelvin: u32,
    /// Kelvin at 100% (warm end).
    max_kelvin: u32,
}

impl ColorTemperatureRange {
    /// Creates a range. `min_kelvin` is the 0% end and must exceed
    /// `max_kelvin`, the 100% end.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `min_kelvin <= max_kelvin`.
    pub fn new(min_kelvin: u32, max_kelvin: u32) -> Result<Self, ValueError> {
        if min_kelvin <= max_kelvin {
            return Err(ValueError::OutOfRange {
                min: f64::from(max_kelvin) + 1.0,
                max: f64::MAX,
                actual: f64::from(min_kelvin),
            });
        }
        Ok(Self {
            min_kelvin,
            max_kelvin,
        })
    }

    /// Returns the kelvin value at the 0% end.
    #[must_use]
    pub fn min_kelvin(self) -> u32 {
        self.min_kelvin
    }

    /// Returns the kelvin value at the 100% end.
    #[must_use]
    pub fn max_kelvin(self) -> u32 {
        self.max_kelvin
    }

    /// Returns the span of the range in kelvin.
    #[must_use]
    pub fn span(self) -> u32 {
        self.min_kelvin - self.max_kelvin
    }

    /// Converts kelvin into a percentage of this range.
    ///
    /// Out-of-range kelvin values are clamped into
    /// `[max_kelvin, min_kelvin]` before conversion.
    #[must_use]
    pub fn percent(self, kelvin: u32) -> u8 {
        let clamped = kelvin.clamp(self.max_kelvin, self.min_kelvin);
        let pct =
            100.0 - f64::from(clamped - self.max_kelvin) * 100.0 / f64::from(self.span());
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rounded = pct.round() as u8;
        rounded
    }

    /// Converts a percentage into kelvin.
    #[must_use]
    pub fn kelvin(self, percent: u8) -> u32 {
        let pct = f64::from(percent.min(100));
        let k = f64::from(self.min_kelvin) - f64::from(self.span()) * pct / 100.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rounded = k.round() as u32;
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> ColorTemperatureRange {
        ColorTemperatureRange::new(4000, 2202).unwrap()
    }

    #[test]
    fn endpoints() {
        let r = range();
        assert_eq!(r.percent(4000), 0);
        assert_eq!(r.percent(2202), 100);
        assert_eq!(r.kelvin(0), 4000);
        assert_eq!(r.kelvin(100), 2202);
        assert_eq!(r.span(), 1798);
    }

    #[test]
    fn out_of_range_kelvin_is_clamped() {
        let r = range();
        assert_eq!(r.percent(5000), 0);
        assert_eq!(r.percent(1000), 100);
    }

    #[test]
    fn round_trip_within_one_percent() {
        let r = range();
        for p in 0..=100u8 {
            let back = r.percent(r.kelvin(p));
            let diff = i16::from(back) - i16::from(p);
            assert!(diff.abs() <= 1, "percent {p} -> {}K -> {back}", r.kelvin(p));
        }
    }

    #[test]
    fn inverted_range_rejected() {
        assert!(ColorTemperatureRange::new(2202, 4000).is_err());
        assert!(ColorTemperatureRange::new(3000, 3000).is_err());
    }
}

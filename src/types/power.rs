// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power state type.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// On/off state of a zone, mute flag, relay or IO pin.
///
/// "Unknown" is deliberately not a variant: an unreported state is
/// represented as `Option::<PowerState>::None` in the device snapshot, so
/// that unknown is never conflated with off.
///
/// # Examples
///
/// ```
/// use avrelay_lib::types::PowerState;
///
/// let state: PowerState = "ON".parse().unwrap();
/// assert_eq!(state, PowerState::On);
/// assert!(state.is_on());
/// assert_eq!(state.to_string(), "ON");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PowerState {
    /// The target is on.
    On,
    /// The target is off (or in standby, for receiver power).
    Off,
}

impl PowerState {
    /// Returns `true` if the state is [`PowerState::On`].
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    /// Creates a state from a boolean.
    #[must_use]
    pub fn from_bool(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    /// Returns the inverse state.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }

    /// Returns the wire token (`ON` / `OFF`).
    #[must_use]
    pub fn wire_token(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

impl From<PowerState> for bool {
    fn from(state: PowerState) -> Self {
        state.is_on()
    }
}

impl FromStr for PowerState {
    type Err = ValueError;

    /// Parses a wire token. Receivers report main power as `STANDBY`
    /// rather than `OFF`; both map to [`PowerState::Off`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ON" | "1" => Ok(Self::On),
            "OFF" | "STANDBY" | "0" => Ok(Self::Off),
            other => Err(ValueError::InvalidPowerState(other.to_string())),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_token())
    }
}

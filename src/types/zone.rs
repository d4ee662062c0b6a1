// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver zone type.

use std::fmt;

use crate::error::ValueError;

/// An independently controllable zone of a multi-zone receiver.
///
/// The main zone uses dedicated two-letter telnet prefixes (`PW`, `MV`,
/// `MU`, `SI`); secondary zones share a single zone prefix (`Z2`, `Z3`,
/// `Z4`) followed by a sub-command.
///
/// # Examples
///
/// ```
/// use avrelay_lib::types::Zone;
///
/// assert_eq!(Zone::Main.number(), 1);
/// assert_eq!(Zone::Zone2.prefix(), Some("Z2"));
/// assert_eq!(Zone::Main.prefix(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Zone {
    /// The main zone (zone 1).
    Main,
    /// Zone 2.
    Zone2,
    /// Zone 3.
    Zone3,
    /// Zone 4.
    Zone4,
}

impl Zone {
    /// All zones in wire order.
    pub const ALL: [Self; 4] = [Self::Main, Self::Zone2, Self::Zone3, Self::Zone4];

    /// Creates a zone from its 1-based number.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidZone` for numbers outside 1-4.
    pub fn new(number: u8) -> Result<Self, ValueError> {
        match number {
            1 => Ok(Self::Main),
            2 => Ok(Self::Zone2),
            3 => Ok(Self::Zone3),
            4 => Ok(Self::Zone4),
            other => Err(ValueError::InvalidZone(other)),
        }
    }

    /// Returns the 1-based zone number.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Main => 1,
            Self::Zone2 => 2,
            Self::Zone3 => 3,
            Self::Zone4 => 4,
        }
    }

    /// Returns the telnet zone prefix, or `None` for the main zone
    /// (which uses per-command prefixes instead).
    #[must_use]
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Main => None,
            Self::Zone2 => Some("Z2"),
            Self::Zone3 => Some("Z3"),
            Self::Zone4 => Some("Z4"),
        }
    }

    /// Returns the zone for a telnet zone prefix.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "Z2" => Some(Self::Zone2),
            "Z3" => Some(Self::Zone3),
            "Z4" => Some(Self::Zone4),
            _ => None,
        }
    }

    /// Returns the 0-based index into per-zone state arrays.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.number() - 1)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            other => write!(f, "zone{}", other.number()),
        }
    }
}

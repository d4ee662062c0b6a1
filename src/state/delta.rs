// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded state deltas.
//!
//! A [`StateDelta`] is the output of decoding one wire unit (a telnet
//! line, a UDP datagram or an XML document): the raw unit plus the typed
//! field updates it carried. Deltas are applied to a
//! [`DeviceState`](super::DeviceState) by the diff engine, which decides
//! which updates actually change anything.

use crate::types::{PowerState, Volume, Zone};

/// One decoded field update within a delta.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FieldUpdate {
    /// Zone power changed.
    ZonePower {
        /// The reported zone.
        zone: Zone,
        /// The new power state.
        state: PowerState,
    },

    /// Zone mute flag changed.
    ZoneMute {
        /// The reported zone.
        zone: Zone,
        /// The new mute state.
        state: PowerState,
    },

    /// Zone volume changed.
    ZoneVolume {
        /// The reported zone.
        zone: Zone,
        /// The new volume.
        volume: Volume,
    },

    /// Zone input source changed.
    ZoneInput {
        /// The reported zone.
        zone: Zone,
        /// The new input source name.
        input: String,
    },

    /// Relay status report. Boards always report state and lock flag
    /// together; the label is optional.
    Relay {
        /// 1-based relay index.
        index: u8,
        /// Whether the relay is switched on.
        on: bool,
        /// Whether the relay is administratively locked against writes.
        locked: bool,
        /// The relay label, if the report carried one.
        name: Option<String>,
    },

    /// IO pin status report.
    Io {
        /// 1-based pin index.
        index: u8,
        /// Whether the pin is high.
        on: bool,
    },

    /// Tunable-white color temperature report, in percent of the
    /// configured kelvin range.
    White {
        /// Position within the range (0 = cold end, 100 = warm end).
        percent: u8,
    },
}

/// The decoded content of one wire unit.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StateDelta {
    raw: String,
    updates: Vec<FieldUpdate>,
}

impl StateDelta {
    /// Creates an empty delta for a raw wire unit.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            updates: Vec::new(),
        }
    }

    /// Adds a field update.
    pub fn push(&mut self, update: FieldUpdate) {
        self.updates.push(update);
    }

    /// Adds a field update, builder style.
    #[must_use]
    pub fn with(mut self, update: FieldUpdate) -> Self {
        self.updates.push(update);
        self
    }

    /// Returns the raw wire unit this delta was decoded from.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the decoded field updates.
    #[must_use]
    pub fn updates(&self) -> &[FieldUpdate] {
        &self.updates
    }

    /// Returns `true` if the unit decoded to no field updates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_collects_updates() {
        let delta = StateDelta::new("MV455")
            .with(FieldUpdate::ZoneVolume {
                zone: Zone::Main,
                volume: Volume::new(45.5).unwrap(),
            });

        assert_eq!(delta.raw(), "MV455");
        assert_eq!(delta.updates().len(), 1);
        assert!(!delta.is_empty());
    }

    #[test]
    fn empty_delta() {
        let delta = StateDelta::new("MVMAX 80");
        assert!(delta.is_empty());
    }
}

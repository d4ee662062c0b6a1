// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel identifiers and channel values.
//!
//! A channel is a named, externally addressable property of a device.
//! Channel ids are stable strings whose *structure* carries the zone or
//! index, mirroring the zone-prefix convention of the wire protocols:
//!
//! | id             | meaning                      |
//! |----------------|------------------------------|
//! | `mainVolume`   | main-zone volume             |
//! | `zone2#mute`   | zone 2 mute flag             |
//! | `r3#state`     | relay 3 on/off               |
//! | `io5#state`    | IO pin 5 on/off              |
//! | `white#temperature` | tunable-white color temperature |
//!
//! The zone digit sits at a fixed byte offset (4 for `zoneN#…`, 1 for
//! `rN#state`, 2 for `ioN#state`); parsing reads it positionally rather
//! than through a side table.

use std::fmt;
use std::str::FromStr;

use crate::error::DeviceError;
use crate::types::{PowerState, Zone};

/// The per-zone property a receiver channel addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ZoneField {
    /// Zone power (on/standby).
    Power,
    /// Zone volume.
    Volume,
    /// Zone mute flag.
    Mute,
    /// Zone input source.
    Input,
}

impl ZoneField {
    fn as_lower(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Volume => "volume",
            Self::Mute => "mute",
            Self::Input => "input",
        }
    }

    fn as_upper_camel(self) -> &'static str {
        match self {
            Self::Power => "Power",
            Self::Volume => "Volume",
            Self::Mute => "Mute",
            Self::Input => "Input",
        }
    }

    fn from_lower(s: &str) -> Option<Self> {
        match s {
            "power" => Some(Self::Power),
            "volume" => Some(Self::Volume),
            "mute" => Some(Self::Mute),
            "input" => Some(Self::Input),
            _ => None,
        }
    }
}

/// A parsed channel identifier.
///
/// # Examples
///
/// ```
/// use avrelay_lib::channel::{ChannelId, ZoneField};
/// use avrelay_lib::types::Zone;
///
/// let id: ChannelId = "zone2#mute".parse().unwrap();
/// assert_eq!(id, ChannelId::Zone { zone: Zone::Zone2, field: ZoneField::Mute });
/// assert_eq!(id.to_string(), "zone2#mute");
///
/// let relay: ChannelId = "r3#state".parse().unwrap();
/// assert_eq!(relay, ChannelId::Relay(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ChannelId {
    /// A receiver zone property.
    Zone {
        /// The zone the channel addresses.
        zone: Zone,
        /// The property within the zone.
        field: ZoneField,
    },
    /// A relay state channel (`rN#state`, 1-based index).
    Relay(u8),
    /// An IO pin state channel (`ioN#state`, 1-based index).
    Io(u8),
    /// The tunable-white color temperature channel (`white#temperature`).
    ///
    /// Addressed in percent of the configured kelvin range; boards have
    /// at most one tunable-white port, so the id carries no index.
    White,
}

impl ChannelId {
    /// Convenience constructor for a main-zone channel.
    #[must_use]
    pub fn main(field: ZoneField) -> Self {
        Self::Zone {
            zone: Zone::Main,
            field,
        }
    }

    /// Convenience constructor for a zone channel.
    #[must_use]
    pub fn zone(zone: Zone, field: ZoneField) -> Self {
        Self::Zone { zone, field }
    }

    /// Returns the zone this channel addresses, if it is a zone channel.
    #[must_use]
    pub fn zone_of(self) -> Option<Zone> {
        match self {
            Self::Zone { zone, .. } => Some(zone),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zone {
                zone: Zone::Main,
                field,
            } => write!(f, "main{}", field.as_upper_camel()),
            Self::Zone { zone, field } => {
                write!(f, "zone{}#{}", zone.number(), field.as_lower())
            }
            Self::Relay(index) => write!(f, "r{index}#state"),
            Self::Io(index) => write!(f, "io{index}#state"),
            Self::White => f.write_str("white#temperature"),
        }
    }
}

impl FromStr for ChannelId {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || DeviceError::UnknownChannel(s.to_string());
        let bytes = s.as_bytes();

        if let Some(rest) = s.strip_prefix("main") {
            let field = match rest {
                "Power" => ZoneField::Power,
                "Volume" => ZoneField::Volume,
                "Mute" => ZoneField::Mute,
                "Input" => ZoneField::Input,
                _ => return Err(unknown()),
            };
            return Ok(Self::main(field));
        }

        if s.starts_with("zone") && bytes.len() > 5 && bytes[5] == b'#' {
            // Zone digit at byte offset 4, matching the Z2/Z3/Z4 prefixes.
            let digit = (bytes[4] as char).to_digit(10).ok_or_else(unknown)?;
            #[allow(clippy::cast_possible_truncation)]
            let zone = Zone::new(digit as u8).map_err(|_| unknown())?;
            if zone == Zone::Main {
                return Err(unknown());
            }
            let field = ZoneField::from_lower(&s[6..]).ok_or_else(unknown)?;
            return Ok(Self::Zone { zone, field });
        }

        if bytes.len() > 2 && bytes[0] == b'r' && bytes[1].is_ascii_digit() {
            let digit = (bytes[1] as char).to_digit(10).ok_or_else(unknown)?;
            if !(1..=8).contains(&digit) || &s[2..] != "#state" {
                return Err(unknown());
            }
            #[allow(clippy::cast_possible_truncation)]
            return Ok(Self::Relay(digit as u8));
        }

        if let Some(rest) = s.strip_prefix("io") {
            let rest_bytes = rest.as_bytes();
            if rest_bytes.is_empty() || !rest_bytes[0].is_ascii_digit() {
                return Err(unknown());
            }
            let digit = (rest_bytes[0] as char).to_digit(10).ok_or_else(unknown)?;
            if !(1..=8).contains(&digit) || &rest[1..] != "#state" {
                return Err(unknown());
            }
            #[allow(clippy::cast_possible_truncation)]
            return Ok(Self::Io(digit as u8));
        }

        if s == "white#temperature" {
            return Ok(Self::White);
        }

        Err(unknown())
    }
}

/// A typed channel value, the payload of state updates.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ChannelValue {
    /// An on/off value.
    OnOff(PowerState),
    /// A decimal value (volume in device units).
    Decimal(f64),
    /// A percentage (0-100).
    Percent(u8),
    /// A free-text value (input source name).
    Text(String),
}

impl ChannelValue {
    /// Creates an on/off value from a boolean.
    #[must_use]
    pub fn on_off(on: bool) -> Self {
        Self::OnOff(PowerState::from_bool(on))
    }
}

impl fmt::Display for ChannelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnOff(state) => write!(f, "{state}"),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Percent(value) => write!(f, "{value}%"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// One committed channel change, ready to publish to the host framework.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelUpdate {
    /// The channel that changed.
    pub channel: ChannelId,
    /// The new value.
    pub value: ChannelValue,
}

impl ChannelUpdate {
    /// Creates an update.
    #[must_use]
    pub fn new(channel: ChannelId, value: ChannelValue) -> Self {
        Self { channel, value }
    }
}

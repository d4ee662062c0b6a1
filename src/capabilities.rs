// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device capability detection and representation.
//!
//! A capability set describes which orthogonal features a concrete device
//! has: receiver zones (power/mute/volume/input), switched relays, IO pins,
//! and an optional tunable-white range. Devices compose capabilities
//! instead of sitting in an inheritance chain, so a receiver with no
//! relays and a relay board with no zones use the same snapshot and diff
//! machinery.
//!
//! # Examples
//!
//! ```
//! use avrelay_lib::Capabilities;
//!
//! let caps = Capabilities::av_receiver();
//! assert_eq!(caps.zones, 2);
//! assert_eq!(caps.relays, 0);
//!
//! let board = Capabilities::relay_board();
//! assert_eq!(board.relays, 8);
//! ```

use crate::channel::{ChannelId, ZoneField};
use crate::types::{ColorTemperatureRange, Volume, Zone};

/// Maximum number of relays or IO pins a board can report.
pub const MAX_PORTS: u8 = 8;

/// The set of features a concrete device supports.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Capabilities {
    /// Number of receiver zones (0 for non-receiver devices, 1-4 otherwise).
    pub zones: u8,
    /// Maximum volume in device units.
    pub volume_max: Volume,
    /// Whether zones support input source selection.
    pub input_select: bool,
    /// Number of switched relays (0-8).
    pub relays: u8,
    /// Number of IO pins (0-8).
    pub ios: u8,
    /// Tunable-white range, if the device has one.
    pub color_temperature: Option<ColorTemperatureRange>,
}

impl Capabilities {
    /// A two-zone AV receiver with volume and input selection.
    #[must_use]
    pub fn av_receiver() -> Self {
        Self {
            zones: 2,
            volume_max: Volume::new(98.0).expect("constant in range"),
            input_select: true,
            relays: 0,
            ios: 0,
            color_temperature: None,
        }
    }

    /// An eight-relay, eight-IO network relay board.
    #[must_use]
    pub fn relay_board() -> Self {
        Self {
            zones: 0,
            volume_max: Volume::MIN,
            input_select: false,
            relays: MAX_PORTS,
            ios: MAX_PORTS,
            color_temperature: None,
        }
    }

    /// Returns a builder for custom capability sets.
    #[must_use]
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::default()
    }

    /// Returns the zones this device exposes.
    pub fn zone_list(&self) -> impl Iterator<Item = Zone> + '_ {
        Zone::ALL.into_iter().take(usize::from(self.zones.min(4)))
    }

    /// Returns `true` if the device exposes the given channel.
    #[must_use]
    pub fn supports_channel(&self, channel: ChannelId) -> bool {
        match channel {
            ChannelId::Zone { zone, field } => {
                zone.number() <= self.zones
                    && (field != ZoneField::Input || self.input_select)
            }
            ChannelId::Relay(index) => index <= self.relays,
            ChannelId::Io(index) => index <= self.ios,
            ChannelId::White => self.color_temperature.is_some(),
        }
    }

    /// Returns every channel the device is expected to report.
    ///
    /// Drives the diff engine's "fields still unset" check during startup.
    #[must_use]
    pub fn expected_channels(&self) -> Vec<ChannelId> {
        let mut channels = Vec::new();
        for zone in self.zone_list() {
            channels.push(ChannelId::zone(zone, ZoneField::Power));
            channels.push(ChannelId::zone(zone, ZoneField::Mute));
            channels.push(ChannelId::zone(zone, ZoneField::Volume));
            if self.input_select {
                channels.push(ChannelId::zone(zone, ZoneField::Input));
            }
        }
        for index in 1..=self.relays.min(MAX_PORTS) {
            channels.push(ChannelId::Relay(index));
        }
        for index in 1..=self.ios.min(MAX_PORTS) {
            channels.push(ChannelId::Io(index));
        }
        if self.color_temperature.is_some() {
            channels.push(ChannelId::White);
        }
        channels
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::av_receiver()
    }
}

/// Builder for [`Capabilities`].
///
/// # Examples
///
/// ```
/// use avrelay_lib::Capabilities;
/// use avrelay_lib::types::Volume;
///
/// let caps = Capabilities::builder()
///     .zones(3)
///     .volume_max(Volume::new(80.0).unwrap())
///     .build();
/// assert_eq!(caps.zones, 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CapabilitiesBuilder {
    zones: Option<u8>,
    volume_max: Option<Volume>,
    input_select: Option<bool>,
    relays: Option<u8>,
    ios: Option<u8>,
    color_temperature: Option<ColorTemperatureRange>,
}

impl CapabilitiesBuilder {
    /// Sets the number of receiver zones (clamped to 4).
    #[must_use]
    pub fn zones(mut self, zones: u8) -> Self {
        self.zones = Some(zones.min(4));
        self
    }

    /// Sets the maximum volume.
    #[must_use]
    pub fn volume_max(mut self, max: Volume) -> Self {
        self.volume_max = Some(max);
        self
    }

    /// Enables or disables input selection.
    #[must_use]
    pub fn input_select(mut self, enabled: bool) -> Self {
        self.input_select = Some(enabled);
        self
    }

    /// Sets the number of relays (clamped to 8).
    #[must_use]
    pub fn relays(mut self, relays: u8) -> Self {
        self.relays = Some(relays.min(MAX_PORTS));
        self
    }

    /// Sets the number of IO pins (clamped to 8).
    #[must_use]
    pub fn ios(mut self, ios: u8) -> Self {
        self.ios = Some(ios.min(MAX_PORTS));
        self
    }

    /// Sets the tunable-white range.
    #[must_use]
    pub fn color_temperature(mut self, range: ColorTemperatureRange) -> Self {
        self.color_temperature = Some(range);
        self
    }

    /// Builds the capability set. Unset fields default to a receiver-less,
    /// relay-less device so every feature is opt-in.
    #[must_use]
    pub fn build(self) -> Capabilities {
        Capabilities {
            zones: self.zones.unwrap_or(0),
            volume_max: self.volume_max.unwrap_or(Volume::MAX),
            input_select: self.input_select.unwrap_or(false),
            relays: self.relays.unwrap_or(0),
            ios: self.ios.unwrap_or(0),
            color_temperature: self.color_temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn av_receiver_preset() {
        let caps = Capabilities::av_receiver();
        assert_eq!(caps.zones, 2);
        assert!(caps.input_select);
        assert_eq!(caps.relays, 0);
        assert!(caps.supports_channel(ChannelId::main(ZoneField::Volume)));
        assert!(caps.supports_channel(ChannelId::zone(Zone::Zone2, ZoneField::Mute)));
        assert!(!caps.supports_channel(ChannelId::zone(Zone::Zone3, ZoneField::Mute)));
        assert!(!caps.supports_channel(ChannelId::Relay(1)));
    }

    #[test]
    fn relay_board_preset() {
        let caps = Capabilities::relay_board();
        assert_eq!(caps.relays, 8);
        assert_eq!(caps.ios, 8);
        assert!(caps.supports_channel(ChannelId::Relay(8)));
        assert!(caps.supports_channel(ChannelId::Io(1)));
        assert!(!caps.supports_channel(ChannelId::main(ZoneField::Power)));
    }

    #[test]
    fn expected_channels_for_receiver() {
        let caps = Capabilities::av_receiver();
        let channels = caps.expected_channels();
        // 2 zones x (power, mute, volume, input)
        assert_eq!(channels.len(), 8);
        assert!(channels.contains(&ChannelId::main(ZoneField::Input)));
        assert!(channels.contains(&ChannelId::zone(Zone::Zone2, ZoneField::Volume)));
    }

    #[test]
    fn expected_channels_without_input_select() {
        let caps = Capabilities::builder().zones(1).build();
        let channels = caps.expected_channels();
        assert_eq!(channels.len(), 3);
        assert!(!channels.contains(&ChannelId::main(ZoneField::Input)));
    }

    #[test]
    fn expected_channels_for_board() {
        let caps = Capabilities::builder().relays(3).ios(2).build();
        let channels = caps.expected_channels();
        assert_eq!(channels.len(), 5);
        assert!(channels.contains(&ChannelId::Relay(3)));
        assert!(channels.contains(&ChannelId::Io(2)));
    }

    #[test]
    fn white_channel_requires_a_range() {
        let plain = Capabilities::builder().relays(8).build();
        assert!(!plain.supports_channel(ChannelId::White));
        assert!(!plain.expected_channels().contains(&ChannelId::White));

        let range = ColorTemperatureRange::new(4000, 2202).unwrap();
        let tunable = Capabilities::builder()
            .relays(8)
            .color_temperature(range)
            .build();
        assert!(tunable.supports_channel(ChannelId::White));
        assert!(tunable.expected_channels().contains(&ChannelId::White));
    }

    #[test]
    fn builder_clamps_counts() {
        let caps = Capabilities::builder().zones(9).relays(12).ios(200).build();
        assert_eq!(caps.zones, 4);
        assert_eq!(caps.relays, 8);
        assert_eq!(caps.ios, 8);
    }
}

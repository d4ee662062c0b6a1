// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state snapshot and diff engine.

use crate::Capabilities;
use crate::channel::{ChannelId, ChannelUpdate, ChannelValue, ZoneField};
use crate::types::{PowerState, Volume, Zone};

use super::{FieldUpdate, StateDelta};

/// State of one receiver zone. Every field is tri-state: `None` means the
/// device has not reported it yet, which must never be conflated with a
/// legal value.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ZoneState {
    /// Zone power (on/standby).
    pub power: Option<PowerState>,
    /// Zone mute flag.
    pub mute: Option<PowerState>,
    /// Zone volume in device units.
    pub volume: Option<Volume>,
    /// Selected input source.
    pub input: Option<String>,
}

/// State of one relay, as reported by the board.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RelayState {
    /// Whether the relay is switched on.
    pub on: bool,
    /// Whether the relay is administratively locked. Write commands to a
    /// locked relay must be rejected and the channel snapped back.
    pub locked: bool,
    /// The relay label.
    pub name: String,
}

/// Tracked state of a device.
///
/// The snapshot is owned exclusively by the device session; decoders and
/// command handlers see it only through the session's lock. Fields start
/// unknown (`None`) and become known on the first device report.
///
/// # Examples
///
/// ```
/// use avrelay_lib::state::{DeviceState, StateDelta, FieldUpdate};
/// use avrelay_lib::types::{PowerState, Zone};
/// use avrelay_lib::Capabilities;
///
/// let mut state = DeviceState::new();
/// let delta = StateDelta::new("PWON").with(FieldUpdate::ZonePower {
///     zone: Zone::Main,
///     state: PowerState::On,
/// });
///
/// let changed = state.apply(&delta, &Capabilities::av_receiver());
/// assert_eq!(changed.len(), 1); // first observation is always reported
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeviceState {
    zones: [ZoneState; 4],
    relays: [Option<RelayState>; 8],
    ios: [Option<PowerState>; 8],
    white: Option<u8>,
    last_raw: Option<String>,
}

impl DeviceState {
    /// Creates a new empty state with every field unknown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Accessors ==========

    /// Returns the state of a zone.
    #[must_use]
    pub fn zone(&self, zone: Zone) -> &ZoneState {
        &self.zones[zone.index()]
    }

    /// Returns the state of a relay, if it has been reported.
    ///
    /// `index` is 1-based; out-of-range indexes return `None`.
    #[must_use]
    pub fn relay(&self, index: u8) -> Option<&RelayState> {
        if !(1..=8).contains(&index) {
            return None;
        }
        self.relays[usize::from(index - 1)].as_ref()
    }

    /// Returns `true` if the relay is known to be locked.
    ///
    /// Unknown relays are treated as unlocked; the device rejects the
    /// write itself if the optimism is wrong.
    #[must_use]
    pub fn relay_locked(&self, index: u8) -> bool {
        self.relay(index).is_some_and(|r| r.locked)
    }

    /// Returns the state of an IO pin, if it has been reported.
    #[must_use]
    pub fn io(&self, index: u8) -> Option<PowerState> {
        if !(1..=8).contains(&index) {
            return None;
        }
        self.ios[usize::from(index - 1)]
    }

    /// Returns the tunable-white position in percent, if reported.
    #[must_use]
    pub fn white(&self) -> Option<u8> {
        self.white
    }

    /// Returns the current value of a channel, or `None` while unknown.
    ///
    /// Also serves as the authoritative value for locked-write snap-backs.
    #[must_use]
    pub fn channel_value(&self, channel: ChannelId) -> Option<ChannelValue> {
        match channel {
            ChannelId::Zone { zone, field } => {
                let state = self.zone(zone);
                match field {
                    ZoneField::Power => state.power.map(ChannelValue::OnOff),
                    ZoneField::Mute => state.mute.map(ChannelValue::OnOff),
                    ZoneField::Volume => {
                        state.volume.map(|v| ChannelValue::Decimal(v.value()))
                    }
                    ZoneField::Input => {
                        state.input.clone().map(ChannelValue::Text)
                    }
                }
            }
            ChannelId::Relay(index) => {
                self.relay(index).map(|r| ChannelValue::on_off(r.on))
            }
            ChannelId::Io(index) => self.io(index).map(ChannelValue::OnOff),
            ChannelId::White => self.white.map(ChannelValue::Percent),
        }
    }

    /// Returns `true` while any channel the device is expected to report
    /// has not been observed yet.
    ///
    /// Suppresses the identical-raw short-circuit during startup so that
    /// sparse reports eventually populate the full snapshot.
    #[must_use]
    pub fn has_unset_fields(&self, caps: &Capabilities) -> bool {
        caps.expected_channels()
            .into_iter()
            .any(|channel| self.channel_value(channel).is_none())
    }

    // ========== Diff engine ==========

    /// Merges a decoded delta and returns the channel updates to publish.
    ///
    /// A channel is reported changed when its new value differs from the
    /// previous one, or when the previous value was still unknown: the
    /// first observation is always published so downstream consumers get
    /// the initial value.
    ///
    /// If the raw wire unit is byte-identical to the previously applied
    /// one and no expected field is unset, the merge short-circuits to a
    /// no-op.
    pub fn apply(&mut self, delta: &StateDelta, caps: &Capabilities) -> Vec<ChannelUpdate> {
        if self.last_raw.as_deref() == Some(delta.raw()) && !self.has_unset_fields(caps) {
            return Vec::new();
        }

        let mut changed = Vec::new();
        for update in delta.updates() {
            self.apply_field(update, &mut changed);
        }
        self.last_raw = Some(delta.raw().to_string());
        changed
    }

    fn apply_field(&mut self, update: &FieldUpdate, changed: &mut Vec<ChannelUpdate>) {
        match update {
            FieldUpdate::ZonePower { zone, state } => {
                let slot = &mut self.zones[zone.index()].power;
                if *slot != Some(*state) {
                    *slot = Some(*state);
                    changed.push(ChannelUpdate::new(
                        ChannelId::zone(*zone, ZoneField::Power),
                        ChannelValue::OnOff(*state),
                    ));
                }
            }
            FieldUpdate::ZoneMute { zone, state } => {
                let slot = &mut self.zones[zone.index()].mute;
                if *slot != Some(*state) {
                    *slot = Some(*state);
                    changed.push(ChannelUpdate::new(
                        ChannelId::zone(*zone, ZoneField::Mute),
                        ChannelValue::OnOff(*state),
                    ));
                }
            }
            FieldUpdate::ZoneVolume { zone, volume } => {
                let slot = &mut self.zones[zone.index()].volume;
                if *slot != Some(*volume) {
                    *slot = Some(*volume);
                    changed.push(ChannelUpdate::new(
                        ChannelId::zone(*zone, ZoneField::Volume),
                        ChannelValue::Decimal(volume.value()),
                    ));
                }
            }
            FieldUpdate::ZoneInput { zone, input } => {
                let slot = &mut self.zones[zone.index()].input;
                if slot.as_deref() != Some(input.as_str()) {
                    *slot = Some(input.clone());
                    changed.push(ChannelUpdate::new(
                        ChannelId::zone(*zone, ZoneField::Input),
                        ChannelValue::Text(input.clone()),
                    ));
                }
            }
            FieldUpdate::Relay {
                index,
                on,
                locked,
                name,
            } => {
                if !(1..=8).contains(index) {
                    return;
                }
                let slot = &mut self.relays[usize::from(index - 1)];
                // A lock-flag or label change alone emits no channel event;
                // only the switched state is externally visible.
                let state_changed = slot.as_ref().is_none_or(|r| r.on != *on);
                let prev_name = slot.as_ref().map(|r| r.name.clone());
                *slot = Some(RelayState {
                    on: *on,
                    locked: *locked,
                    name: name
                        .clone()
                        .or(prev_name)
                        .unwrap_or_default(),
                });
                if state_changed {
                    changed.push(ChannelUpdate::new(
                        ChannelId::Relay(*index),
                        ChannelValue::on_off(*on),
                    ));
                }
            }
            FieldUpdate::Io { index, on } => {
                if !(1..=8).contains(index) {
                    return;
                }
                let slot = &mut self.ios[usize::from(index - 1)];
                let state = PowerState::from_bool(*on);
                if *slot != Some(state) {
                    *slot = Some(state);
                    changed.push(ChannelUpdate::new(
                        ChannelId::Io(*index),
                        ChannelValue::OnOff(state),
                    ));
                }
            }
            FieldUpdate::White { percent } => {
                let percent = (*percent).min(100);
                if self.white != Some(percent) {
                    self.white = Some(percent);
                    changed.push(ChannelUpdate::new(
                        ChannelId::White,
                        ChannelValue::Percent(percent),
                    ));
                }
            }
        }
    }

    /// Clears all state, resetting every field to unknown.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

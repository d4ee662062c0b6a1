// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-to-wire translation.
//!
//! The translator turns one (channel, command) pair into the wire
//! message for the active protocol mode. The zone or index comes from
//! the channel id's structure, matching the wire protocol's own
//! zone-prefix convention. Before emitting a write for a lockable field
//! it consults the device snapshot: a locked relay produces no outbound
//! message, only a snap-back update restoring the authoritative value.

use crate::Capabilities;
use crate::channel::{ChannelId, ChannelUpdate, ZoneField};
use crate::codec::{telnet, udp};
use crate::error::{DeviceError, Error, Result};
use crate::protocol::ProtocolMode;
use crate::state::DeviceState;
use crate::types::{Volume, Zone};
#[cfg(test)]
use crate::types::PowerState;

use super::{Command, StepDirection};

/// The outcome of translating one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// Send this wire message. For telnet this is the line, for UDP the
    /// datagram payload; in HTTP mode the transport wraps the same
    /// telnet-grammar string into a command URL.
    Send(String),
    /// The target is locked: send nothing, republish the authoritative
    /// value so the caller's view snaps back.
    SnapBack(ChannelUpdate),
    /// Nothing to do. Refresh in a mode without an explicit query is a
    /// silent no-op; the value arrives with the next scheduled poll.
    Noop,
}

/// Translates generic commands into protocol wire messages.
///
/// # Examples
///
/// ```
/// use avrelay_lib::Capabilities;
/// use avrelay_lib::channel::{ChannelId, ZoneField};
/// use avrelay_lib::command::{Command, CommandTranslator, Translation};
/// use avrelay_lib::protocol::ProtocolMode;
/// use avrelay_lib::state::DeviceState;
///
/// let translator = CommandTranslator::new(ProtocolMode::Telnet, Capabilities::av_receiver());
/// let state = DeviceState::new();
///
/// let out = translator
///     .translate(ChannelId::main(ZoneField::Volume), &Command::Decimal(45.5), &state)
///     .unwrap();
/// assert_eq!(out, Translation::Send("MV455".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    mode: ProtocolMode,
    capabilities: Capabilities,
    credentials: Option<udp::Credentials>,
}

impl CommandTranslator {
    /// Creates a translator for a protocol mode and capability set.
    #[must_use]
    pub fn new(mode: ProtocolMode, capabilities: Capabilities) -> Self {
        Self {
            mode,
            capabilities,
            credentials: None,
        }
    }

    /// Sets the credentials stamped into relay-board write frames.
    #[must_use]
    pub fn with_credentials(mut self, credentials: udp::Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Translates a command for a channel.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnknownChannel` if the device does not
    /// expose the channel, `DeviceError::UnsupportedCommand` if the
    /// command kind has no mapping for it, and `Error::Configuration`
    /// if a relay write lacks credentials. These are local, per-call
    /// rejections; they never affect connection health.
    pub fn translate(
        &self,
        channel: ChannelId,
        command: &Command,
        state: &DeviceState,
    ) -> Result<Translation> {
        if !self.capabilities.supports_channel(channel) {
            return Err(DeviceError::UnknownChannel(channel.to_string()).into());
        }

        if let ChannelId::Relay(index) = channel {
            if command.is_write() && state.relay_locked(index) {
                return Ok(match state.channel_value(channel) {
                    Some(value) => Translation::SnapBack(ChannelUpdate::new(channel, value)),
                    None => Translation::Noop,
                });
            }
        }

        match channel {
            ChannelId::Zone { zone, field } => self.translate_zone(channel, zone, field, command),
            ChannelId::Relay(index) => self.translate_port(channel, index, command, false),
            ChannelId::Io(index) => self.translate_port(channel, index, command, true),
            ChannelId::White => self.translate_white(channel, command),
        }
    }

    fn translate_zone(
        &self,
        channel: ChannelId,
        zone: Zone,
        field: ZoneField,
        command: &Command,
    ) -> Result<Translation> {
        if self.mode == ProtocolMode::Udp {
            return Err(unsupported(channel, command));
        }
        if let Command::Refresh = command {
            return Ok(self.zone_refresh(zone, field));
        }

        let line = match (field, command) {
            (ZoneField::Power, Command::OnOff(state)) => telnet::encode_power(zone, *state),
            (ZoneField::Mute, Command::OnOff(state)) => telnet::encode_mute(zone, *state),
            (ZoneField::Input, Command::Text(input)) => telnet::encode_input(zone, input),
            (ZoneField::Volume, Command::Decimal(value)) => {
                let volume = Volume::new(*value)?.rounded_to_half_step();
                telnet::encode_volume(zone, volume).ok_or_else(|| unsupported(channel, command))?
            }
            (ZoneField::Volume, Command::Percent(percent)) => {
                let volume =
                    Volume::from_percent(f64::from(*percent), self.capabilities.volume_max);
                telnet::encode_volume(zone, volume).ok_or_else(|| unsupported(channel, command))?
            }
            (ZoneField::Volume, Command::IncreaseDecrease(direction)) => {
                telnet::encode_volume_step(zone, *direction == StepDirection::Increase)
            }
            _ => return Err(unsupported(channel, command)),
        };
        Ok(Translation::Send(line))
    }

    /// Refresh of a zone field: telnet has per-field queries, HTTP has
    /// none (the poll delivers the whole document).
    fn zone_refresh(&self, zone: Zone, field: ZoneField) -> Translation {
        if self.mode != ProtocolMode::Telnet {
            return Translation::Noop;
        }
        let query = match (zone.prefix(), field) {
            (None, ZoneField::Power) => "PW?".to_string(),
            (None, ZoneField::Volume) => "MV?".to_string(),
            (None, ZoneField::Mute) => "MU?".to_string(),
            (None, ZoneField::Input) => "SI?".to_string(),
            (Some(prefix), ZoneField::Mute) => format!("{prefix}MU?"),
            (Some(prefix), _) => format!("{prefix}?"),
        };
        Translation::Send(query)
    }

    fn translate_port(
        &self,
        channel: ChannelId,
        index: u8,
        command: &Command,
        io: bool,
    ) -> Result<Translation> {
        if self.mode != ProtocolMode::Udp {
            return Err(unsupported(channel, command));
        }
        match command {
            Command::OnOff(state) => {
                let credentials = self.credentials.as_ref().ok_or_else(|| {
                    Error::Configuration("relay board writes require credentials".to_string())
                })?;
                let frame = if io {
                    udp::encode_io_write(index, state.is_on(), credentials)?
                } else {
                    udp::encode_relay_write(index, state.is_on(), credentials)?
                };
                Ok(Translation::Send(frame))
            }
            // Boards answer the discovery probe with a full status frame.
            Command::Refresh => Ok(Translation::Send(udp::DISCOVERY_REQUEST.to_string())),
            _ => Err(unsupported(channel, command)),
        }
    }

    /// The tunable-white channel accepts its position in percent or as a
    /// kelvin value, which is mapped through the configured range.
    fn translate_white(&self, channel: ChannelId, command: &Command) -> Result<Translation> {
        if self.mode != ProtocolMode::Udp {
            return Err(unsupported(channel, command));
        }
        let percent = match command {
            Command::Percent(percent) => *percent,
            Command::Decimal(kelvin) => {
                let range = self
                    .capabilities
                    .color_temperature
                    .ok_or_else(|| unsupported(channel, command))?;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let kelvin = kelvin.max(0.0).round() as u32;
                range.percent(kelvin)
            }
            Command::Refresh => return Ok(Translation::Send(udp::DISCOVERY_REQUEST.to_string())),
            _ => return Err(unsupported(channel, command)),
        };
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            Error::Configuration("relay board writes require credentials".to_string())
        })?;
        Ok(Translation::Send(udp::encode_white_write(
            percent,
            credentials,
        )?))
    }
}

fn unsupported(channel: ChannelId, command: &Command) -> Error {
    DeviceError::UnsupportedCommand {
        command: command.kind().to_string(),
        channel: channel.to_string(),
    }
    .into()
}

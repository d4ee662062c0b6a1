// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AV receiver telnet grammar.
//!
//! Receivers speak newline-terminated ASCII lines of the form
//! `<prefix><value>`. The main zone uses dedicated two-letter prefixes
//! (`PW`, `MV`, `MU`, `SI`); secondary zones share a zone prefix (`Z2`,
//! `Z3`, `Z4`) followed by a sub-command:
//!
//! | line      | meaning                |
//! |-----------|------------------------|
//! | `PWON`    | main power on          |
//! | `MV455`   | main volume 45.5       |
//! | `MUOFF`   | main mute off          |
//! | `SIDVD`   | main input DVD         |
//! | `Z2ON`    | zone 2 power on        |
//! | `Z2MUON`  | zone 2 mute on         |
//! | `Z2455`   | zone 2 volume 45.5     |
//! | `Z2TUNER` | zone 2 input TUNER     |
//!
//! A `?` value queries the current state (`MV?`, `Z2MU?`).
//!
//! Decoding walks a declarative rule table (prefix, zone, field) with one
//! generic loop; adding a prefix means adding a table row, not a parser
//! branch. Lines the table does not know (`MVMAX 80`, event noise) decode
//! to an empty delta and are skipped. Devices occasionally insert spaces
//! (`Z2MU ON`); decoders tolerate them, encoders always emit the compact
//! form.

use tracing::debug;

use crate::state::{FieldUpdate, StateDelta};
use crate::types::{PowerState, Volume, Zone};

/// The per-zone property a grammar rule addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Power,
    Volume,
    Mute,
    Input,
}

/// One row of the main-zone grammar table.
struct Rule {
    prefix: &'static str,
    field: Field,
}

/// Main-zone prefixes in match order. `MU` must come before any rule
/// whose value could start with `U`; the table is ordered, first match
/// wins.
const MAIN_RULES: &[Rule] = &[
    Rule {
        prefix: "PW",
        field: Field::Power,
    },
    Rule {
        prefix: "MV",
        field: Field::Volume,
    },
    Rule {
        prefix: "MU",
        field: Field::Mute,
    },
    Rule {
        prefix: "SI",
        field: Field::Input,
    },
];

/// Decodes one received line into a state delta.
///
/// Unknown or garbled lines produce an empty delta; the caller skips the
/// unit. Never fails: telnet receivers emit plenty of lines this library
/// has no interest in.
#[must_use]
pub fn decode_line(line: &str) -> StateDelta {
    let mut delta = StateDelta::new(line);
    let cleaned: String = line.trim().chars().filter(|c| !c.is_control()).collect();
    if cleaned.len() < 3 || !cleaned.is_ascii() {
        return delta;
    }

    let (zone, rest) = match Zone::from_prefix(&cleaned[..2]) {
        Some(zone) => (zone, &cleaned[2..]),
        None => (Zone::Main, cleaned.as_str()),
    };

    let parsed = if zone == Zone::Main {
        decode_main(rest)
    } else {
        decode_zone(zone, rest)
    };

    match parsed {
        Some(update) => delta.push(update),
        None => debug!(line = %cleaned, "skipping unrecognized line"),
    }
    delta
}

fn decode_main(rest: &str) -> Option<FieldUpdate> {
    let rule = MAIN_RULES
        .iter()
        .find(|rule| rest.starts_with(rule.prefix))?;
    let value = rest[rule.prefix.len()..].trim();
    decode_field(Zone::Main, rule.field, value)
}

/// Secondary zones multiplex every field behind one prefix; the value
/// shape disambiguates: `MU…` is mute, `ON`/`OFF` is power, digits are
/// volume, anything else is the input name.
fn decode_zone(zone: Zone, rest: &str) -> Option<FieldUpdate> {
    if let Some(value) = rest.strip_prefix("MU") {
        return decode_field(zone, Field::Mute, value.trim());
    }
    if matches!(rest, "ON" | "OFF") {
        return decode_field(zone, Field::Power, rest);
    }
    if rest.bytes().all(|b| b.is_ascii_digit()) {
        return decode_field(zone, Field::Volume, rest);
    }
    decode_field(zone, Field::Input, rest.trim())
}

fn decode_field(zone: Zone, field: Field, value: &str) -> Option<FieldUpdate> {
    match field {
        Field::Power => Some(FieldUpdate::ZonePower {
            zone,
            state: value.parse().ok()?,
        }),
        Field::Mute => Some(FieldUpdate::ZoneMute {
            zone,
            state: value.parse().ok()?,
        }),
        Field::Volume => Some(FieldUpdate::ZoneVolume {
            zone,
            volume: Volume::decode(value).ok()?,
        }),
        Field::Input => {
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
                return None;
            }
            Some(FieldUpdate::ZoneInput {
                zone,
                input: value.to_string(),
            })
        }
    }
}

// ========== Encode ==========

/// Encodes a zone power command.
///
/// Main power off goes on the wire as `PWSTANDBY`; secondary zones use
/// plain `ON`/`OFF`.
#[must_use]
pub fn encode_power(zone: Zone, state: PowerState) -> String {
    match (zone.prefix(), state) {
        (None, PowerState::On) => "PWON".to_string(),
        (None, PowerState::Off) => "PWSTANDBY".to_string(),
        (Some(prefix), state) => format!("{prefix}{}", state.wire_token()),
    }
}

/// Encodes a zone volume command (`MV455`, `Z2455`).
///
/// The volume must sit on a half step; round first.
#[must_use]
pub fn encode_volume(zone: Zone, volume: Volume) -> Option<String> {
    let value = volume.encode().ok()?;
    Some(match zone.prefix() {
        None => format!("MV{value}"),
        Some(prefix) => format!("{prefix}{value}"),
    })
}

/// Encodes a volume step command (`MVUP`, `Z2DOWN`).
#[must_use]
pub fn encode_volume_step(zone: Zone, up: bool) -> String {
    let step = if up { "UP" } else { "DOWN" };
    match zone.prefix() {
        None => format!("MV{step}"),
        Some(prefix) => format!("{prefix}{step}"),
    }
}

/// Encodes a mute command (`MUON`, `Z2MUOFF`).
#[must_use]
pub fn encode_mute(zone: Zone, state: PowerState) -> String {
    match zone.prefix() {
        None => format!("MU{}", state.wire_token()),
        Some(prefix) => format!("{prefix}MU{}", state.wire_token()),
    }
}

/// Encodes an input selection command (`SIDVD`, `Z2TUNER`).
#[must_use]
pub fn encode_input(zone: Zone, input: &str) -> String {
    match zone.prefix() {
        None => format!("SI{input}"),
        Some(prefix) => format!("{prefix}{input}"),
    }
}

/// The query lines that refresh every field of a zone.
#[must_use]
pub fn refresh_queries(zone: Zone) -> Vec<String> {
    match zone.prefix() {
        None => ["PW?", "MV?", "MU?", "SI?"]
            .iter()
            .map(ToString::to_string)
            .collect(),
        Some(prefix) => vec![format!("{prefix}?"), format!("{prefix}MU?")],
    }
}

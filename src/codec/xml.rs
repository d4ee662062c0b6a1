// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver zone status XML documents.
//!
//! Receivers with a web interface expose a lite status document per zone:
//!
//! ```xml
//! <item>
//!   <Power><value>ON</value></Power>
//!   <InputFuncSelect><value>DVD</value></InputFuncSelect>
//!   <MasterVolume><value>45.5</value></MasterVolume>
//!   <Mute><value>off</value></Mute>
//! </item>
//! ```
//!
//! Element names arrive in the device's UpperCamel spelling and are bound
//! to snake_case fields via serde rename attributes. A field whose value
//! the device cannot provide is reported as `--` and skipped.
//!
//! Commands ride the same web interface: the telnet-grammar command
//! string is passed as the query of a fixed app-direct path, so the
//! telnet codec remains the single encoder.

use serde::Deserialize;

use crate::error::ParseError;
use crate::state::{FieldUpdate, StateDelta};
use crate::types::{Volume, Zone};

/// A placeholder the device sends for unavailable values.
const UNSET_VALUE: &str = "--";

#[derive(Debug, Deserialize)]
struct ValueTag {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "item")]
struct ZoneStatusDoc {
    #[serde(rename = "Power")]
    power: Option<ValueTag>,
    #[serde(rename = "InputFuncSelect")]
    input_func_select: Option<ValueTag>,
    #[serde(rename = "MasterVolume")]
    master_volume: Option<ValueTag>,
    #[serde(rename = "Mute")]
    mute: Option<ValueTag>,
}

/// Returns the status document path for a zone.
#[must_use]
pub fn zone_status_path(zone: Zone) -> String {
    match zone {
        Zone::Main => "/goform/formMainZone_MainZoneXmlStatusLite.xml".to_string(),
        other => {
            let n = other.number();
            format!("/goform/formZone{n}_Zone{n}XmlStatusLite.xml")
        }
    }
}

/// Returns the command path carrying a telnet-grammar command string.
#[must_use]
pub fn command_path(command: &str) -> String {
    format!("/goform/formiPhoneAppDirect.xml?{command}")
}

/// Decodes a zone status document into a state delta.
///
/// Fields the document omits or reports as `--` are skipped; a value
/// that is present but malformed fails the whole document (it is one
/// wire unit).
///
/// # Errors
///
/// Returns `ParseError::Xml` when the document is not well-formed, or
/// `ParseError::InvalidValue` for a malformed field value.
pub fn decode_zone_status(xml: &str, zone: Zone) -> Result<StateDelta, ParseError> {
    let doc: ZoneStatusDoc = quick_xml::de::from_str(xml)?;
    let mut delta = StateDelta::new(xml);

    if let Some(value) = present(&doc.power) {
        let state = value.parse().map_err(|_| ParseError::InvalidValue {
            field: "Power".to_string(),
            message: format!("unexpected token {value:?}"),
        })?;
        delta.push(FieldUpdate::ZonePower { zone, state });
    }

    if let Some(value) = present(&doc.mute) {
        let state = value
            .to_ascii_uppercase()
            .parse()
            .map_err(|_| ParseError::InvalidValue {
                field: "Mute".to_string(),
                message: format!("unexpected token {value:?}"),
            })?;
        delta.push(FieldUpdate::ZoneMute { zone, state });
    }

    if let Some(value) = present(&doc.master_volume) {
        let parsed: f64 = value.parse().map_err(|_| ParseError::InvalidValue {
            field: "MasterVolume".to_string(),
            message: format!("not a decimal: {value:?}"),
        })?;
        let volume = Volume::new(parsed).map_err(|_| ParseError::InvalidValue {
            field: "MasterVolume".to_string(),
            message: format!("out of range: {parsed}"),
        })?;
        delta.push(FieldUpdate::ZoneVolume { zone, volume });
    }

    if let Some(value) = present(&doc.input_func_select) {
        delta.push(FieldUpdate::ZoneInput {
            zone,
            input: value.to_string(),
        });
    }

    Ok(delta)
}

fn present(tag: &Option<ValueTag>) -> Option<&str> {
    let value = tag.as_ref()?.value.as_deref()?.trim();
    if value.is_empty() || value == UNSET_VALUE {
        return None;
    }
    Some(value)
}

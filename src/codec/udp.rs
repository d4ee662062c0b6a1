// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relay-board UDP datagram grammar.
//!
//! Boards answer the plaintext broadcast `wer da?` (and every state
//! change) with a colon-separated status line:
//!
//! ```text
//! NET-PwrCtrl:NAME:192.168.1.40:Pump,1,0:Light,0,0:...:IO:Door,1:...:End
//! ```
//!
//! Field 0 is the fixed prefix, fields 1-2 name the board and its
//! address, then one `name,state,locked` triple per relay. An optional
//! `IO` marker introduces `name,state` pairs for the input pins, an
//! optional `Wh` marker carries the tunable-white position in percent,
//! and a trailing `End` closes the frame. Boards reject bad credentials
//! or missing rights in-band with `NoPass` / `NoAccess` in place of the
//! board name.
//!
//! Writes are single-line frames carrying the credentials:
//! `Sw_on3useracct` switches relay 3 on for user `user`, password
//! `acct`; `Wh_75useracct` moves the tunable-white port to 75%.

use crate::error::{ParseError, ValueError};
use crate::state::{FieldUpdate, StateDelta};

/// The broadcast probe every board answers.
pub const DISCOVERY_REQUEST: &str = "wer da?";

/// Fixed first field of every board frame.
pub const STATUS_PREFIX: &str = "NET-PwrCtrl";

/// In-band marker for rejected credentials.
pub const MARKER_NO_PASS: &str = "NoPass";

/// In-band marker for insufficient rights.
pub const MARKER_NO_ACCESS: &str = "NoAccess";

/// Username/password pair sent with every write frame.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Credentials {
    /// Account user name.
    pub user: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

/// One decoded board datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardMessage {
    /// A status frame: board name, address, and the decoded delta.
    Status {
        /// The board's self-reported name.
        name: String,
        /// The board's self-reported address.
        host: String,
        /// Relay and IO updates carried by the frame.
        delta: StateDelta,
    },
    /// The board rejected the configured credentials.
    AuthenticationRejected,
    /// The account lacks rights for the requested operation.
    AccessDenied,
}

/// Decodes one received datagram.
///
/// # Errors
///
/// Returns `ParseError::UnexpectedFormat` when the frame does not start
/// with the board prefix or a field does not match the grammar; the
/// caller skips the datagram (and counts the failure).
pub fn decode_datagram(payload: &str) -> Result<BoardMessage, ParseError> {
    let trimmed = payload.trim();
    let mut fields = trimmed.split(':');

    if fields.next() != Some(STATUS_PREFIX) {
        return Err(ParseError::UnexpectedFormat(format!(
            "datagram does not start with {STATUS_PREFIX}"
        )));
    }

    let name = fields
        .next()
        .ok_or_else(|| ParseError::MissingField("name".to_string()))?;
    match name {
        MARKER_NO_PASS => return Ok(BoardMessage::AuthenticationRejected),
        MARKER_NO_ACCESS => return Ok(BoardMessage::AccessDenied),
        _ => {}
    }

    let host = fields
        .next()
        .ok_or_else(|| ParseError::MissingField("host".to_string()))?;

    let mut delta = StateDelta::new(trimmed);
    let mut relay_index: u8 = 0;
    let mut io_index: u8 = 0;
    let mut in_io_section = false;
    let mut next_is_white = false;

    for field in fields {
        match field {
            "IO" => {
                in_io_section = true;
                continue;
            }
            "Wh" => {
                next_is_white = true;
                continue;
            }
            "End" => break,
            _ => {}
        }
        if next_is_white {
            next_is_white = false;
            delta.push(FieldUpdate::White {
                percent: decode_percent(field)?,
            });
        } else if in_io_section {
            io_index += 1;
            let (_, on) = decode_pair(field, io_index)?;
            delta.push(FieldUpdate::Io {
                index: io_index,
                on,
            });
        } else {
            relay_index += 1;
            let (name, on, locked) = decode_triple(field, relay_index)?;
            delta.push(FieldUpdate::Relay {
                index: relay_index,
                on,
                locked,
                name: Some(name.to_string()),
            });
        }
    }

    Ok(BoardMessage::Status {
        name: name.to_string(),
        host: host.to_string(),
        delta,
    })
}

/// A relay field: `name,state,locked`.
fn decode_triple(field: &str, index: u8) -> Result<(&str, bool, bool), ParseError> {
    let mut parts = field.split(',');
    let name = parts.next().unwrap_or_default();
    let on = decode_flag(parts.next(), index, "state")?;
    let locked = decode_flag(parts.next(), index, "locked")?;
    if parts.next().is_some() {
        return Err(ParseError::UnexpectedFormat(format!(
            "relay {index} field has too many parts"
        )));
    }
    Ok((name, on, locked))
}

/// An IO field: `name,state`.
fn decode_pair(field: &str, index: u8) -> Result<(&str, bool), ParseError> {
    let mut parts = field.split(',');
    let name = parts.next().unwrap_or_default();
    let on = decode_flag(parts.next(), index, "state")?;
    if parts.next().is_some() {
        return Err(ParseError::UnexpectedFormat(format!(
            "io {index} field has too many parts"
        )));
    }
    Ok((name, on))
}

/// The tunable-white field: a bare percentage.
fn decode_percent(field: &str) -> Result<u8, ParseError> {
    let percent: u8 = field.parse().map_err(|_| ParseError::InvalidValue {
        field: "white".to_string(),
        message: format!("expected a percentage, got {field:?}"),
    })?;
    if percent > 100 {
        return Err(ParseError::InvalidValue {
            field: "white".to_string(),
            message: format!("percentage {percent} exceeds 100"),
        });
    }
    Ok(percent)
}

fn decode_flag(part: Option<&str>, index: u8, what: &str) -> Result<bool, ParseError> {
    match part {
        Some("0") => Ok(false),
        Some("1") => Ok(true),
        other => Err(ParseError::InvalidValue {
            field: format!("{what} {index}"),
            message: format!("expected 0 or 1, got {other:?}"),
        }),
    }
}

// ========== Encode ==========

/// Encodes a relay write frame (`Sw_on3useracct`).
///
/// # Errors
///
/// Returns `ValueError::InvalidIndex` for relay indexes outside 1-8.
pub fn encode_relay_write(
    index: u8,
    on: bool,
    credentials: &Credentials,
) -> Result<String, ValueError> {
    encode_write("Sw", index, on, credentials)
}

/// Encodes an IO pin write frame (`IO_on5useracct`).
///
/// # Errors
///
/// Returns `ValueError::InvalidIndex` for pin indexes outside 1-8.
pub fn encode_io_write(
    index: u8,
    on: bool,
    credentials: &Credentials,
) -> Result<String, ValueError> {
    encode_write("IO", index, on, credentials)
}

/// Encodes a tunable-white write frame (`Wh_75useracct`).
///
/// # Errors
///
/// Returns `ValueError::OutOfRange` for percentages above 100.
pub fn encode_white_write(
    percent: u8,
    credentials: &Credentials,
) -> Result<String, ValueError> {
    if percent > 100 {
        return Err(ValueError::OutOfRange {
            min: 0.0,
            max: 100.0,
            actual: f64::from(percent),
        });
    }
    Ok(format!(
        "Wh_{percent}{}{}",
        credentials.user, credentials.password
    ))
}

fn encode_write(
    kind: &str,
    index: u8,
    on: bool,
    credentials: &Credentials,
) -> Result<String, ValueError> {
    if !(1..=8).contains(&index) {
        return Err(ValueError::InvalidIndex(index));
    }
    let action = if on { "on" } else { "off" };
    Ok(format!(
        "{kind}_{action}{index}{}{}",
        credentials.user, credentials.password
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str =
        "NET-PwrCtrl:ANEL1:192.168.1.40:Pump,1,0:Light,0,0:Heater,0,1:IO:Door,1:Window,0:End";

    fn creds() -> Credentials {
        Credentials::new("user", "acct")
    }

    #[test]
    fn decode_status_frame() {
        let message = decode_datagram(STATUS).unwrap();
        let BoardMessage::Status { name, host, delta } = message else {
            panic!("expected status");
        };
        assert_eq!(name, "ANEL1");
        assert_eq!(host, "192.168.1.40");
        assert_eq!(delta.updates().len(), 5);
        assert_eq!(
            delta.updates()[0],
            FieldUpdate::Relay {
                index: 1,
                on: true,
                locked: false,
                name: Some("Pump".to_string()),
            }
        );
        assert_eq!(
            delta.updates()[2],
            FieldUpdate::Relay {
                index: 3,
                on: false,
                locked: true,
                name: Some("Heater".to_string()),
            }
        );
        assert_eq!(delta.updates()[3], FieldUpdate::Io { index: 1, on: true });
        assert_eq!(delta.updates()[4], FieldUpdate::Io { index: 2, on: false });
    }

    #[test]
    fn decode_status_without_io_section() {
        let message = decode_datagram("NET-PwrCtrl:B:10.0.0.2:R1,0,0:R2,1,0:End").unwrap();
        let BoardMessage::Status { delta, .. } = message else {
            panic!("expected status");
        };
        assert_eq!(delta.updates().len(), 2);
    }

    #[test]
    fn decode_status_with_white_section() {
        let message =
            decode_datagram("NET-PwrCtrl:B:10.0.0.2:R1,1,0:IO:Door,0:Wh:75:End").unwrap();
        let BoardMessage::Status { delta, .. } = message else {
            panic!("expected status");
        };
        assert_eq!(delta.updates().len(), 3);
        assert_eq!(delta.updates()[2], FieldUpdate::White { percent: 75 });
    }

    #[test]
    fn decode_rejects_garbled_white_field() {
        assert!(decode_datagram("NET-PwrCtrl:B:h:R1,1,0:Wh:warm:End").is_err());
        assert!(decode_datagram("NET-PwrCtrl:B:h:R1,1,0:Wh:101:End").is_err());
    }

    #[test]
    fn decode_error_markers() {
        assert_eq!(
            decode_datagram("NET-PwrCtrl:NoPass:192.168.1.40").unwrap(),
            BoardMessage::AuthenticationRejected
        );
        assert_eq!(
            decode_datagram("NET-PwrCtrl:NoAccess:192.168.1.40").unwrap(),
            BoardMessage::AccessDenied
        );
    }

    #[test]
    fn decode_rejects_foreign_frames() {
        assert!(decode_datagram("hello world").is_err());
        assert!(decode_datagram("").is_err());
        assert!(decode_datagram("NET-PwrCtrl").is_err());
    }

    #[test]
    fn decode_rejects_garbled_fields() {
        assert!(decode_datagram("NET-PwrCtrl:B:10.0.0.2:R1,maybe,0:End").is_err());
        assert!(decode_datagram("NET-PwrCtrl:B:10.0.0.2:R1,1:End").is_err());
        assert!(decode_datagram("NET-PwrCtrl:B:10.0.0.2:R1,1,0,9:End").is_err());
    }

    #[test]
    fn decode_trims_datagram_whitespace() {
        assert!(decode_datagram("NET-PwrCtrl:B:h:R1,1,0:End\r\n").is_ok());
    }

    #[test]
    fn encode_relay_frames() {
        assert_eq!(encode_relay_write(3, true, &creds()).unwrap(), "Sw_on3useracct");
        assert_eq!(
            encode_relay_write(8, false, &creds()).unwrap(),
            "Sw_off8useracct"
        );
    }

    #[test]
    fn encode_io_frames() {
        assert_eq!(encode_io_write(5, true, &creds()).unwrap(), "IO_on5useracct");
    }

    #[test]
    fn encode_white_frames() {
        assert_eq!(encode_white_write(75, &creds()).unwrap(), "Wh_75useracct");
        assert_eq!(encode_white_write(0, &creds()).unwrap(), "Wh_0useracct");
        assert!(matches!(
            encode_white_write(101, &creds()),
            Err(ValueError::OutOfRange { .. })
        ));
    }

    #[test]
    fn encode_rejects_bad_indexes() {
        assert_eq!(
            encode_relay_write(0, true, &creds()),
            Err(ValueError::InvalidIndex(0))
        );
        assert_eq!(
            encode_io_write(9, true, &creds()),
            Err(ValueError::InvalidIndex(9))
        );
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `AvRelay` library.
//!
//! This module provides the error hierarchy for failures across the library:
//! value validation, transport communication, wire-format parsing, and
//! session/command handling.
//!
//! Transport and parse errors are recoverable and are normally absorbed by
//! the per-session health tracker; only after its thresholds are crossed do
//! they surface as an offline status. Configuration and authorization errors
//! bypass the counters and surface immediately.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during transport communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a wire payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error occurred during session or command handling.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Session configuration is missing or invalid.
    ///
    /// Fatal until the caller reconfigures; never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Session is not connected.
    #[error("session is not connected")]
    NotConnected,
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
        /// The actual value that was provided.
        actual: f64,
    },

    /// A volume has a fractional part other than .0 or .5 and cannot be
    /// put on the wire.
    #[error("volume {0} is not representable in half steps")]
    NotRepresentable(f64),

    /// An invalid power state token was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// An invalid zone number was provided.
    #[error("zone {0} is out of range [1, 4]")]
    InvalidZone(u8),

    /// An invalid relay or IO index was provided.
    #[error("index {0} is out of range [1, 8]")]
    InvalidIndex(u8),
}

/// Errors related to transport communication (telnet/UDP/HTTP).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Opening the underlying socket failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A single send attempt failed. Transient; the caller owns retry policy.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid host or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The device rejected the configured credentials in-band.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The device reported insufficient rights for the requested operation.
    #[error("insufficient rights")]
    InsufficientRights,

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to parsing wire payloads.
///
/// A parse error covers one wire unit (line, datagram or document); the
/// decoders skip unparseable units rather than aborting a whole decode.
#[derive(Debug, Error)]
pub enum ParseError {
    /// XML parsing failed.
    #[cfg(feature = "http")]
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// The payload does not match the expected grammar.
    #[error("unexpected payload format: {0}")]
    UnexpectedFormat(String),

    /// Expected field is missing from the payload.
    #[error("missing field in payload: {0}")]
    MissingField(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Errors related to session and command handling.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The command type has no mapping for the target channel.
    ///
    /// A local, per-call rejection; never affects connection health.
    #[error("command {command} is not supported on channel {channel}")]
    UnsupportedCommand {
        /// The command kind that was rejected.
        command: String,
        /// The target channel.
        channel: String,
    },

    /// The channel id does not name a known channel.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// The device does not have the requested capability.
    #[error("device does not support {capability}")]
    UnsupportedCapability {
        /// The capability that is not supported.
        capability: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

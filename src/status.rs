// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Externally visible session status.
//!
//! The status is the single error signal a session exposes: a coarse
//! online/offline state plus a detail enum and a human-readable message.
//! Transport and decode errors never surface here directly; the
//! [`HealthTracker`](crate::health::HealthTracker) decides when they have
//! accumulated into a status transition.

use std::fmt;

/// Coarse session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SessionStatus {
    /// The session is connecting or reconnecting.
    Connecting,
    /// The device is reachable and answering.
    Online,
    /// The device is not usable; see [`StatusDetail`].
    Offline,
}

impl SessionStatus {
    /// Returns `true` if the status is [`SessionStatus::Online`].
    #[must_use]
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("CONNECTING"),
            Self::Online => f.write_str("ONLINE"),
            Self::Offline => f.write_str("OFFLINE"),
        }
    }
}

/// The reason attached to an offline status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StatusDetail {
    /// No additional detail (the normal online case).
    None,
    /// Repeated send or decode failures at the transport layer.
    CommunicationError,
    /// Bad host, bad credentials, or an in-band authorization rejection.
    ConfigurationError,
    /// The transport works but the device never answers refresh requests.
    NoResponse,
}

impl fmt::Display for StatusDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("NONE"),
            Self::CommunicationError => f.write_str("COMMUNICATION_ERROR"),
            Self::ConfigurationError => f.write_str("CONFIGURATION_ERROR"),
            Self::NoResponse => f.write_str("NO_RESPONSE"),
        }
    }
}

/// One committed status transition, ready to publish.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatusUpdate {
    /// The new coarse status.
    pub status: SessionStatus,
    /// The detail for offline statuses.
    pub detail: StatusDetail,
    /// Human-readable description of the cause, if any.
    pub message: Option<String>,
}

impl StatusUpdate {
    /// An online status with no detail.
    #[must_use]
    pub fn online() -> Self {
        Self {
            status: SessionStatus::Online,
            detail: StatusDetail::None,
            message: None,
        }
    }

    /// An offline status with a detail and message.
    #[must_use]
    pub fn offline(detail: StatusDetail, message: impl Into<String>) -> Self {
        Self {
            status: SessionStatus::Offline,
            detail,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(SessionStatus::Online.to_string(), "ONLINE");
        assert_eq!(StatusDetail::NoResponse.to_string(), "NO_RESPONSE");
    }

    #[test]
    fn constructors() {
        let up = StatusUpdate::offline(StatusDetail::CommunicationError, "3 send failures");
        assert_eq!(up.status, SessionStatus::Offline);
        assert_eq!(up.detail, StatusDetail::CommunicationError);
        assert!(StatusUpdate::online().message.is_none());
    }

    #[test]
    fn is_online() {
        assert!(SessionStatus::Online.is_online());
        assert!(!SessionStatus::Offline.is_online());
        assert!(!SessionStatus::Connecting.is_online());
    }
}

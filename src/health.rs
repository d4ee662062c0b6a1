// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Consecutive-failure tracking and the online/offline state machine.
//!
//! The tracker counts consecutive send failures, decode failures and
//! unanswered refresh cycles. Crossing a threshold transitions the
//! externally visible status exactly once; further failures while already
//! offline return no new transition, so the caller neither re-publishes
//! the status nor re-logs the cause on every poll. Any success resets all
//! counters and restores the online status.
//!
//! Configuration and authorization failures bypass the counters and go
//! offline immediately.
//!
//! # Examples
//!
//! ```
//! use avrelay_lib::health::HealthTracker;
//! use avrelay_lib::status::{SessionStatus, StatusDetail};
//!
//! let mut health = HealthTracker::new("192.168.1.40");
//!
//! assert!(health.record_send_failure().is_none());
//! assert!(health.record_send_failure().is_none());
//! let transition = health.record_send_failure().unwrap();
//! assert_eq!(transition.status, SessionStatus::Offline);
//! assert_eq!(transition.detail, StatusDetail::CommunicationError);
//!
//! let back = health.record_success().unwrap();
//! assert_eq!(back.status, SessionStatus::Online);
//! ```

use tracing::{debug, warn};

use crate::status::{SessionStatus, StatusDetail, StatusUpdate};

/// Consecutive send or decode failures before going offline.
pub const COMMUNICATION_ERROR_THRESHOLD: u32 = 3;

/// Consecutive unanswered refresh cycles before going offline.
///
/// Larger than the communication threshold: an unanswered refresh means
/// the transport still works but the device stays silent, which deserves
/// a distinct status and a little more patience.
pub const NO_RESPONSE_THRESHOLD: u32 = 5;

/// Per-session failure counters and status state machine.
#[derive(Debug)]
pub struct HealthTracker {
    host: String,
    status: SessionStatus,
    detail: StatusDetail,
    send_failures: u32,
    decode_failures: u32,
    unanswered_refreshes: u32,
}

impl HealthTracker {
    /// Creates a tracker for a device host, starting in the connecting
    /// state with all counters at zero.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            status: SessionStatus::Connecting,
            detail: StatusDetail::None,
            send_failures: 0,
            decode_failures: 0,
            unanswered_refreshes: 0,
        }
    }

    /// Returns the current externally visible status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns the current status detail.
    #[must_use]
    pub fn detail(&self) -> StatusDetail {
        self.detail
    }

    /// Records a successful exchange with the device.
    ///
    /// Resets every counter. Returns the transition to online if the
    /// session was not already online.
    pub fn record_success(&mut self) -> Option<StatusUpdate> {
        self.send_failures = 0;
        self.decode_failures = 0;
        self.unanswered_refreshes = 0;
        if self.status == SessionStatus::Online {
            return None;
        }
        debug!(host = %self.host, "device answered, session online");
        self.transition(StatusUpdate::online())
    }

    /// Records a failed outbound send.
    ///
    /// Returns the offline transition when the consecutive count reaches
    /// [`COMMUNICATION_ERROR_THRESHOLD`].
    pub fn record_send_failure(&mut self) -> Option<StatusUpdate> {
        self.send_failures += 1;
        debug!(
            host = %self.host,
            failures = self.send_failures,
            "send failure"
        );
        if self.send_failures < COMMUNICATION_ERROR_THRESHOLD {
            return None;
        }
        self.go_offline(
            StatusDetail::CommunicationError,
            format!(
                "{} consecutive send failures talking to {}",
                self.send_failures, self.host
            ),
        )
    }

    /// Records a failed decode or state merge of an inbound unit.
    ///
    /// Returns the offline transition when the consecutive count reaches
    /// [`COMMUNICATION_ERROR_THRESHOLD`].
    pub fn record_decode_failure(&mut self) -> Option<StatusUpdate> {
        self.decode_failures += 1;
        debug!(
            host = %self.host,
            failures = self.decode_failures,
            "decode failure"
        );
        if self.decode_failures < COMMUNICATION_ERROR_THRESHOLD {
            return None;
        }
        self.go_offline(
            StatusDetail::CommunicationError,
            format!(
                "{} consecutive decode failures from {}",
                self.decode_failures, self.host
            ),
        )
    }

    /// Records a refresh cycle that completed without any answer from the
    /// device.
    ///
    /// Only counts toward [`NO_RESPONSE_THRESHOLD`] while the session is
    /// online; once offline the counter is informational.
    pub fn record_unanswered_refresh(&mut self) -> Option<StatusUpdate> {
        self.unanswered_refreshes += 1;
        debug!(
            host = %self.host,
            unanswered = self.unanswered_refreshes,
            "refresh cycle went unanswered"
        );
        if self.status != SessionStatus::Online
            || self.unanswered_refreshes < NO_RESPONSE_THRESHOLD
        {
            return None;
        }
        self.go_offline(
            StatusDetail::NoResponse,
            format!(
                "{} received no answer to {} refresh requests",
                self.host, self.unanswered_refreshes
            ),
        )
    }

    /// Records an in-band configuration or authorization rejection.
    ///
    /// Bypasses all counters; the session goes offline immediately and
    /// stays there until the caller reconfigures.
    pub fn record_configuration_error(&mut self, message: impl Into<String>) -> Option<StatusUpdate> {
        self.go_offline(StatusDetail::ConfigurationError, message.into())
    }

    fn go_offline(&mut self, detail: StatusDetail, message: String) -> Option<StatusUpdate> {
        if self.status == SessionStatus::Offline && self.detail == detail {
            // Already offline for this reason; no re-publish, no re-log.
            return None;
        }
        warn!(host = %self.host, %detail, %message, "session going offline");
        self.transition(StatusUpdate::offline(detail, message))
    }

    fn transition(&mut self, update: StatusUpdate) -> Option<StatusUpdate> {
        self.status = update.status;
        self.detail = update.detail;
        Some(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn online_tracker() -> HealthTracker {
        let mut health = HealthTracker::new("host");
        health.record_success();
        health
    }

    #[test]
    fn starts_connecting() {
        let health = HealthTracker::new("host");
        assert_eq!(health.status(), SessionStatus::Connecting);
    }

    #[test]
    fn first_success_goes_online() {
        let mut health = HealthTracker::new("host");
        let up = health.record_success().unwrap();
        assert_eq!(up.status, SessionStatus::Online);
        // Already online: no second transition.
        assert!(health.record_success().is_none());
    }

    #[test]
    fn send_failures_transition_exactly_once_at_threshold() {
        let mut health = online_tracker();
        assert!(health.record_send_failure().is_none());
        assert!(health.record_send_failure().is_none());

        let up = health.record_send_failure().unwrap();
        assert_eq!(up.detail, StatusDetail::CommunicationError);

        // Further failures while offline must not re-trigger.
        assert!(health.record_send_failure().is_none());
        assert!(health.record_send_failure().is_none());
    }

    #[test]
    fn success_resets_send_counter() {
        let mut health = online_tracker();
        health.record_send_failure();
        health.record_send_failure();
        assert!(health.record_success().is_none()); // still online, counters cleared

        assert!(health.record_send_failure().is_none());
        assert!(health.record_send_failure().is_none());
        assert!(health.record_send_failure().is_some());
    }

    #[test]
    fn decode_failures_share_the_threshold() {
        let mut health = online_tracker();
        assert!(health.record_decode_failure().is_none());
        assert!(health.record_decode_failure().is_none());
        let up = health.record_decode_failure().unwrap();
        assert_eq!(up.detail, StatusDetail::CommunicationError);
    }

    #[test]
    fn unanswered_refreshes_use_the_larger_threshold() {
        let mut health = online_tracker();
        for _ in 0..4 {
            assert!(health.record_unanswered_refresh().is_none());
        }
        let up = health.record_unanswered_refresh().unwrap();
        assert_eq!(up.detail, StatusDetail::NoResponse);
        assert_eq!(up.status, SessionStatus::Offline);
    }

    #[test]
    fn answered_refresh_resets_unanswered_counter() {
        let mut health = online_tracker();
        for _ in 0..4 {
            health.record_unanswered_refresh();
        }
        health.record_success();
        for _ in 0..4 {
            assert!(health.record_unanswered_refresh().is_none());
        }
    }

    #[test]
    fn no_response_requires_online_state() {
        // While still connecting the silence is expected; only an online
        // session can degrade to NO_RESPONSE.
        let mut health = HealthTracker::new("host");
        for _ in 0..10 {
            assert!(health.record_unanswered_refresh().is_none());
        }
    }

    #[test]
    fn configuration_error_bypasses_counters() {
        let mut health = online_tracker();
        let up = health.record_configuration_error("NoPass").unwrap();
        assert_eq!(up.detail, StatusDetail::ConfigurationError);
        assert_eq!(up.message.as_deref(), Some("NoPass"));

        // Same reason again: no re-publish.
        assert!(health.record_configuration_error("NoPass").is_none());
    }

    #[test]
    fn offline_detail_change_is_a_new_transition() {
        let mut health = online_tracker();
        for _ in 0..3 {
            health.record_send_failure();
        }
        assert_eq!(health.detail(), StatusDetail::CommunicationError);

        let up = health.record_configuration_error("NoAccess").unwrap();
        assert_eq!(up.detail, StatusDetail::ConfigurationError);
    }

    #[test]
    fn recovery_from_offline() {
        let mut health = online_tracker();
        for _ in 0..3 {
            health.record_send_failure();
        }
        assert_eq!(health.status(), SessionStatus::Offline);

        let up = health.record_success().unwrap();
        assert_eq!(up.status, SessionStatus::Online);
        assert_eq!(health.detail(), StatusDetail::None);
    }
}

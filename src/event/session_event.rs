// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session event types.

use crate::channel::{ChannelId, ChannelValue};
use crate::status::{SessionStatus, StatusDetail, StatusUpdate};

use super::DeviceId;

/// Events emitted by device sessions.
///
/// Subscribers receive one event per committed channel change and one per
/// status transition. Events are only published after the corresponding
/// internal state merge or health transition has committed, so consumers
/// never observe a value the session itself has not accepted yet.
///
/// # Examples
///
/// ```
/// use avrelay_lib::event::{DeviceId, SessionEvent};
/// use avrelay_lib::channel::{ChannelId, ChannelValue, ZoneField};
///
/// let event = SessionEvent::channel_changed(
///     DeviceId::new(),
///     ChannelId::main(ZoneField::Volume),
///     ChannelValue::Decimal(45.5),
/// );
/// assert!(event.is_channel_change());
/// ```
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum SessionEvent {
    /// A channel's value changed (or was observed for the first time).
    ChannelChanged {
        /// The device whose channel changed.
        device_id: DeviceId,
        /// The channel that changed.
        channel: ChannelId,
        /// The new value.
        value: ChannelValue,
    },

    /// The session's externally visible status changed.
    StatusChanged {
        /// The device whose status changed.
        device_id: DeviceId,
        /// The new coarse status.
        status: SessionStatus,
        /// The detail for offline statuses.
        detail: StatusDetail,
        /// Human-readable description of the cause, if any.
        message: Option<String>,
    },
}

impl SessionEvent {
    /// Returns the device ID associated with this event.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        match self {
            Self::ChannelChanged { device_id, .. }
            | Self::StatusChanged { device_id, .. } => *device_id,
        }
    }

    /// Returns `true` if this is a channel change event.
    #[must_use]
    pub fn is_channel_change(&self) -> bool {
        matches!(self, Self::ChannelChanged { .. })
    }

    /// Returns `true` if this is a status change event.
    #[must_use]
    pub fn is_status_change(&self) -> bool {
        matches!(self, Self::StatusChanged { .. })
    }

    /// Creates a channel changed event.
    #[must_use]
    pub fn channel_changed(device_id: DeviceId, channel: ChannelId, value: ChannelValue) -> Self {
        Self::ChannelChanged {
            device_id,
            channel,
            value,
        }
    }

    /// Creates a status changed event from a committed transition.
    #[must_use]
    pub fn status_changed(device_id: DeviceId, update: StatusUpdate) -> Self {
        Self::StatusChanged {
            device_id,
            status: update.status,
            detail: update.detail,
            message: update.message,
        }
    }
}

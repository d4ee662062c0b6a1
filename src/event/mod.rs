// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for channel and status changes.
//!
//! This module provides a pub/sub event system for notifying subscribers
//! about committed channel updates and session status transitions. The
//! [`EventBus`] uses tokio's broadcast channel so multiple subscribers can
//! receive the same events.
//!
//! # Examples
//!
//! ```
//! use avrelay_lib::event::{DeviceId, EventBus, SessionEvent};
//! use avrelay_lib::channel::{ChannelId, ChannelValue};
//!
//! let bus = EventBus::new();
//!
//! // Subscribe to events
//! let mut rx = bus.subscribe();
//!
//! // Publish an event
//! bus.publish(SessionEvent::channel_changed(
//!     DeviceId::new(),
//!     ChannelId::Relay(1),
//!     ChannelValue::on_off(true),
//! ));
//! ```

mod device_id;
mod event_bus;
mod session_event;

pub use device_id::DeviceId;
pub use event_bus::EventBus;
pub use session_event::SessionEvent;

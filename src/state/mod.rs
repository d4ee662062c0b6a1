// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state tracking and diffing.
//!
//! [`DeviceState`] is the per-device snapshot of everything the device has
//! reported so far. Decoders produce [`StateDelta`] values which the
//! snapshot merges, returning only the channels whose values actually
//! changed.
//!
//! # Examples
//!
//! ```
//! use avrelay_lib::state::{DeviceState, StateDelta, FieldUpdate};
//! use avrelay_lib::types::{PowerState, Zone};
//! use avrelay_lib::Capabilities;
//!
//! let mut state = DeviceState::new();
//! let delta = StateDelta::new("PWON").with(FieldUpdate::ZonePower {
//!     zone: Zone::Main,
//!     state: PowerState::On,
//! });
//!
//! let changed = state.apply(&delta, &Capabilities::av_receiver());
//! assert_eq!(changed.len(), 1);
//! ```

mod delta;
mod device_state;

pub use delta::{FieldUpdate, StateDelta};
pub use device_state::{DeviceState, RelayState, ZoneState};

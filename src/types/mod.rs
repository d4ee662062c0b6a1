// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core value types used throughout the library.
//!
//! These types provide type-safe representations of device values with
//! validation, wire encoding, and conversion utilities:
//!
//! - [`PowerState`] - On/off state with wire token parsing
//! - [`Volume`] - receiver volume in half-dB steps with the 2/3-digit
//!   telnet wire grammar
//! - [`ColorTemperatureRange`] - kelvin↔percent transcoding for tunable
//!   white channels
//! - [`Zone`] - receiver zone with its telnet command prefix

mod color_temperature;
mod power;
mod volume;
mod zone;

pub use color_temperature::ColorTemperatureRange;
pub use power::PowerState;
pub use volume::Volume;
pub use zone::Zone;

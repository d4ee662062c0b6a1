// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire-format codecs.
//!
//! One codec per protocol family, each turning raw wire units into
//! [`StateDelta`](crate::state::StateDelta) values and typed commands into
//! wire bytes:
//!
//! - [`telnet`] — line-oriented AV receiver grammar (`PWON`, `MV455`,
//!   `Z2MUON`).
//! - [`udp`] — relay-board datagram grammar (`NET-PwrCtrl` status lines,
//!   `Sw_on`/`Sw_off` writes, `wer da?` discovery).
//! - [`xml`] — receiver zone status documents fetched over HTTP
//!   (feature `http`).
//!
//! Decoders are tolerant: a unit that does not match the grammar is
//! skipped (empty delta or error for the one unit), never a reason to
//! abort the session.

pub mod telnet;
pub mod udp;
#[cfg(feature = "http")]
pub mod xml;

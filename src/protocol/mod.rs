// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transports for communicating with devices.
//!
//! One transport per protocol family, each owning exactly one socket or
//! client per device:
//!
//! - [`TelnetTransport`]: line-oriented TCP stream with a dedicated
//!   receive task.
//! - [`UdpTransport`]: bound datagram socket (receive) plus a separate
//!   broadcast-capable send socket; the ports may differ.
//! - [`HttpXmlClient`]: stateless polling client for receivers with a web
//!   interface (feature `http`).
//!
//! Transports do byte-level send/receive and connection lifecycle only;
//! decoding, diffing and health decisions live above them. Inbound units
//! are delivered through an `mpsc` channel handed out once via
//! `take_*_receiver`, so exactly one consumer drains each connection in
//! arrival order.

mod telnet;
mod udp;

#[cfg(feature = "http")]
mod http;

pub use telnet::{DEFAULT_TELNET_PORT, TelnetTransport};
pub use udp::{DEFAULT_RECEIVE_PORT, DEFAULT_SEND_PORT, UdpTransport};

#[cfg(feature = "http")]
pub use http::HttpXmlClient;

use std::time::Duration;

/// How a session talks to its device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProtocolMode {
    /// Line-oriented telnet to an AV receiver.
    Telnet,
    /// HTTP polling of the receiver's XML status documents.
    HttpXml,
    /// Datagram exchange with a relay board.
    Udp,
}

/// Consecutive receive errors before the loop backs off.
pub(crate) const RECEIVE_ERRORS_BEFORE_BACKOFF: u32 = 3;

/// Delay applied between receive attempts once the error threshold is
/// reached, to avoid log and CPU storms on a dead socket.
pub(crate) const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(10);

/// Buffered inbound units per connection.
pub(crate) const RECEIVE_CHANNEL_CAPACITY: usize = 256;

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast discovery of relay boards.
//!
//! Boards answer the `wer da?` probe with a full status frame, so one
//! broadcast finds every board on the local network. Each answer is
//! decoded into a [`DiscoveredBoard`] carrying the board's name, address
//! and port counts; frames that do not parse are logged and skipped
//! rather than failing the whole scan.
//!
//! # Examples
//!
//! ```no_run
//! use avrelay_lib::discovery::{discover_boards, DiscoveryOptions};
//! use std::time::Duration;
//!
//! # async fn example() -> avrelay_lib::Result<()> {
//! let options = DiscoveryOptions::new().with_timeout(Duration::from_secs(10));
//! let boards = discover_boards(options).await?;
//!
//! for board in &boards {
//!     println!("{} at {} ({} relays)", board.name, board.host, board.relays);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::codec::udp::{self, BoardMessage};
use crate::error::{Error, ProtocolError};
use crate::protocol::{DEFAULT_RECEIVE_PORT, DEFAULT_SEND_PORT, UdpTransport};
use crate::state::FieldUpdate;

/// Default time to wait for answers.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for a broadcast scan.
///
/// # Examples
///
/// ```
/// use avrelay_lib::discovery::DiscoveryOptions;
/// use std::time::Duration;
///
/// let options = DiscoveryOptions::new()
///     .with_timeout(Duration::from_secs(10))
///     .with_ports(7500, 7700);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    timeout: Option<Duration>,
    send_port: Option<u16>,
    receive_port: Option<u16>,
    probe_host: Option<String>,
}

impl DiscoveryOptions {
    /// Creates options with defaults: 5 second timeout, ports 75/77.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long to wait for answers after the probe goes out.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the board command port and the port boards answer to.
    #[must_use]
    pub fn with_ports(mut self, send_port: u16, receive_port: u16) -> Self {
        self.send_port = Some(send_port);
        self.receive_port = Some(receive_port);
        self
    }

    /// Probes one host directly instead of broadcasting.
    ///
    /// Useful to check whether a specific address is a board without
    /// waking up the whole network.
    #[must_use]
    pub fn with_probe_host(mut self, host: impl Into<String>) -> Self {
        self.probe_host = Some(host.into());
        self
    }

    /// Returns the scan timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_DISCOVERY_TIMEOUT)
    }

    /// Returns the port the probe is sent to.
    #[must_use]
    pub fn send_port(&self) -> u16 {
        self.send_port.unwrap_or(DEFAULT_SEND_PORT)
    }

    /// Returns the port answers are expected on.
    #[must_use]
    pub fn receive_port(&self) -> u16 {
        self.receive_port.unwrap_or(DEFAULT_RECEIVE_PORT)
    }

    /// Returns the host to probe directly, if any.
    #[must_use]
    pub fn probe_host(&self) -> Option<&str> {
        self.probe_host.as_deref()
    }
}

/// One board that answered the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredBoard {
    /// The board's configured name.
    pub name: String,
    /// The address the answer came from.
    pub host: IpAddr,
    /// Number of relay ports the board reported.
    pub relays: u8,
    /// Number of IO ports the board reported.
    pub ios: u8,
}

/// Broadcasts a probe and collects every board that answers.
///
/// One answer per address; a board that answers twice within the
/// timeout is reported once.
///
/// # Errors
///
/// Returns `Error::Protocol` if the sockets cannot be bound or the
/// broadcast cannot be sent. Unparseable answers are skipped, not
/// reported as errors.
pub async fn discover_boards(options: DiscoveryOptions) -> Result<Vec<DiscoveredBoard>, Error> {
    let mut transport = UdpTransport::bind(options.receive_port()).await?;
    let mut datagrams = transport.take_datagram_receiver().ok_or_else(|| {
        Error::Protocol(ProtocolError::ChannelClosed(
            "datagram receiver already taken".to_string(),
        ))
    })?;

    info!(
        send_port = options.send_port(),
        receive_port = transport.local_port(),
        timeout_secs = options.timeout().as_secs(),
        "starting board discovery"
    );
    match options.probe_host() {
        Some(host) => {
            transport
                .send_to(udp::DISCOVERY_REQUEST, host, options.send_port())
                .await?;
        }
        None => {
            transport
                .broadcast(udp::DISCOVERY_REQUEST, options.send_port())
                .await?;
        }
    }

    let mut boards = Vec::new();
    let mut seen: HashSet<IpAddr> = HashSet::new();
    let deadline = tokio::time::Instant::now() + options.timeout();

    loop {
        let Ok(next) = tokio::time::timeout_at(deadline, datagrams.recv()).await else {
            break;
        };
        let Some((payload, from)) = next else {
            break;
        };
        if !seen.insert(from.ip()) {
            continue;
        }
        match udp::decode_datagram(&payload) {
            Ok(BoardMessage::Status { name, delta, .. }) => {
                let mut relays: u8 = 0;
                let mut ios: u8 = 0;
                for update in delta.updates() {
                    match update {
                        FieldUpdate::Relay { .. } => relays += 1,
                        FieldUpdate::Io { .. } => ios += 1,
                        _ => {}
                    }
                }
                debug!(name = %name, host = %from.ip(), relays, ios, "board answered");
                boards.push(DiscoveredBoard {
                    name,
                    host: from.ip(),
                    relays,
                    ios,
                });
            }
            Ok(_) => {
                debug!(host = %from.ip(), "board answered with an auth marker, skipping");
            }
            Err(e) => {
                warn!(host = %from.ip(), error = %e, "unparseable discovery answer, skipping");
            }
        }
    }

    transport.shutdown();
    info!(count = boards.len(), "board discovery completed");
    Ok(boards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UdpSocket;

    #[test]
    fn options_defaults() {
        let options = DiscoveryOptions::new();
        assert_eq!(options.timeout(), Duration::from_secs(5));
        assert_eq!(options.send_port(), 75);
        assert_eq!(options.receive_port(), 77);
    }

    #[test]
    fn options_chained() {
        let options = DiscoveryOptions::new()
            .with_timeout(Duration::from_secs(15))
            .with_ports(7500, 7700);
        assert_eq!(options.timeout(), Duration::from_secs(15));
        assert_eq!(options.send_port(), 7500);
        assert_eq!(options.receive_port(), 7700);
    }

    /// Reserves a free UDP port by binding and immediately dropping.
    async fn free_udp_port() -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn boards_answering_the_probe_are_collected() {
        // The fake board listens where the probe will be sent and
        // answers to the scanner's receive port, not to the probe's
        // source address (real boards answer a fixed answer port).
        let board = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let board_port = board.local_addr().unwrap().port();
        let receive_port = free_udp_port().await;

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (n, _) = board.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"wer da?");
            board
                .send_to(
                    b"NET-PwrCtrl:Cellar:192.168.1.40:Pump,1,0:Light,0,0:IO:Door,1:End",
                    ("127.0.0.1", receive_port),
                )
                .await
                .unwrap();
        });

        let options = DiscoveryOptions::new()
            .with_timeout(Duration::from_millis(500))
            .with_ports(board_port, receive_port)
            .with_probe_host("127.0.0.1");
        let boards = discover_boards(options).await.unwrap();

        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].name, "Cellar");
        assert_eq!(boards[0].relays, 2);
        assert_eq!(boards[0].ios, 1);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn silent_host_yields_no_boards() {
        // A socket that never answers.
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let silent_port = silent.local_addr().unwrap().port();

        let options = DiscoveryOptions::new()
            .with_timeout(Duration::from_millis(100))
            .with_ports(silent_port, 0)
            .with_probe_host("127.0.0.1");
        let boards = discover_boards(options).await.unwrap();
        assert!(boards.is_empty());
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Datagram transport for relay boards.
//!
//! Boards listen on one port and answer to another, so the transport
//! binds a receive socket and a separate send socket. The send socket is
//! broadcast-capable for the `wer da?` discovery probe. A dedicated task
//! blocks on the receive socket and forwards each datagram, with its
//! source address, into an `mpsc` channel.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ProtocolError;

use super::{RECEIVE_CHANNEL_CAPACITY, RECEIVE_ERROR_BACKOFF, RECEIVE_ERRORS_BEFORE_BACKOFF};

/// Default port boards listen on for commands.
pub const DEFAULT_SEND_PORT: u16 = 75;

/// Default port boards answer to.
pub const DEFAULT_RECEIVE_PORT: u16 = 77;

/// Largest datagram a board sends.
const MAX_DATAGRAM: usize = 1024;

/// A bound datagram transport.
///
/// # Examples
///
/// ```no_run
/// use avrelay_lib::protocol::UdpTransport;
///
/// # async fn example() -> avrelay_lib::Result<()> {
/// let mut transport = UdpTransport::bind(77).await?;
/// let mut datagrams = transport.take_datagram_receiver().expect("first take");
///
/// transport.broadcast("wer da?", 75).await?;
/// if let Some((payload, from)) = datagrams.recv().await {
///     println!("{from} answered: {payload}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct UdpTransport {
    send_socket: Arc<UdpSocket>,
    datagrams: Option<mpsc::Receiver<(String, SocketAddr)>>,
    receive_task: JoinHandle<()>,
    closed: Arc<AtomicBool>,
    local_port: u16,
}

impl UdpTransport {
    /// Binds the receive socket on `receive_port` (0 picks a free port)
    /// and a separate broadcast-capable send socket.
    ///
    /// Returns only after the receive task is live.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ConnectionFailed` if either socket cannot
    /// be bound.
    pub async fn bind(receive_port: u16) -> Result<Self, ProtocolError> {
        let receive_socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, receive_port))
            .await
            .map_err(|e| {
                ProtocolError::ConnectionFailed(format!("bind receive port {receive_port}: {e}"))
            })?;
        let local_port = receive_socket
            .local_addr()
            .map_err(|e| ProtocolError::ConnectionFailed(e.to_string()))?
            .port();

        let send_socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(|e| ProtocolError::ConnectionFailed(format!("bind send socket: {e}")))?;
        send_socket
            .set_broadcast(true)
            .map_err(|e| ProtocolError::ConnectionFailed(format!("enable broadcast: {e}")))?;

        let (datagram_tx, datagram_rx) = mpsc::channel(RECEIVE_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let closed = Arc::new(AtomicBool::new(false));

        let receive_task = tokio::spawn(receive_loop(
            receive_socket,
            datagram_tx,
            ready_tx,
            Arc::clone(&closed),
        ));

        if ready_rx.await.is_err() {
            return Err(ProtocolError::ConnectionFailed(
                "receive task did not start".to_string(),
            ));
        }

        debug!(port = local_port, "udp transport bound");
        Ok(Self {
            send_socket: Arc::new(send_socket),
            datagrams: Some(datagram_rx),
            receive_task,
            closed,
            local_port,
        })
    }

    /// Returns the port the receive socket is bound to.
    #[must_use]
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Takes the inbound datagram receiver.
    ///
    /// Returns `Some` on the first call and `None` afterwards.
    pub fn take_datagram_receiver(&mut self) -> Option<mpsc::Receiver<(String, SocketAddr)>> {
        self.datagrams.take()
    }

    /// Sends one datagram to a specific device.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::SendFailed` on a socket error and
    /// `ProtocolError::ChannelClosed` after [`shutdown`](Self::shutdown).
    pub async fn send_to(&self, payload: &str, host: &str, port: u16) -> Result<(), ProtocolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProtocolError::ChannelClosed("transport is shut down".to_string()));
        }
        debug!(host = %host, port, payload = %payload, "sending datagram");
        self.send_socket
            .send_to(payload.as_bytes(), (host, port))
            .await
            .map_err(|e| ProtocolError::SendFailed(format!("{host}:{port}: {e}")))?;
        Ok(())
    }

    /// Broadcasts one datagram to every board on the local network.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::SendFailed` on a socket error.
    pub async fn broadcast(&self, payload: &str, port: u16) -> Result<(), ProtocolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProtocolError::ChannelClosed("transport is shut down".to_string()));
        }
        debug!(port, payload = %payload, "broadcasting datagram");
        self.send_socket
            .send_to(payload.as_bytes(), (Ipv4Addr::BROADCAST, port))
            .await
            .map_err(|e| ProtocolError::SendFailed(format!("broadcast:{port}: {e}")))?;
        Ok(())
    }

    /// Shuts the transport down.
    ///
    /// Idempotent. Aborts the receive task, which unblocks its pending
    /// receive and closes the datagram channel.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(port = self.local_port, "udp transport shutting down");
        self.receive_task.abort();
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn receive_loop(
    socket: UdpSocket,
    datagram_tx: mpsc::Sender<(String, SocketAddr)>,
    ready_tx: oneshot::Sender<()>,
    closed: Arc<AtomicBool>,
) {
    let mut buf = [0u8; MAX_DATAGRAM];
    let mut consecutive_errors: u32 = 0;
    let _ = ready_tx.send(());

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, from)) => {
                consecutive_errors = 0;
                let payload = String::from_utf8_lossy(&buf[..len]).into_owned();
                if datagram_tx.send((payload, from)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                if closed.load(Ordering::SeqCst) {
                    break;
                }
                consecutive_errors += 1;
                warn!(error = %e, consecutive_errors, "udp receive error");
                if consecutive_errors >= RECEIVE_ERRORS_BEFORE_BACKOFF {
                    tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_send_and_receive() {
        let mut transport = UdpTransport::bind(0).await.unwrap();
        let mut datagrams = transport.take_datagram_receiver().unwrap();

        // A fake board answering to our receive port.
        let board = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        board
            .send_to(b"NET-PwrCtrl:B:h:R1,1,0:End", ("127.0.0.1", transport.local_port()))
            .await
            .unwrap();

        let (payload, _) = datagrams.recv().await.unwrap();
        assert!(payload.starts_with("NET-PwrCtrl"));
    }

    #[tokio::test]
    async fn send_to_reaches_the_board() {
        let board = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let board_port = board.local_addr().unwrap().port();

        let transport = UdpTransport::bind(0).await.unwrap();
        transport
            .send_to("Sw_on1useracct", "127.0.0.1", board_port)
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let (n, _) = board.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"Sw_on1useracct");
    }

    #[tokio::test]
    async fn take_datagram_receiver_only_once() {
        let mut transport = UdpTransport::bind(0).await.unwrap();
        assert!(transport.take_datagram_receiver().is_some());
        assert!(transport.take_datagram_receiver().is_none());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_closes_channel() {
        let mut transport = UdpTransport::bind(0).await.unwrap();
        let mut datagrams = transport.take_datagram_receiver().unwrap();

        transport.shutdown();
        transport.shutdown();

        assert!(datagrams.recv().await.is_none());
        assert!(transport.send_to("x", "127.0.0.1", 9).await.is_err());
    }
}

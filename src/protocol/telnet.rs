// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line-oriented telnet transport.
//!
//! Owns one TCP connection to one receiver. A dedicated task reads
//! newline-terminated lines and forwards them into an `mpsc` channel;
//! [`TelnetTransport::connect`] only returns once that task has signalled
//! readiness, so a command sent immediately after connecting cannot race
//! the listener's startup.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ProtocolError;

use super::{RECEIVE_CHANNEL_CAPACITY, RECEIVE_ERROR_BACKOFF, RECEIVE_ERRORS_BEFORE_BACKOFF};

/// Default telnet port of AV receivers.
pub const DEFAULT_TELNET_PORT: u16 = 23;

/// A connected telnet transport.
///
/// # Examples
///
/// ```no_run
/// use avrelay_lib::protocol::TelnetTransport;
///
/// # async fn example() -> avrelay_lib::Result<()> {
/// let mut transport = TelnetTransport::connect("192.168.1.50", 23).await?;
/// let mut lines = transport.take_line_receiver().expect("first take");
///
/// transport.send_line("MV?").await?;
/// if let Some(line) = lines.recv().await {
///     println!("receiver said: {line}");
/// }
/// transport.shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TelnetTransport {
    writer: Arc<Mutex<OwnedWriteHalf>>,
    lines: Option<mpsc::Receiver<String>>,
    receive_task: JoinHandle<()>,
    closed: Arc<AtomicBool>,
    peer: String,
}

impl TelnetTransport {
    /// Connects to a receiver and starts the receive task.
    ///
    /// Returns only after the receive task is live.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ConnectionFailed` if the TCP connection
    /// cannot be established.
    pub async fn connect(host: &str, port: u16) -> Result<Self, ProtocolError> {
        let peer = format!("{host}:{port}");
        let stream = TcpStream::connect(&peer)
            .await
            .map_err(|e| ProtocolError::ConnectionFailed(format!("{peer}: {e}")))?;
        let (read_half, write_half) = stream.into_split();

        let (line_tx, line_rx) = mpsc::channel(RECEIVE_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let closed = Arc::new(AtomicBool::new(false));

        let receive_task = tokio::spawn(receive_loop(
            read_half,
            line_tx,
            ready_tx,
            Arc::clone(&closed),
            peer.clone(),
        ));

        // The task signals readiness right before its first read; a send
        // issued after connect() cannot overtake the listener.
        if ready_rx.await.is_err() {
            return Err(ProtocolError::ConnectionFailed(format!(
                "{peer}: receive task did not start"
            )));
        }

        debug!(peer = %peer, "telnet transport connected");
        Ok(Self {
            writer: Arc::new(Mutex::new(write_half)),
            lines: Some(line_rx),
            receive_task,
            closed,
            peer,
        })
    }

    /// Takes the inbound line receiver.
    ///
    /// Returns `Some` on the first call and `None` afterwards; a single
    /// consumer drains lines in arrival order.
    pub fn take_line_receiver(&mut self) -> Option<mpsc::Receiver<String>> {
        self.lines.take()
    }

    /// Sends one command line. The line terminator is appended here.
    ///
    /// Best-effort single send; retry policy belongs to the caller.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::SendFailed` on a write error and
    /// `ProtocolError::ChannelClosed` after [`shutdown`](Self::shutdown).
    pub async fn send_line(&self, line: &str) -> Result<(), ProtocolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProtocolError::ChannelClosed("transport is shut down".to_string()));
        }
        debug!(peer = %self.peer, line = %line, "sending line");
        let mut writer = self.writer.lock().await;
        writer
            .write_all(format!("{line}\r").as_bytes())
            .await
            .map_err(|e| ProtocolError::SendFailed(format!("{}: {e}", self.peer)))?;
        writer
            .flush()
            .await
            .map_err(|e| ProtocolError::SendFailed(format!("{}: {e}", self.peer)))
    }

    /// Shuts the transport down.
    ///
    /// Idempotent. Aborts the receive task, which unblocks its pending
    /// read and closes the line channel.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(peer = %self.peer, "telnet transport shutting down");
        self.receive_task.abort();
    }
}

impl Drop for TelnetTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn receive_loop(
    read_half: OwnedReadHalf,
    line_tx: mpsc::Sender<String>,
    ready_tx: oneshot::Sender<()>,
    closed: Arc<AtomicBool>,
    peer: String,
) {
    let mut reader = BufReader::new(read_half);
    let mut consecutive_errors: u32 = 0;
    let _ = ready_tx.send(());

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!(peer = %peer, "telnet peer closed the connection");
                break;
            }
            Ok(_) => {
                consecutive_errors = 0;
                let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
                if line_tx.send(trimmed).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                if closed.load(Ordering::SeqCst) {
                    break;
                }
                consecutive_errors += 1;
                warn!(peer = %peer, error = %e, consecutive_errors, "telnet receive error");
                if consecutive_errors >= RECEIVE_ERRORS_BEFORE_BACKOFF {
                    tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                }
            }
        }
    }
    // Dropping line_tx closes the channel; the consumer sees the
    // connection as dead.
}

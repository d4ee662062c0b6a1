// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device connection and session management.
//!
//! A [`DeviceSession`] owns everything belonging to one device: the
//! transport, the state snapshot, the health tracker and the command
//! queue. It runs up to three tasks:
//!
//! - a dispatch task draining the transport's inbound channel, decoding
//!   each unit and merging it into the snapshot,
//! - a fixed-delay poll task refreshing the device and counting
//!   unanswered cycles,
//! - a command task draining the queue, translating and sending.
//!
//! The snapshot and health counters sit behind one mutex; merges and the
//! check-then-act sequence against locked relays are serialized even
//! though the tasks run concurrently. Committed channel updates and
//! status transitions are published on the session's [`EventBus`] only
//! after the lock is released.
//!
//! # Examples
//!
//! ```no_run
//! use avrelay_lib::channel::ChannelId;
//! use avrelay_lib::command::Command;
//! use avrelay_lib::event::EventBus;
//! use avrelay_lib::session::{DeviceSession, SessionConfig};
//! use avrelay_lib::types::PowerState;
//!
//! # async fn example() -> avrelay_lib::Result<()> {
//! let bus = EventBus::new();
//! let mut events = bus.subscribe();
//!
//! let config = SessionConfig::telnet("192.168.1.50");
//! let mut session = DeviceSession::start(config, bus).await?;
//!
//! session.handle_command("mainPower".parse()?, Command::OnOff(PowerState::On))?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;

pub use config::SessionConfig;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::Capabilities;
use crate::channel::{ChannelId, ChannelUpdate};
use crate::codec::udp::BoardMessage;
use crate::codec::{telnet, udp};
use crate::command::{
    Command, CommandQueue, CommandTranslator, PushOutcome, Translation,
};
use crate::error::{DeviceError, Error, ProtocolError, Result};
use crate::event::{DeviceId, EventBus, SessionEvent};
use crate::health::HealthTracker;
use crate::protocol::{ProtocolMode, TelnetTransport, UdpTransport};
use crate::state::{DeviceState, StateDelta};
use crate::status::{SessionStatus, StatusUpdate};

#[cfg(feature = "http")]
use crate::codec::xml;
#[cfg(feature = "http")]
use crate::protocol::HttpXmlClient;

/// How long the command task waits for work before re-checking.
const COMMAND_POP_TIMEOUT: Duration = Duration::from_millis(500);

/// How long shutdown waits for the dispatch task to drain.
const DISPATCH_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// State shared between the session's tasks, guarded by one mutex.
struct Shared {
    state: DeviceState,
    health: HealthTracker,
    /// Whether anything arrived since the last poll cycle started.
    answered: bool,
}

type SharedHandle = Arc<Mutex<Shared>>;

/// The transport a session runs on.
#[derive(Clone)]
enum Backend {
    Telnet(Arc<TelnetTransport>),
    Udp(Arc<UdpTransport>),
    #[cfg(feature = "http")]
    HttpXml(HttpXmlClient),
}

/// A live session with one device.
pub struct DeviceSession {
    id: DeviceId,
    config: Arc<SessionConfig>,
    shared: SharedHandle,
    bus: EventBus,
    queue: CommandQueue,
    backend: Backend,
    poll_task: Option<JoinHandle<()>>,
    dispatch_task: Option<JoinHandle<()>>,
    command_task: Option<JoinHandle<()>>,
}

impl DeviceSession {
    /// Connects to the device and starts the session tasks.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for an invalid configuration and
    /// `Error::Protocol` if the transport cannot be opened.
    pub async fn start(config: SessionConfig, bus: EventBus) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let id = DeviceId::new();
        let capabilities = config.capabilities().clone();

        let shared: SharedHandle = Arc::new(Mutex::new(Shared {
            state: DeviceState::new(),
            health: HealthTracker::new(config.host()),
            answered: false,
        }));

        let queue = CommandQueue::new(config.queue_capacity());
        let mut translator = CommandTranslator::new(config.mode(), capabilities.clone());
        if let Some(credentials) = config.credentials() {
            translator = translator.with_credentials(credentials.clone());
        }

        let (backend, dispatch_task) = match config.mode() {
            ProtocolMode::Telnet => {
                let mut transport =
                    TelnetTransport::connect(config.host(), config.telnet_port()).await?;
                let lines = transport.take_line_receiver().ok_or_else(|| {
                    Error::Protocol(ProtocolError::ChannelClosed(
                        "line receiver already taken".to_string(),
                    ))
                })?;
                let task = tokio::spawn(telnet_dispatch(
                    lines,
                    Arc::clone(&shared),
                    bus.clone(),
                    id,
                    capabilities.clone(),
                ));
                (Backend::Telnet(Arc::new(transport)), Some(task))
            }
            ProtocolMode::Udp => {
                let mut transport = UdpTransport::bind(config.receive_port()).await?;
                let datagrams = transport.take_datagram_receiver().ok_or_else(|| {
                    Error::Protocol(ProtocolError::ChannelClosed(
                        "datagram receiver already taken".to_string(),
                    ))
                })?;
                let task = tokio::spawn(udp_dispatch(
                    datagrams,
                    Arc::clone(&shared),
                    bus.clone(),
                    id,
                    capabilities.clone(),
                    config.host().to_string(),
                ));
                (Backend::Udp(Arc::new(transport)), Some(task))
            }
            #[cfg(feature = "http")]
            ProtocolMode::HttpXml => {
                let client = HttpXmlClient::new(config.host())?;
                (Backend::HttpXml(client), None)
            }
            #[cfg(not(feature = "http"))]
            ProtocolMode::HttpXml => {
                return Err(Error::Configuration(
                    "HTTP polling requires the `http` feature".to_string(),
                ));
            }
        };

        let poll_task = tokio::spawn(poll_loop(
            backend.clone(),
            Arc::clone(&config),
            Arc::clone(&shared),
            bus.clone(),
            id,
        ));
        let command_task = tokio::spawn(command_loop(
            queue.clone(),
            translator,
            backend.clone(),
            Arc::clone(&config),
            Arc::clone(&shared),
            bus.clone(),
            id,
        ));

        info!(host = %config.host(), mode = ?config.mode(), device_id = %id, "session started");
        Ok(Self {
            id,
            config,
            shared,
            bus,
            queue,
            backend,
            poll_task: Some(poll_task),
            dispatch_task,
            command_task: Some(command_task),
        })
    }

    /// Returns the session's device id.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.id
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the current externally visible status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.shared.lock().health.status()
    }

    /// Returns a snapshot of the current device state.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.shared.lock().state.clone()
    }

    /// Subscribes to this session's events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    /// Queues a command for a channel.
    ///
    /// The command is applied asynchronously by the command task; a
    /// pending command of the same kind for the same channel is replaced
    /// by the new one.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnknownChannel` if the device does not
    /// expose the channel and `Error::NotConnected` after the session
    /// has been shut down. Both are local rejections and do not affect
    /// connection health.
    pub fn handle_command(&self, channel: ChannelId, command: Command) -> Result<PushOutcome> {
        if self.command_task.is_none() {
            return Err(Error::NotConnected);
        }
        if !self.config.capabilities().supports_channel(channel) {
            return Err(DeviceError::UnknownChannel(channel.to_string()).into());
        }
        let outcome = self.queue.push(channel, command);
        if outcome == PushOutcome::Rejected {
            warn!(%channel, "command queue full, command dropped");
        }
        Ok(outcome)
    }

    /// Disposes the session.
    ///
    /// Idempotent. Cancels the poll and command tasks, closes the
    /// transport (which unblocks the pending receive) and waits briefly
    /// for the dispatch task to drain.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        if let Some(task) = self.command_task.take() {
            task.abort();
        }
        self.queue.clear();

        match &self.backend {
            Backend::Telnet(transport) => transport.shutdown(),
            Backend::Udp(transport) => transport.shutdown(),
            #[cfg(feature = "http")]
            Backend::HttpXml(_) => {}
        }

        if let Some(task) = self.dispatch_task.take() {
            if tokio::time::timeout(DISPATCH_DRAIN_TIMEOUT, task).await.is_err() {
                debug!(device_id = %self.id, "dispatch task did not drain in time");
            }
        }
        info!(host = %self.config.host(), device_id = %self.id, "session stopped");
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        if let Some(task) = self.command_task.take() {
            task.abort();
        }
        if let Some(task) = self.dispatch_task.take() {
            task.abort();
        }
    }
}

fn publish_transition(bus: &EventBus, id: DeviceId, transition: Option<StatusUpdate>) {
    if let Some(update) = transition {
        bus.publish(SessionEvent::status_changed(id, update));
    }
}

fn publish_updates(bus: &EventBus, id: DeviceId, updates: Vec<ChannelUpdate>) {
    for update in updates {
        bus.publish(SessionEvent::channel_changed(id, update.channel, update.value));
    }
}

/// Merges a successfully decoded delta. One lock scope covers the
/// success bookkeeping and the merge; events go out after release.
fn merge_delta(
    shared: &SharedHandle,
    capabilities: &Capabilities,
    delta: &StateDelta,
) -> (Vec<ChannelUpdate>, Option<StatusUpdate>) {
    let mut guard = shared.lock();
    guard.answered = true;
    let transition = guard.health.record_success();
    let updates = guard.state.apply(delta, capabilities);
    (updates, transition)
}

async fn telnet_dispatch(
    mut lines: mpsc::Receiver<String>,
    shared: SharedHandle,
    bus: EventBus,
    id: DeviceId,
    capabilities: Capabilities,
) {
    while let Some(line) = lines.recv().await {
        let delta = telnet::decode_line(&line);
        let (updates, transition) = merge_delta(&shared, &capabilities, &delta);
        publish_transition(&bus, id, transition);
        publish_updates(&bus, id, updates);
    }
    debug!(device_id = %id, "telnet line stream ended");
}

async fn udp_dispatch(
    mut datagrams: mpsc::Receiver<(String, SocketAddr)>,
    shared: SharedHandle,
    bus: EventBus,
    id: DeviceId,
    capabilities: Capabilities,
    host: String,
) {
    // Broadcast answers from other boards arrive on the same port;
    // only frames from the configured device belong to this session.
    let expected: Option<IpAddr> = host.parse().ok();

    while let Some((payload, from)) = datagrams.recv().await {
        if let Some(ip) = expected {
            if from.ip() != ip {
                continue;
            }
        }
        match udp::decode_datagram(&payload) {
            Ok(BoardMessage::Status { delta, .. }) => {
                let (updates, transition) = merge_delta(&shared, &capabilities, &delta);
                publish_transition(&bus, id, transition);
                publish_updates(&bus, id, updates);
            }
            Ok(BoardMessage::AuthenticationRejected) => {
                let transition = shared
                    .lock()
                    .health
                    .record_configuration_error("device rejected the configured credentials");
                publish_transition(&bus, id, transition);
            }
            Ok(BoardMessage::AccessDenied) => {
                let transition = shared
                    .lock()
                    .health
                    .record_configuration_error("account lacks rights for this operation");
                publish_transition(&bus, id, transition);
            }
            Err(e) => {
                debug!(device_id = %id, error = %e, "skipping datagram");
                let transition = shared.lock().health.record_decode_failure();
                publish_transition(&bus, id, transition);
            }
        }
    }
    debug!(device_id = %id, "datagram stream ended");
}

async fn poll_loop(
    backend: Backend,
    config: Arc<SessionConfig>,
    shared: SharedHandle,
    bus: EventBus,
    id: DeviceId,
) {
    let mut interval = tokio::time::interval(config.polling_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polled_once = false;

    loop {
        interval.tick().await;

        let transition = {
            let mut guard = shared.lock();
            let transition = if polled_once && !guard.answered {
                guard.health.record_unanswered_refresh()
            } else {
                None
            };
            guard.answered = false;
            transition
        };
        publish_transition(&bus, id, transition);

        run_poll_cycle(&backend, &config, &shared, &bus, id).await;
        polled_once = true;
    }
}

async fn run_poll_cycle(
    backend: &Backend,
    config: &SessionConfig,
    shared: &SharedHandle,
    bus: &EventBus,
    id: DeviceId,
) {
    match backend {
        Backend::Telnet(transport) => {
            for zone in config.capabilities().zone_list() {
                for query in telnet::refresh_queries(zone) {
                    if let Err(e) = transport.send_line(&query).await {
                        debug!(device_id = %id, error = %e, "poll query failed");
                        let transition = shared.lock().health.record_send_failure();
                        publish_transition(bus, id, transition);
                        return;
                    }
                }
            }
        }
        Backend::Udp(transport) => {
            if let Err(e) = transport
                .send_to(udp::DISCOVERY_REQUEST, config.host(), config.send_port())
                .await
            {
                debug!(device_id = %id, error = %e, "status probe failed");
                let transition = shared.lock().health.record_send_failure();
                publish_transition(bus, id, transition);
            }
        }
        #[cfg(feature = "http")]
        Backend::HttpXml(client) => {
            for zone in config.capabilities().zone_list() {
                match client.fetch_zone_status(zone).await {
                    Ok(body) => match xml::decode_zone_status(&body, zone) {
                        Ok(delta) => {
                            let (updates, transition) =
                                merge_delta(shared, config.capabilities(), &delta);
                            publish_transition(bus, id, transition);
                            publish_updates(bus, id, updates);
                        }
                        Err(e) => {
                            debug!(device_id = %id, %zone, error = %e, "bad status document");
                            let transition = shared.lock().health.record_decode_failure();
                            publish_transition(bus, id, transition);
                        }
                    },
                    Err(
                        e @ (ProtocolError::AuthenticationFailed
                        | ProtocolError::InsufficientRights),
                    ) => {
                        let transition = shared
                            .lock()
                            .health
                            .record_configuration_error(e.to_string());
                        publish_transition(bus, id, transition);
                        return;
                    }
                    Err(e) => {
                        debug!(device_id = %id, %zone, error = %e, "status fetch failed");
                        let transition = shared.lock().health.record_send_failure();
                        publish_transition(bus, id, transition);
                        return;
                    }
                }
            }
        }
    }
}

async fn command_loop(
    queue: CommandQueue,
    translator: CommandTranslator,
    backend: Backend,
    config: Arc<SessionConfig>,
    shared: SharedHandle,
    bus: EventBus,
    id: DeviceId,
) {
    loop {
        let Some(queued) = queue.pop(COMMAND_POP_TIMEOUT).await else {
            continue;
        };

        // Translation (including the locked-relay check) runs under the
        // same lock as state merges, so a lock-flag update cannot race
        // the write it is meant to block.
        let translation = {
            let guard = shared.lock();
            translator.translate(queued.channel, &queued.command, &guard.state)
        };

        match translation {
            Ok(Translation::Send(message)) => {
                if let Err(e) = send_message(&backend, &config, &message).await {
                    debug!(device_id = %id, error = %e, "command send failed");
                    let transition = shared.lock().health.record_send_failure();
                    publish_transition(&bus, id, transition);
                }
            }
            Ok(Translation::SnapBack(update)) => {
                warn!(device_id = %id, channel = %update.channel, "write to locked channel rejected");
                bus.publish(SessionEvent::channel_changed(id, update.channel, update.value));
            }
            Ok(Translation::Noop) => {}
            Err(e) => {
                warn!(device_id = %id, channel = %queued.channel, error = %e, "command rejected");
            }
        }
    }
}

async fn send_message(
    backend: &Backend,
    config: &SessionConfig,
    message: &str,
) -> std::result::Result<(), ProtocolError> {
    match backend {
        Backend::Telnet(transport) => transport.send_line(message).await,
        Backend::Udp(transport) => {
            transport
                .send_to(message, config.host(), config.send_port())
                .await
        }
        #[cfg(feature = "http")]
        Backend::HttpXml(client) => client.send_command(message).await,
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for telnet receiver sessions against an in-process
//! TCP server standing in for the receiver.

use std::time::Duration;

use avrelay_lib::channel::{ChannelId, ChannelValue, ZoneField};
use avrelay_lib::command::Command;
use avrelay_lib::event::{EventBus, SessionEvent};
use avrelay_lib::session::{DeviceSession, SessionConfig};
use avrelay_lib::status::{SessionStatus, StatusDetail};
use avrelay_lib::types::{PowerState, Zone};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

async fn fake_receiver() -> (TcpListener, String, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr.ip().to_string(), addr.port())
}

async fn start_session(host: &str, port: u16, bus: EventBus) -> DeviceSession {
    let config = SessionConfig::telnet(host)
        .with_telnet_port(port)
        .with_polling_interval(Duration::from_millis(50));
    DeviceSession::start(config, bus).await.unwrap()
}

async fn wait_for(
    events: &mut broadcast::Receiver<SessionEvent>,
    mut predicate: impl FnMut(&SessionEvent) -> bool,
) -> SessionEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event within 5s")
            .expect("event stream open");
        if predicate(&event) {
            return event;
        }
    }
}

/// Reads from the socket until the collected bytes contain `needle`.
async fn read_until(socket: &mut TcpStream, needle: &str) -> String {
    let mut collected = String::new();
    let mut buf = [0u8; 256];
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !collected.contains(needle) {
        let n = tokio::time::timeout_at(deadline, socket.read(&mut buf))
            .await
            .expect("wire data within 5s")
            .unwrap();
        assert!(n > 0, "receiver connection closed early");
        collected.push_str(&String::from_utf8_lossy(&buf[..n]));
    }
    collected
}

#[tokio::test]
async fn receiver_lines_become_channel_events() {
    let (listener, host, port) = fake_receiver().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // Answer the refresh queries with one report per line, including
        // the tolerated space in the zone mute report.
        socket
            .write_all(b"PWON\r\nMV455\r\nSIDVD\r\nZ2MU ON\r\n")
            .await
            .unwrap();
        // Keep the connection open until the client goes away.
        let mut buf = [0u8; 256];
        while socket.read(&mut buf).await.unwrap_or(0) > 0 {}
    });

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let mut session = start_session(&host, port, bus).await;

    let online = wait_for(&mut events, SessionEvent::is_status_change).await;
    if let SessionEvent::StatusChanged { status, .. } = online {
        assert_eq!(status, SessionStatus::Online);
    }

    let volume = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::ChannelChanged { channel, .. }
            if *channel == ChannelId::main(ZoneField::Volume))
    })
    .await;
    if let SessionEvent::ChannelChanged { value, .. } = volume {
        assert_eq!(value, ChannelValue::Decimal(45.5));
    }

    let zone2_mute = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::ChannelChanged { channel, .. }
            if *channel == ChannelId::zone(Zone::Zone2, ZoneField::Mute))
    })
    .await;
    if let SessionEvent::ChannelChanged { value, .. } = zone2_mute {
        assert_eq!(value, ChannelValue::OnOff(PowerState::On));
    }

    session.shutdown().await;
    server.abort();
}

#[tokio::test]
async fn volume_command_reaches_the_wire() {
    let (listener, host, port) = fake_receiver().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // Go online so the session is fully established.
        socket.write_all(b"PWON\r\n").await.unwrap();
        read_until(&mut socket, "MV455\r").await
    });

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let mut session = start_session(&host, port, bus).await;

    wait_for(&mut events, SessionEvent::is_status_change).await;
    session
        .handle_command(ChannelId::main(ZoneField::Volume), Command::Decimal(45.5))
        .unwrap();

    let wire = server.await.unwrap();
    assert!(wire.contains("MV455\r"));

    session.shutdown().await;
}

#[tokio::test]
async fn silent_receiver_goes_offline_with_no_response() {
    let (listener, host, port) = fake_receiver().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // One answer to go online, then silence.
        socket.write_all(b"PWON\r\n").await.unwrap();
        let mut buf = [0u8; 256];
        while socket.read(&mut buf).await.unwrap_or(0) > 0 {}
    });

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let config = SessionConfig::telnet(&host)
        .with_telnet_port(port)
        .with_polling_interval(Duration::from_millis(30));
    let mut session = DeviceSession::start(config, bus).await.unwrap();

    wait_for(&mut events, |e| {
        matches!(
            e,
            SessionEvent::StatusChanged {
                status: SessionStatus::Online,
                ..
            }
        )
    })
    .await;

    let offline = wait_for(&mut events, |e| {
        matches!(
            e,
            SessionEvent::StatusChanged {
                status: SessionStatus::Offline,
                ..
            }
        )
    })
    .await;
    if let SessionEvent::StatusChanged { detail, .. } = offline {
        assert_eq!(detail, StatusDetail::NoResponse);
    }

    session.shutdown().await;
    server.abort();
}

#[tokio::test]
async fn repeated_reports_emit_one_event() {
    let (listener, host, port) = fake_receiver().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // The same report three times.
        socket
            .write_all(b"MUON\r\nMUON\r\nMUON\r\n")
            .await
            .unwrap();
        let mut buf = [0u8; 256];
        while socket.read(&mut buf).await.unwrap_or(0) > 0 {}
    });

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let mut session = start_session(&host, port, bus).await;

    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::ChannelChanged { channel, .. }
            if *channel == ChannelId::main(ZoneField::Mute))
    })
    .await;

    // Give the remaining two reports time to be dispatched, then make
    // sure neither produced a second event.
    tokio::time::sleep(Duration::from_millis(200)).await;
    session.shutdown().await;

    let mut further_mute_events = 0;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::ChannelChanged { channel, .. } = event {
            if channel == ChannelId::main(ZoneField::Mute) {
                further_mute_events += 1;
            }
        }
    }
    assert_eq!(further_mute_events, 0);
    server.abort();
}

#[tokio::test]
async fn commands_after_shutdown_are_rejected() {
    let (listener, host, port) = fake_receiver().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 256];
        while socket.read(&mut buf).await.unwrap_or(0) > 0 {}
    });

    let bus = EventBus::new();
    let mut session = start_session(&host, port, bus).await;
    session.shutdown().await;

    let err = session
        .handle_command(
            ChannelId::main(ZoneField::Power),
            Command::OnOff(PowerState::On),
        )
        .unwrap_err();
    assert!(matches!(err, avrelay_lib::Error::NotConnected));
    server.abort();
}

#[tokio::test]
async fn connect_failure_surfaces_as_error() {
    let config = SessionConfig::telnet("127.0.0.1")
        .with_telnet_port(1)
        .with_polling_interval(Duration::from_millis(50));
    assert!(DeviceSession::start(config, EventBus::new()).await.is_err());
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for relay board sessions against an in-process
//! datagram socket standing in for the board.

use std::time::Duration;

use avrelay_lib::channel::{ChannelId, ChannelValue};
use avrelay_lib::codec::udp::Credentials;
use avrelay_lib::command::Command;
use avrelay_lib::event::{EventBus, SessionEvent};
use avrelay_lib::session::{DeviceSession, SessionConfig};
use avrelay_lib::status::{SessionStatus, StatusDetail};
use avrelay_lib::types::{ColorTemperatureRange, PowerState};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

/// Picks a free UDP port for the session's receive socket.
///
/// The board has to know where to answer before the session exists, so
/// the port is reserved briefly and released again.
async fn free_udp_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.local_addr().unwrap().port()
}

async fn fake_board() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

fn board_config(board_port: u16, receive_port: u16) -> SessionConfig {
    SessionConfig::udp("127.0.0.1")
        .with_udp_ports(board_port, receive_port)
        .with_credentials(Credentials::new("user", "acct"))
        .with_polling_interval(Duration::from_millis(50))
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

#[tokio::test]
async fn board_status_becomes_channel_events() {
    let (board, board_port) = fake_board().await;
    let receive_port = free_udp_port().await;

    let responder = tokio::spawn(async move {
        let mut buf = [0u8; 64];
        let (n, _) = board.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"wer da?");
        board
            .send_to(
                b"NET-PwrCtrl:Cellar:127.0.0.1:Pump,1,0:Light,0,0:IO:Door,1:End",
                ("127.0.0.1", receive_port),
            )
            .await
            .unwrap();
    });

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let mut session = DeviceSession::start(board_config(board_port, receive_port), bus)
        .await
        .unwrap();

    let online = wait_for(&mut events, SessionEvent::is_status_change).await;
    if let SessionEvent::StatusChanged { status, .. } = online {
        assert_eq!(status, SessionStatus::Online);
    }

    let pump = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::ChannelChanged { channel, .. }
            if *channel == ChannelId::Relay(1))
    })
    .await;
    if let SessionEvent::ChannelChanged { value, .. } = pump {
        assert_eq!(value, ChannelValue::OnOff(PowerState::On));
    }

    let door = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::ChannelChanged { channel, .. }
            if *channel == ChannelId::Io(1))
    })
    .await;
    if let SessionEvent::ChannelChanged { value, .. } = door {
        assert_eq!(value, ChannelValue::OnOff(PowerState::On));
    }

    session.shutdown().await;
    responder.await.unwrap();
}

#[tokio::test]
async fn relay_write_is_stamped_with_credentials() {
    let (board, board_port) = fake_board().await;
    let receive_port = free_udp_port().await;

    let responder = tokio::spawn(async move {
        let mut buf = [0u8; 128];
        loop {
            let (n, from) = board.recv_from(&mut buf).await.unwrap();
            let payload = String::from_utf8_lossy(&buf[..n]).into_owned();
            if payload == "wer da?" {
                let _ = from;
                board
                    .send_to(
                        b"NET-PwrCtrl:Cellar:127.0.0.1:Pump,0,0:End",
                        ("127.0.0.1", receive_port),
                    )
                    .await
                    .unwrap();
                continue;
            }
            return payload;
        }
    });

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let mut session = DeviceSession::start(board_config(board_port, receive_port), bus)
        .await
        .unwrap();

    wait_for(&mut events, SessionEvent::is_status_change).await;
    session
        .handle_command(ChannelId::Relay(1), Command::OnOff(PowerState::On))
        .unwrap();

    let written = tokio::time::timeout(Duration::from_secs(5), responder)
        .await
        .expect("write within 5s")
        .unwrap();
    assert_eq!(written, "Sw_on1useracct");

    session.shutdown().await;
}

#[tokio::test]
async fn locked_relay_write_snaps_back_without_a_datagram() {
    let (board, board_port) = fake_board().await;
    let receive_port = free_udp_port().await;

    let responder = tokio::spawn(async move {
        let mut buf = [0u8; 128];
        let mut writes = Vec::new();
        loop {
            let Ok(received) =
                tokio::time::timeout(Duration::from_secs(2), board.recv_from(&mut buf)).await
            else {
                return writes;
            };
            let (n, _) = received.unwrap();
            let payload = String::from_utf8_lossy(&buf[..n]).into_owned();
            if payload == "wer da?" {
                // Relay 2 is locked by the board's configuration.
                board
                    .send_to(
                        b"NET-PwrCtrl:Cellar:127.0.0.1:Pump,1,0:Heater,0,1:End",
                        ("127.0.0.1", receive_port),
                    )
                    .await
                    .unwrap();
            } else {
                writes.push(payload);
            }
        }
    });

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let mut session = DeviceSession::start(board_config(board_port, receive_port), bus)
        .await
        .unwrap();

    // Wait until the locked relay's state has been observed.
    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::ChannelChanged { channel, .. }
            if *channel == ChannelId::Relay(2))
    })
    .await;

    session
        .handle_command(ChannelId::Relay(2), Command::OnOff(PowerState::On))
        .unwrap();

    // The rejected write republishes the current (off) state once.
    let snap_back = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::ChannelChanged { channel, .. }
            if *channel == ChannelId::Relay(2))
    })
    .await;
    if let SessionEvent::ChannelChanged { value, .. } = snap_back {
        assert_eq!(value, ChannelValue::OnOff(PowerState::Off));
    }

    session.shutdown().await;
    let writes = responder.await.unwrap();
    assert!(
        writes.iter().all(|w| !w.starts_with("Sw_")),
        "locked relay must not be written: {writes:?}"
    );
}

#[tokio::test]
async fn tunable_white_reports_and_writes() {
    let (board, board_port) = fake_board().await;
    let receive_port = free_udp_port().await;

    let responder = tokio::spawn(async move {
        let mut buf = [0u8; 128];
        loop {
            let (n, _) = board.recv_from(&mut buf).await.unwrap();
            let payload = String::from_utf8_lossy(&buf[..n]).into_owned();
            if payload == "wer da?" {
                board
                    .send_to(
                        b"NET-PwrCtrl:Cellar:127.0.0.1:Pump,0,0:Wh:40:End",
                        ("127.0.0.1", receive_port),
                    )
                    .await
                    .unwrap();
                continue;
            }
            return payload;
        }
    });

    let capabilities = avrelay_lib::Capabilities::builder()
        .relays(8)
        .color_temperature(ColorTemperatureRange::new(4000, 2202).unwrap())
        .build();
    let config = board_config(board_port, receive_port).with_capabilities(capabilities);
    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let mut session = DeviceSession::start(config, bus).await.unwrap();

    // The board's status frame carries the white position in percent.
    let white = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::ChannelChanged { channel, .. }
            if *channel == ChannelId::White)
    })
    .await;
    if let SessionEvent::ChannelChanged { value, .. } = white {
        assert_eq!(value, ChannelValue::Percent(40));
    }

    // A kelvin command is mapped through the configured range before it
    // goes on the wire.
    session
        .handle_command(ChannelId::White, Command::Decimal(2202.0))
        .unwrap();

    let written = tokio::time::timeout(Duration::from_secs(5), responder)
        .await
        .expect("write within 5s")
        .unwrap();
    assert_eq!(written, "Wh_100useracct");

    session.shutdown().await;
}

#[tokio::test]
async fn rejected_credentials_go_offline_immediately() {
    let (board, board_port) = fake_board().await;
    let receive_port = free_udp_port().await;

    let responder = tokio::spawn(async move {
        let mut buf = [0u8; 64];
        let (_, _) = board.recv_from(&mut buf).await.unwrap();
        board
            .send_to(b"NET-PwrCtrl:NoPass:End", ("127.0.0.1", receive_port))
            .await
            .unwrap();
    });

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let mut session = DeviceSession::start(board_config(board_port, receive_port), bus)
        .await
        .unwrap();

    let offline = wait_for(&mut events, SessionEvent::is_status_change).await;
    if let SessionEvent::StatusChanged { status, detail, .. } = offline {
        assert_eq!(status, SessionStatus::Offline);
        assert_eq!(detail, StatusDetail::ConfigurationError);
    }

    session.shutdown().await;
    responder.await.unwrap();
}

#[tokio::test]
async fn write_without_credentials_is_rejected_locally() {
    let (board, board_port) = fake_board().await;
    let receive_port = free_udp_port().await;

    let responder = tokio::spawn(async move {
        let mut buf = [0u8; 128];
        let mut writes = Vec::new();
        loop {
            let Ok(received) =
                tokio::time::timeout(Duration::from_secs(1), board.recv_from(&mut buf)).await
            else {
                return writes;
            };
            let (n, _) = received.unwrap();
            let payload = String::from_utf8_lossy(&buf[..n]).into_owned();
            if payload == "wer da?" {
                board
                    .send_to(
                        b"NET-PwrCtrl:Cellar:127.0.0.1:Pump,0,0:End",
                        ("127.0.0.1", receive_port),
                    )
                    .await
                    .unwrap();
            } else {
                writes.push(payload);
            }
        }
    });

    let config = SessionConfig::udp("127.0.0.1")
        .with_udp_ports(board_port, receive_port)
        .with_polling_interval(Duration::from_millis(50));
    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let mut session = DeviceSession::start(config, bus).await.unwrap();

    wait_for(&mut events, SessionEvent::is_status_change).await;

    // Queuing succeeds; the command task drops the write because no
    // credentials are configured.
    session
        .handle_command(ChannelId::Relay(1), Command::OnOff(PowerState::On))
        .unwrap();

    session.shutdown().await;
    let writes = responder.await.unwrap();
    assert!(writes.is_empty(), "unexpected writes: {writes:?}");
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `AvRelay` Lib - A Rust library to control AV receivers and networked
//! relay boards.
//!
//! Each device is driven by a [`session::DeviceSession`] that owns the
//! connection, polls the device, diffs every report against the last
//! known state and publishes only real changes as events. Applications
//! subscribe to the session's [`event::EventBus`] and send commands by
//! channel.
//!
//! # Supported Devices
//!
//! - **AV receivers** over telnet (port 23) or HTTP XML polling:
//!   per-zone power, mute, volume and input selection.
//! - **Relay boards** over UDP datagrams: switchable relay and IO ports,
//!   lockable per port, with broadcast discovery.
//!
//! # Quick Start
//!
//! ## Telnet Receiver
//!
//! ```no_run
//! use avrelay_lib::command::Command;
//! use avrelay_lib::event::EventBus;
//! use avrelay_lib::session::{DeviceSession, SessionConfig};
//! use avrelay_lib::types::PowerState;
//!
//! #[tokio::main]
//! async fn main() -> avrelay_lib::Result<()> {
//!     let bus = EventBus::new();
//!     let mut events = bus.subscribe();
//!
//!     let mut session =
//!         DeviceSession::start(SessionConfig::telnet("192.168.1.50"), bus).await?;
//!
//!     session.handle_command("mainPower".parse()?, Command::OnOff(PowerState::On))?;
//!     session.handle_command("mainVolume".parse()?, Command::Decimal(45.5))?;
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Relay Board
//!
//! ```no_run
//! use avrelay_lib::codec::udp::Credentials;
//! use avrelay_lib::command::Command;
//! use avrelay_lib::event::EventBus;
//! use avrelay_lib::session::{DeviceSession, SessionConfig};
//! use avrelay_lib::types::PowerState;
//!
//! #[tokio::main]
//! async fn main() -> avrelay_lib::Result<()> {
//!     let config = SessionConfig::udp("192.168.1.40")
//!         .with_credentials(Credentials::new("user", "acct"));
//!     let session = DeviceSession::start(config, EventBus::new()).await?;
//!
//!     session.handle_command("r3#state".parse()?, Command::OnOff(PowerState::On))?;
//!     Ok(())
//! }
//! ```
//!
//! ## Board Discovery
//!
//! ```no_run
//! use avrelay_lib::discovery::{discover_boards, DiscoveryOptions};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> avrelay_lib::Result<()> {
//!     let options = DiscoveryOptions::new().with_timeout(Duration::from_secs(10));
//!     for board in discover_boards(options).await? {
//!         println!("{} at {} ({} relays)", board.name, board.host, board.relays);
//!     }
//!     Ok(())
//! }
//! ```

mod capabilities;
pub mod channel;
pub mod codec;
pub mod command;
pub mod discovery;
pub mod error;
pub mod event;
pub mod health;
pub mod protocol;
pub mod session;
pub mod state;
pub mod status;
pub mod types;

pub use capabilities::{Capabilities, CapabilitiesBuilder};
pub use channel::{ChannelId, ChannelUpdate, ChannelValue, ZoneField};
pub use command::{Command, StepDirection};
pub use error::{DeviceError, Error, ParseError, ProtocolError, Result, ValueError};
pub use event::{DeviceId, EventBus, SessionEvent};
pub use protocol::ProtocolMode;
pub use session::{DeviceSession, SessionConfig};
pub use status::{SessionStatus, StatusDetail, StatusUpdate};
pub use types::{ColorTemperatureRange, PowerState, Volume, Zone};

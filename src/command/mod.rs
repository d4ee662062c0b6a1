// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generic device commands.
//!
//! A [`Command`] is the protocol-neutral request a caller hands to a
//! session together with a target channel. The sum type is dispatched
//! with one exhaustive match per consumer, so adding a command kind is a
//! compile error everywhere it is not handled.
//!
//! | Command | Purpose | Example |
//! |---------|---------|---------|
//! | [`Command::OnOff`] | Switch power, mute, relay or IO | `OnOff(PowerState::On)` |
//! | [`Command::IncreaseDecrease`] | Step a value | volume up |
//! | [`Command::Percent`] | Set a percentage (0-100) | volume to 50% |
//! | [`Command::Decimal`] | Set a value in device units | volume to 45.5 |
//! | [`Command::Text`] | Set a free-text value | input `DVD` |
//! | [`Command::Refresh`] | Re-read and republish current state | — |
//!
//! # Examples
//!
//! ```
//! use avrelay_lib::command::Command;
//! use avrelay_lib::types::PowerState;
//!
//! let cmd = Command::OnOff(PowerState::On);
//! assert_eq!(cmd.kind(), avrelay_lib::command::CommandKind::OnOff);
//! ```

mod queue;
mod translator;

pub use queue::{CommandQueue, PushOutcome, QueuedCommand};
pub use translator::{CommandTranslator, Translation};

use std::fmt;

use crate::types::PowerState;

/// Direction of a stepping command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StepDirection {
    /// Step the value up.
    Increase,
    /// Step the value down.
    Decrease,
}

/// A protocol-neutral device command.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Command {
    /// Switch the target on or off.
    OnOff(PowerState),
    /// Step the target up or down by one device step.
    IncreaseDecrease(StepDirection),
    /// Set the target as a percentage (0-100).
    Percent(u8),
    /// Set the target in device units.
    Decimal(f64),
    /// Set the target to a free-text value.
    Text(String),
    /// Re-read the target's current value and republish it.
    ///
    /// Carries no payload. In protocol modes without an explicit query
    /// this is a silent no-op; the value arrives with the next poll.
    Refresh,
}

impl Command {
    /// Returns the command's kind, used by the queue's
    /// replace-if-same-kind insertion policy.
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::OnOff(_) => CommandKind::OnOff,
            Self::IncreaseDecrease(_) => CommandKind::IncreaseDecrease,
            Self::Percent(_) => CommandKind::Percent,
            Self::Decimal(_) => CommandKind::Decimal,
            Self::Text(_) => CommandKind::Text,
            Self::Refresh => CommandKind::Refresh,
        }
    }

    /// Returns `true` if the command writes device state (everything
    /// except [`Command::Refresh`]).
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Refresh)
    }
}

/// The discriminant of a [`Command`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CommandKind {
    /// An on/off command.
    OnOff,
    /// A step command.
    IncreaseDecrease,
    /// A percentage command.
    Percent,
    /// A device-unit decimal command.
    Decimal,
    /// A free-text command.
    Text,
    /// A refresh request.
    Refresh,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OnOff => "OnOff",
            Self::IncreaseDecrease => "IncreaseDecrease",
            Self::Percent => "Percent",
            Self::Decimal => "Decimal",
            Self::Text => "Text",
            Self::Refresh => "Refresh",
        };
        f.write_str(name)
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded command queue with duplicate coalescing.
//!
//! Sessions take commands faster than slow devices accept them. The
//! queue is bounded, single-consumer, and coalesces: pushing a command
//! while one of the same kind for the same channel is still pending
//! replaces the pending one in place, so a user dragging a volume
//! slider produces one write, not fifty.
//!
//! # Examples
//!
//! ```
//! use avrelay_lib::command::{Command, CommandQueue, PushOutcome};
//! use avrelay_lib::channel::{ChannelId, ZoneField};
//!
//! let queue = CommandQueue::new(16);
//! let channel = ChannelId::main(ZoneField::Volume);
//!
//! assert_eq!(queue.push(channel, Command::Percent(40)), PushOutcome::Queued);
//! // Same kind, same channel: the pending command is replaced.
//! assert_eq!(queue.push(channel, Command::Percent(60)), PushOutcome::Replaced);
//! assert_eq!(queue.len(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::channel::ChannelId;

use super::Command;

/// A command waiting in the queue, together with its target channel.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCommand {
    /// The target channel.
    pub channel: ChannelId,
    /// The command to apply.
    pub command: Command,
}

/// Result of a [`CommandQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The command was appended.
    Queued,
    /// A pending command of the same kind for the same channel was
    /// replaced in place; queue order is unchanged.
    Replaced,
    /// The queue is full; the command was dropped.
    Rejected,
}

/// Bounded single-consumer command queue.
///
/// Clones share the same queue; the session owns the consuming side.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    pending: Mutex<VecDeque<QueuedCommand>>,
    notify: Notify,
    capacity: usize,
}

impl CommandQueue {
    /// Creates a queue holding at most `capacity` pending commands.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(VecDeque::with_capacity(capacity)),
                notify: Notify::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Enqueues a command.
    ///
    /// If a command of the same kind for the same channel is already
    /// pending it is replaced in place (keeping its queue position); a
    /// full queue rejects the command.
    pub fn push(&self, channel: ChannelId, command: Command) -> PushOutcome {
        let outcome = {
            let mut pending = self.inner.pending.lock();
            let same_kind = pending
                .iter_mut()
                .find(|queued| queued.channel == channel && queued.command.kind() == command.kind());
            if let Some(queued) = same_kind {
                queued.command = command;
                PushOutcome::Replaced
            } else if pending.len() >= self.inner.capacity {
                debug!(%channel, "command queue full, dropping command");
                PushOutcome::Rejected
            } else {
                pending.push_back(QueuedCommand { channel, command });
                PushOutcome::Queued
            }
        };
        if outcome != PushOutcome::Rejected {
            self.inner.notify.notify_one();
        }
        outcome
    }

    /// Removes and returns the oldest pending command, waiting up to
    /// `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout.
    pub async fn pop(&self, timeout: Duration) -> Option<QueuedCommand> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(queued) = self.inner.pending.lock().pop_front() {
                return Some(queued);
            }
            let notified = self.inner.notify.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.inner.pending.lock().pop_front();
            }
        }
    }

    /// Removes and returns the oldest pending command without waiting.
    #[must_use]
    pub fn try_pop(&self) -> Option<QueuedCommand> {
        self.inner.pending.lock().pop_front()
    }

    /// Returns the number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Returns `true` if no commands are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.pending.lock().is_empty()
    }

    /// Drops all pending commands.
    pub fn clear(&self) {
        self.inner.pending.lock().clear();
    }
}

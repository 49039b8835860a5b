// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command dispatch and acknowledgment correlation.
//!
//! The [`CommandDispatcher`] turns a [`CommandKind`] into wire frames, sends
//! them over the current link, and tracks the request until the machine
//! acknowledges it, rejects it, or the deadline passes.
//!
//! Several requests may be in flight at once; each is matched to its
//! response by [`CorrelationId`]. Only the last frame of a multi-frame
//! command carries the id.

mod handle;
mod pending;

pub use handle::CommandHandle;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::time::Instant;

use crate::command::{Command, CommandKind, CommandPlan, CommandRequest, CorrelationId};
use crate::error::CommandError;
use crate::protocol::{FrameSink, LinkWriter};
use crate::state::MachineState;

use pending::PendingTable;

/// Successful outcome of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The machine acknowledged the request.
    Acknowledged,
    /// Nothing needed sending; the machine was already in the requested state.
    NoOp,
}

/// Sends commands and correlates acknowledgments.
///
/// The supervisor attaches the link's writer when it connects and detaches
/// it on link loss. Commands issued while detached resolve with
/// `CommandError::ConnectionLost` immediately.
#[derive(Debug)]
pub struct CommandDispatcher<S = LinkWriter> {
    link: RwLock<Option<S>>,
    pending: Arc<PendingTable>,
    next_id: AtomicU64,
    timeout: Duration,
    closed: AtomicBool,
}

impl<S: FrameSink + Clone> CommandDispatcher<S> {
    /// Creates a detached dispatcher whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            link: RwLock::new(None),
            pending: Arc::new(PendingTable::default()),
            next_id: AtomicU64::new(1),
            timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the acknowledgment timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Routes subsequent commands over `sink`.
    pub fn attach(&self, sink: S) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        *self.link.write() = Some(sink);
    }

    /// Stops routing commands. Returns the previous sink.
    pub fn detach(&self) -> Option<S> {
        self.link.write().take()
    }

    /// Returns `true` while a link is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.link.read().is_some()
    }

    /// Returns the number of requests awaiting acknowledgment.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn allocate_id(&self) -> CorrelationId {
        CorrelationId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Validates `kind` against `state`, sends its frames, and returns a
    /// handle to the outcome.
    ///
    /// Without an attached link every command resolves with
    /// `ConnectionLost`, including ones that would otherwise be a no-op.
    /// Frames of a multi-frame command are spaced by
    /// [`CommandKind::frame_spacing`].
    pub async fn issue(&self, kind: CommandKind, state: &MachineState) -> CommandHandle {
        if self.closed.load(Ordering::Acquire) {
            return CommandHandle::ready(kind, Err(CommandError::ConnectionLost));
        }
        let Some(sink) = self.link.read().clone() else {
            tracing::debug!(command = %kind, "no link; command not sent");
            return CommandHandle::ready(kind, Err(CommandError::ConnectionLost));
        };

        let frames = match kind.plan(state) {
            Ok(CommandPlan::Send(frames)) => frames,
            Ok(CommandPlan::NoOp) => {
                tracing::debug!(command = %kind, "command is a no-op");
                return CommandHandle::ready(kind, Ok(CommandOutcome::NoOp));
            }
            Err(e) => {
                tracing::debug!(command = %kind, error = %e, "command rejected before sending");
                return CommandHandle::ready(kind, Err(e));
            }
        };

        let id = self.allocate_id();
        let rx = self.pending.insert(id);
        let last = frames.len().saturating_sub(1);
        let spacing = kind.frame_spacing();

        for (index, frame) in frames.iter().enumerate() {
            if index > 0 && !spacing.is_zero() {
                tokio::time::sleep(spacing).await;
            }
            if self.closed.load(Ordering::Acquire) || !self.is_attached() {
                tracing::debug!(%id, command = %kind, sent = index, "link gone mid-command");
                self.pending.remove(id);
                return CommandHandle::ready(kind, Err(CommandError::ConnectionLost));
            }
            let rid = (index == last).then_some(id);
            if let Err(e) = sink.send_frame(frame.to_frame(rid)).await {
                tracing::warn!(%id, command = %kind, error = %e, "failed to send command");
                self.pending.remove(id);
                return CommandHandle::ready(kind, Err(CommandError::ConnectionLost));
            }
        }
        tracing::debug!(%id, command = %kind, frames = frames.len(), "command sent");

        let request = CommandRequest {
            id,
            kind,
            deadline: Instant::now() + self.timeout,
        };
        CommandHandle::waiting(request, rx, Arc::clone(&self.pending), self.timeout)
    }

    /// Resolves a request acknowledged by the machine.
    ///
    /// Returns `false` for unknown or already resolved ids.
    pub fn resolve_ack(&self, id: CorrelationId) -> bool {
        let resolved = self.pending.resolve(id, Ok(CommandOutcome::Acknowledged));
        if !resolved {
            tracing::debug!(%id, "ack for unknown request");
        }
        resolved
    }

    /// Resolves a request rejected by the machine.
    pub fn resolve_nack(&self, id: CorrelationId, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        tracing::debug!(%id, %reason, "command rejected by machine");
        self.pending.resolve(id, Err(CommandError::Rejected(reason)))
    }

    /// Fails every in-flight request with `error`.
    pub fn fail_all(&self, error: &CommandError) -> usize {
        let count = self.pending.fail_all(error);
        if count > 0 {
            tracing::debug!(count, %error, "failed in-flight commands");
        }
        count
    }

    /// Stops accepting commands, detaches the link and fails everything in
    /// flight with `ConnectionLost`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.detach();
        self.fail_all(&CommandError::ConnectionLost);
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handle to an issued command.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::command::{CommandKind, CommandRequest};
use crate::error::CommandError;
use crate::protocol::duration_ms;

use super::CommandOutcome;
use super::pending::{PendingTable, Resolution};

#[derive(Debug)]
enum HandleState {
    Ready(Resolution),
    Waiting {
        rx: oneshot::Receiver<Resolution>,
        pending: Arc<PendingTable>,
        request: CommandRequest,
        timeout: Duration,
    },
}

/// Resolves to the outcome of one issued command.
///
/// Commands rejected before sending (validation, no link, no-op) produce a
/// handle that is already resolved.
#[derive(Debug)]
#[must_use = "a command handle does nothing unless awaited"]
pub struct CommandHandle {
    kind: CommandKind,
    state: HandleState,
}

impl CommandHandle {
    pub(crate) fn ready(kind: CommandKind, resolution: Resolution) -> Self {
        Self {
            kind,
            state: HandleState::Ready(resolution),
        }
    }

    pub(crate) fn waiting(
        request: CommandRequest,
        rx: oneshot::Receiver<Resolution>,
        pending: Arc<PendingTable>,
        timeout: Duration,
    ) -> Self {
        Self {
            kind: request.kind.clone(),
            state: HandleState::Waiting {
                rx,
                pending,
                request,
                timeout,
            },
        }
    }

    /// Returns the command this handle tracks.
    #[must_use]
    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Returns the request if frames were sent.
    #[must_use]
    pub fn request(&self) -> Option<&CommandRequest> {
        match &self.state {
            HandleState::Ready(_) => None,
            HandleState::Waiting { request, .. } => Some(request),
        }
    }

    /// Returns the deadline if frames were sent.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.request().map(|r| r.deadline)
    }

    /// Waits for the outcome.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Timeout` if no acknowledgment arrives before the
    /// deadline, `CommandError::Rejected` on a negative acknowledgment, and
    /// `CommandError::ConnectionLost` if the link dropped first. Validation
    /// failures surface as `Precondition` or `Invalid`.
    pub async fn outcome(self) -> Result<CommandOutcome, CommandError> {
        match self.state {
            HandleState::Ready(resolution) => resolution,
            HandleState::Waiting {
                rx,
                pending,
                request,
                timeout,
            } => match tokio::time::timeout_at(request.deadline, rx).await {
                Ok(Ok(resolution)) => resolution,
                Ok(Err(_)) => Err(CommandError::ConnectionLost),
                Err(_) => {
                    pending.remove(request.id);
                    tracing::warn!(id = %request.id, command = %request.kind, "command timed out");
                    Err(CommandError::Timeout(duration_ms(timeout)))
                }
            },
        }
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Table of requests awaiting acknowledgment.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::command::CorrelationId;
use crate::error::CommandError;

use super::CommandOutcome;

pub(crate) type Resolution = Result<CommandOutcome, CommandError>;

/// In-flight requests keyed by correlation id.
///
/// Each entry is resolved at most once: whichever of ack, nack, timeout or
/// connection loss gets to it first removes it.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    entries: Mutex<HashMap<CorrelationId, oneshot::Sender<Resolution>>>,
}

impl PendingTable {
    pub(crate) fn insert(&self, id: CorrelationId) -> oneshot::Receiver<Resolution> {
        let (tx, rx) = oneshot::channel();
        self.entries.lock().insert(id, tx);
        rx
    }

    /// Resolves one request. Returns `false` if it was no longer pending.
    pub(crate) fn resolve(&self, id: CorrelationId, resolution: Resolution) -> bool {
        let Some(tx) = self.entries.lock().remove(&id) else {
            return false;
        };
        // The caller may have dropped its handle
        let _ = tx.send(resolution);
        true
    }

    /// Drops a request without resolving it.
    pub(crate) fn remove(&self, id: CorrelationId) -> bool {
        self.entries.lock().remove(&id).is_some()
    }

    /// Resolves every request with `error`. Returns how many there were.
    pub(crate) fn fail_all(&self, error: &CommandError) -> usize {
        let drained: Vec<_> = self.entries.lock().drain().collect();
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(error.clone()));
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

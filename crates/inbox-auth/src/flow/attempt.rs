//! Bookkeeping for live attempts: the per-account table, the RAII guards
//! that release an attempt's resources, and the handle for spawned flows

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{AuthError, Result};
use crate::models::{AccountId, FlowOutcome, FlowState};
use crate::services::AuthSurface;

struct LiveEntry {
    attempt_id: u64,
    cancel: CancellationToken,
    state: FlowState,
    opened_at: DateTime<Utc>,
}

/// At most one live attempt per account
#[derive(Default)]
pub(crate) struct LiveTable {
    next_id: AtomicU64,
    entries: Mutex<HashMap<AccountId, LiveEntry>>,
}

impl LiveTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<AccountId, LiveEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim the account for a new attempt
    pub(crate) fn register(self: &Arc<Self>, account: &AccountId) -> Result<AttemptGuard> {
        let mut entries = self.lock();
        if entries.contains_key(account) {
            return Err(AuthError::FlowInProgress(account.clone()));
        }
        let attempt_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        entries.insert(
            account.clone(),
            LiveEntry {
                attempt_id,
                cancel: cancel.clone(),
                state: FlowState::Opening,
                opened_at: Utc::now(),
            },
        );
        Ok(AttemptGuard {
            table: Arc::clone(self),
            account: account.clone(),
            attempt_id,
            cancel,
        })
    }

    pub(crate) fn state(&self, account: &AccountId) -> FlowState {
        self.lock()
            .get(account)
            .map_or(FlowState::Idle, |entry| entry.state)
    }

    pub(crate) fn opened_at(&self, account: &AccountId) -> Option<DateTime<Utc>> {
        self.lock().get(account).map(|entry| entry.opened_at)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn cancel(&self, account: &AccountId) -> bool {
        match self.lock().get(account) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn set_state(&self, account: &AccountId, attempt_id: u64, state: FlowState) {
        if let Some(entry) = self.lock().get_mut(account)
            && entry.attempt_id == attempt_id
        {
            entry.state = state;
        }
    }

    /// Remove the entry if it still belongs to this attempt.
    ///
    /// Returns `false` on the second call, which is what makes termination
    /// idempotent.
    fn release(&self, account: &AccountId, attempt_id: u64) -> bool {
        let mut entries = self.lock();
        match entries.get(account) {
            Some(entry) if entry.attempt_id == attempt_id => {
                entries.remove(account);
                true
            }
            _ => false,
        }
    }
}

/// Ownership of one live attempt; dropping it frees the account slot
pub(crate) struct AttemptGuard {
    table: Arc<LiveTable>,
    account: AccountId,
    attempt_id: u64,
    cancel: CancellationToken,
}

impl AttemptGuard {
    pub(crate) fn account(&self) -> &AccountId {
        &self.account
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn set_state(&self, state: FlowState) {
        debug!("Flow for {} -> {:?}", self.account, state);
        self.table.set_state(&self.account, self.attempt_id, state);
    }

    /// Reach a terminal state. Only the first call returns `true`.
    pub(crate) fn finish(&self, state: FlowState) -> bool {
        self.set_state(state);
        self.table.release(&self.account, self.attempt_id)
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        if self.table.release(&self.account, self.attempt_id) {
            debug!("Flow for {} dropped before completion", self.account);
        }
    }
}

/// Exclusive ownership of an opened surface.
///
/// Unless the surface was observed closed and released, dropping the guard
/// force-closes it.
pub(crate) struct SurfaceGuard {
    account: AccountId,
    surface: Option<Box<dyn AuthSurface>>,
}

impl SurfaceGuard {
    pub(crate) fn new(account: AccountId, surface: Box<dyn AuthSurface>) -> Self {
        Self {
            account,
            surface: Some(surface),
        }
    }

    pub(crate) fn is_closed(&mut self) -> anyhow::Result<bool> {
        match self.surface.as_mut() {
            Some(surface) => surface.is_closed(),
            None => Ok(true),
        }
    }

    /// Give up the handle after the surface closed on its own
    pub(crate) fn release(&mut self) {
        self.surface = None;
    }
}

impl Drop for SurfaceGuard {
    fn drop(&mut self) {
        let Some(mut surface) = self.surface.take() else {
            return;
        };
        if matches!(surface.is_closed(), Ok(true)) {
            return;
        }
        debug!("Force-closing authorization window for {}", self.account);
        if let Err(e) = surface.force_close() {
            warn!(
                "Failed to close authorization window for {}: {:#}",
                self.account, e
            );
        }
    }
}

/// Handle to a flow running on its own task
pub struct FlowTask {
    account: AccountId,
    cancel: CancellationToken,
    join: JoinHandle<Result<FlowOutcome>>,
}

impl FlowTask {
    pub(crate) fn new(
        account: AccountId,
        cancel: CancellationToken,
        join: JoinHandle<Result<FlowOutcome>>,
    ) -> Self {
        Self {
            account,
            cancel,
            join,
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Request cancellation; the flow resolves as `Failed(Cancelled)`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the terminal outcome
    ///
    /// A panic inside the flow task is resumed on the caller.
    pub async fn wait(self) -> Result<FlowOutcome> {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                warn!("Flow task for {} aborted: {}", self.account, e);
                Err(AuthError::Cancelled)
            }
        }
    }
}

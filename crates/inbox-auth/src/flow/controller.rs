//! Drives one authentication attempt per account
//!
//! The controller cannot see inside the authorization window, so completion
//! is inferred: poll the window until it is gone, give the backend a moment
//! to persist the provider's callback, then ask the backend for the truth.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep, sleep_until};
use url::Url;

use super::FlowTiming;
use super::attempt::{AttemptGuard, FlowTask, LiveTable, SurfaceGuard};
use crate::error::{AuthError, Result};
use crate::models::{AccountId, AuthenticationRecord, FailureReason, FlowOutcome, FlowState};
use crate::registry::AccountAuthRegistry;
use crate::services::{DisplayHint, SurfaceOpener, SurfaceRequest};

/// Runs authentication attempts and records their results in the registry
pub struct AuthFlowController {
    pub(super) registry: Arc<AccountAuthRegistry>,
    opener: Arc<dyn SurfaceOpener>,
    authorize_url: Url,
    hint: DisplayHint,
    pub(super) timing: FlowTiming,
    refresh_after_flow: bool,
    live: Arc<LiveTable>,
}

impl AuthFlowController {
    /// Create a controller with default timing and window size
    ///
    /// # Arguments
    /// * `registry` - Registry that receives reconciled records
    /// * `opener` - Opens the authorization window
    /// * `authorize_url` - Backend endpoint that starts the provider's consent flow;
    ///   the account is appended as the `email` query parameter
    pub fn new(
        registry: Arc<AccountAuthRegistry>,
        opener: Arc<dyn SurfaceOpener>,
        authorize_url: Url,
    ) -> Self {
        Self {
            registry,
            opener,
            authorize_url,
            hint: DisplayHint::default(),
            timing: FlowTiming::default(),
            refresh_after_flow: false,
            live: Arc::new(LiveTable::default()),
        }
    }

    pub fn with_timing(mut self, timing: FlowTiming) -> Self {
        self.timing = timing.normalized();
        self
    }

    pub fn with_display_hint(mut self, hint: DisplayHint) -> Self {
        self.hint = hint;
        self
    }

    /// Refresh every account's record after each reconciled flow, so a
    /// consent that also covered other accounts shows up right away
    pub fn with_refresh_after_flow(mut self, enabled: bool) -> Self {
        self.refresh_after_flow = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<AccountAuthRegistry> {
        &self.registry
    }

    pub fn timing(&self) -> FlowTiming {
        self.timing
    }

    /// Current state of the account's attempt (`Idle` when none is live)
    pub fn state(&self, account: &AccountId) -> FlowState {
        self.live.state(account)
    }

    /// When the live attempt for this account was started
    pub fn opened_at(&self, account: &AccountId) -> Option<DateTime<Utc>> {
        self.live.opened_at(account)
    }

    /// Number of attempts currently in flight
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Cancel the live attempt for an account. Returns `false` if none is running.
    pub fn cancel(&self, account: &AccountId) -> bool {
        let cancelled = self.live.cancel(account);
        if cancelled {
            info!("Cancelling authentication for {}", account);
        }
        cancelled
    }

    /// URI the authorization window is pointed at for this account
    pub fn authorization_uri(&self, account: &AccountId) -> Url {
        let mut uri = self.authorize_url.clone();
        uri.query_pairs_mut().append_pair("email", account.as_str());
        uri
    }

    /// Run one attempt to completion on the current task
    ///
    /// Returns `Err(FlowInProgress)` if the account already has a live
    /// attempt, and `Err(SurfaceUnavailable)` if the window could not be
    /// opened. Every other ending, including timeout and cancellation, is
    /// an `Ok(FlowOutcome)`.
    pub async fn authenticate(&self, account: &AccountId) -> Result<FlowOutcome> {
        let attempt = self.begin(account)?;
        self.run(attempt).await
    }

    /// Spawn an attempt on the tokio runtime
    ///
    /// The in-progress check happens before this returns, so a second
    /// `start` for the same account fails immediately.
    pub fn start(self: &Arc<Self>, account: &AccountId) -> Result<FlowTask> {
        let attempt = self.begin(account)?;
        let cancel = attempt.cancel_token();
        let this = Arc::clone(self);
        let join = tokio::spawn(async move { this.run(attempt).await });
        Ok(FlowTask::new(account.clone(), cancel, join))
    }

    fn begin(&self, account: &AccountId) -> Result<AttemptGuard> {
        self.registry.upsert_account(account);
        self.live.register(account)
    }

    async fn run(&self, attempt: AttemptGuard) -> Result<FlowOutcome> {
        let account = attempt.account().clone();
        let cancel = attempt.cancel_token();
        let deadline = Instant::now() + self.timing.timeout;
        info!("Starting authentication for {}", account);

        // Biased: cancellation, then the deadline, win any tie with the pipeline.
        // Dropping the losing pipeline drops its timers and surface guard.
        let (result, reconciled) = tokio::select! {
            biased;
            _ = cancel.cancelled() => (Ok(FlowOutcome::Failed(FailureReason::Cancelled)), false),
            _ = sleep_until(deadline) => (Ok(FlowOutcome::Failed(FailureReason::Timeout)), false),
            result = self.pipeline(&attempt) => {
                let reconciled = result.is_ok();
                (result, reconciled)
            }
        };

        let outcome = match &result {
            Ok(outcome) => outcome.clone(),
            Err(AuthError::SurfaceUnavailable(msg)) => {
                FlowOutcome::Failed(FailureReason::SurfaceUnavailable(msg.clone()))
            }
            Err(e) => FlowOutcome::Failed(FailureReason::QueryFailure(e.to_string())),
        };

        if attempt.finish(outcome.terminal_state()) {
            match &outcome {
                FlowOutcome::Succeeded => info!("Successfully authenticated {}", account),
                FlowOutcome::Failed(reason) => {
                    warn!("Authentication failed for {}: {}", account, reason)
                }
            }
            self.registry.observers().flow_finished(&account, &outcome);
        }
        if reconciled && self.refresh_after_flow {
            self.registry.refresh_all().await;
        }
        result
    }

    async fn pipeline(&self, attempt: &AttemptGuard) -> Result<FlowOutcome> {
        let account = attempt.account();

        attempt.set_state(FlowState::Opening);
        let request = SurfaceRequest {
            uri: self.authorization_uri(account),
            hint: self.hint,
        };
        let surface = self
            .opener
            .open(request)
            .await
            .map_err(|e| AuthError::SurfaceUnavailable(format!("{e:#}")))?;
        let mut surface = SurfaceGuard::new(account.clone(), surface);

        attempt.set_state(FlowState::Polling);
        let period = self.timing.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match surface.is_closed() {
                Ok(true) => break,
                Ok(false) => {}
                // Cross-origin inspection errors are expected while the provider's page is up
                Err(e) => debug!("Window state for {} undetermined: {:#}", account, e),
            }
        }
        surface.release();

        attempt.set_state(FlowState::Settling);
        sleep(self.timing.settle_delay).await;

        attempt.set_state(FlowState::Reconciling);
        let (record, outcome) = match self.registry.query_authoritative(account).await {
            Ok(record) => {
                let outcome = if record.authenticated {
                    FlowOutcome::Succeeded
                } else {
                    FlowOutcome::Failed(FailureReason::NotAuthenticated)
                };
                (record, outcome)
            }
            Err(AuthError::QueryFailure { message, .. }) => (
                AuthenticationRecord::failed(message.clone()),
                FlowOutcome::Failed(FailureReason::QueryFailure(message)),
            ),
            Err(e) => return Err(e),
        };
        if let Err(e) = self.registry.store_record(account, record) {
            warn!("Could not record status for {}: {}", account, e);
        }
        Ok(outcome)
    }
}

//! Sequential "authenticate everything still pending" driver

use log::{info, warn};
use tokio::time::sleep;

use super::AuthFlowController;
use crate::error::AuthError;
use crate::models::{AccountId, FailureReason, FlowOutcome};

/// Summary of one pass of the sequential driver
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DriverReport {
    /// Accounts a flow was actually run for, in order
    pub attempted: Vec<AccountId>,
    pub succeeded: Vec<AccountId>,
    pub failed: Vec<(AccountId, FailureReason)>,
    /// Already authenticated, or another flow was running for them
    pub skipped: Vec<AccountId>,
}

impl AuthFlowController {
    /// Authenticate every registered account that is not authenticated yet.
    ///
    /// Flows run one at a time so only one authorization window competes
    /// for the user's attention, with `inter_attempt_delay` after each.
    /// A failed account never stops the pass.
    pub async fn authenticate_all_pending(&self) -> DriverReport {
        let mut report = DriverReport::default();
        let accounts = self.registry.list_accounts();
        info!("Authenticating pending accounts ({} registered)", accounts.len());

        for account in accounts {
            // Re-checked per account: earlier flows or concurrent removals may have changed things
            if !self.registry.contains(&account) {
                continue;
            }
            if self.registry.is_authenticated(&account) {
                report.skipped.push(account);
                continue;
            }

            let result = self.authenticate(&account).await;
            match result {
                Err(AuthError::FlowInProgress(_)) => {
                    info!("Skipping {}: a flow is already running", account);
                    report.skipped.push(account);
                    continue;
                }
                Ok(FlowOutcome::Succeeded) => {
                    report.attempted.push(account.clone());
                    report.succeeded.push(account);
                }
                Ok(FlowOutcome::Failed(reason)) => {
                    report.attempted.push(account.clone());
                    report.failed.push((account, reason));
                }
                Err(e) => {
                    warn!("Authentication for {} did not start: {}", account, e);
                    report.attempted.push(account.clone());
                    report.failed.push((account, failure_reason(e)));
                }
            }

            sleep(self.timing.inter_attempt_delay).await;
        }

        info!(
            "Pending authentication pass done: {} succeeded, {} failed, {} skipped",
            report.succeeded.len(),
            report.failed.len(),
            report.skipped.len()
        );
        report
    }
}

fn failure_reason(err: AuthError) -> FailureReason {
    match err {
        AuthError::SurfaceUnavailable(msg) => FailureReason::SurfaceUnavailable(msg),
        AuthError::QueryFailure { message, .. } => FailureReason::QueryFailure(message),
        AuthError::Timeout => FailureReason::Timeout,
        AuthError::Cancelled => FailureReason::Cancelled,
        other => FailureReason::QueryFailure(other.to_string()),
    }
}

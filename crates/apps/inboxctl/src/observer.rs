//! Console rendering of authentication events

use inbox_auth::{AccountId, AuthObserver, AuthSummary, FlowOutcome};

/// Prints aggregate changes and flow outcomes to stdout
pub struct ConsoleObserver;

impl AuthObserver for ConsoleObserver {
    fn on_aggregate_changed(&self, summary: &AuthSummary) {
        println!("[{}] {}", summary.status.as_str(), summary.status_message());
    }

    fn on_flow_finished(&self, account: &AccountId, outcome: &FlowOutcome) {
        match outcome {
            FlowOutcome::Succeeded => println!("Successfully authenticated {}", account),
            FlowOutcome::Failed(reason) => {
                println!("Authentication failed for {}: {}", account, reason)
            }
        }
    }
}

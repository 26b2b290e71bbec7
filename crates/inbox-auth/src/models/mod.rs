//! Domain models for inbox authentication

mod account;
mod outcome;
mod record;

pub use account::{AccountId, AccountStatus};
pub use outcome::{FailureReason, FlowOutcome, FlowState};
pub use record::{AggregateStatus, AuthSummary, AuthenticationRecord};

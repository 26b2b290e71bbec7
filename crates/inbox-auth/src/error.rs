//! Error taxonomy for registry and flow operations

use crate::models::AccountId;

/// Errors surfaced by the registry and the flow controller
///
/// Timeouts and cancellations normally arrive as a `FlowOutcome`; the
/// variants exist here so callers converting outcomes into errors have
/// somewhere to put them.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The authorization window could not be opened (e.g. blocked or no browser)
    #[error("authorization surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// The authoritative status query failed for one account
    #[error("status query failed for {account}: {message}")]
    QueryFailure { account: AccountId, message: String },

    /// The operation referenced an account that was never registered
    #[error("unknown account: {0}")]
    UnknownAccount(AccountId),

    /// A flow for this account is already running
    #[error("authentication flow already in progress for {0}")]
    FlowInProgress(AccountId),

    #[error("authentication timed out")]
    Timeout,

    #[error("authentication cancelled")]
    Cancelled,
}

pub type Result<T, E = AuthError> = std::result::Result<T, E>;

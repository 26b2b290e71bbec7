//! Flow states and terminal outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a single authentication attempt currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowState {
    Idle,
    Opening,
    Polling,
    Settling,
    Reconciling,
    Succeeded,
    Failed,
    TimedOut,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }
}

/// Why an attempt ended without the account being authenticated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The surface closed but the backend does not consider the account authenticated
    NotAuthenticated,
    /// The authoritative status query itself failed
    QueryFailure(String),
    /// The authorization surface could not be opened
    SurfaceUnavailable(String),
    Timeout,
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => f.write_str("not authenticated"),
            Self::QueryFailure(msg) => write!(f, "status query failed: {msg}"),
            Self::SurfaceUnavailable(msg) => write!(f, "authorization window unavailable: {msg}"),
            Self::Timeout => f.write_str("timeout"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Terminal result of one authentication attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowOutcome {
    Succeeded,
    Failed(FailureReason),
}

impl FlowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// The terminal state this outcome corresponds to
    pub fn terminal_state(&self) -> FlowState {
        match self {
            Self::Succeeded => FlowState::Succeeded,
            Self::Failed(FailureReason::Timeout) => FlowState::TimedOut,
            Self::Failed(_) => FlowState::Failed,
        }
    }
}

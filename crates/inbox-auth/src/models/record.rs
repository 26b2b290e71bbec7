//! Authentication records and the aggregate status computed over them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-known authentication state for one account
///
/// Only ever built from an authoritative status query (or a failed one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationRecord {
    pub authenticated: bool,
    pub last_error: Option<String>,
    /// When the authoritative answer was obtained
    pub checked_at: DateTime<Utc>,
}

impl AuthenticationRecord {
    pub fn new(authenticated: bool, last_error: Option<String>) -> Self {
        Self {
            authenticated,
            last_error,
            checked_at: Utc::now(),
        }
    }

    pub fn authenticated() -> Self {
        Self::new(true, None)
    }

    pub fn unauthenticated() -> Self {
        Self::new(false, None)
    }

    /// Record for an account whose status query itself errored
    pub fn failed(error: impl Into<String>) -> Self {
        Self::new(false, Some(error.into()))
    }
}

/// System-wide summary over every known account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    None,
    Partial,
    Complete,
}

impl AggregateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Partial => "partial",
            Self::Complete => "complete",
        }
    }
}

/// Aggregate status together with the counts it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSummary {
    pub status: AggregateStatus,
    pub authenticated_count: usize,
    pub total_count: usize,
}

impl AuthSummary {
    /// Derive the summary from raw counts
    ///
    /// `none` iff nothing is authenticated (including the empty registry),
    /// `complete` iff every account is, `partial` otherwise.
    pub fn from_counts(authenticated_count: usize, total_count: usize) -> Self {
        let status = if authenticated_count == 0 {
            AggregateStatus::None
        } else if authenticated_count >= total_count {
            AggregateStatus::Complete
        } else {
            AggregateStatus::Partial
        };
        Self {
            status,
            authenticated_count,
            total_count,
        }
    }

    /// Processing needs at least one authenticated inbox
    pub fn can_start_processing(&self) -> bool {
        self.authenticated_count > 0
    }

    /// One-line, human-readable status
    pub fn status_message(&self) -> String {
        match self.status {
            AggregateStatus::None => {
                "No Gmail inboxes authenticated. Please authenticate at least one inbox."
                    .to_string()
            }
            AggregateStatus::Partial => format!(
                "{}/{} inboxes authenticated. Some inboxes need authentication.",
                self.authenticated_count, self.total_count
            ),
            AggregateStatus::Complete => format!(
                "All {} Gmail inboxes are authenticated. System ready!",
                self.total_count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_none() {
        let summary = AuthSummary::from_counts(0, 0);
        assert_eq!(summary.status, AggregateStatus::None);
        assert!(!summary.can_start_processing());
    }

    #[test]
    fn test_partial_and_complete() {
        assert_eq!(AuthSummary::from_counts(1, 3).status, AggregateStatus::Partial);
        assert_eq!(AuthSummary::from_counts(3, 3).status, AggregateStatus::Complete);
        assert_eq!(AuthSummary::from_counts(0, 3).status, AggregateStatus::None);
    }

    #[test]
    fn test_status_message() {
        assert_eq!(
            AuthSummary::from_counts(2, 5).status_message(),
            "2/5 inboxes authenticated. Some inboxes need authentication."
        );
        assert_eq!(
            AuthSummary::from_counts(4, 4).status_message(),
            "All 4 Gmail inboxes are authenticated. System ready!"
        );
    }

    #[test]
    fn test_failed_record_keeps_error() {
        let record = AuthenticationRecord::failed("HTTP 502");
        assert!(!record.authenticated);
        assert_eq!(record.last_error.as_deref(), Some("HTTP 502"));
    }

    #[test]
    fn test_aggregate_serializes_lowercase() {
        let json = serde_json::to_string(&AggregateStatus::Partial).unwrap();
        assert_eq!(json, "\"partial\"");
    }
}

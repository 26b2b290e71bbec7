//! Account identity and per-account status rows

use serde::{Deserialize, Serialize};
use std::fmt;

use super::AuthenticationRecord;

/// Opaque identifier for a mailbox whose credentials are managed here
///
/// In practice this is an email address, but nothing in the crate
/// inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One row of a registry snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatus {
    pub account: AccountId,
    /// Latest reconciled record; `None` until the first authoritative query
    pub record: Option<AuthenticationRecord>,
}

impl AccountStatus {
    /// Whether the last reconciliation reported this account as authenticated
    pub fn is_authenticated(&self) -> bool {
        self.record.as_ref().is_some_and(|r| r.authenticated)
    }

    /// Short label for list rendering
    pub fn label(&self) -> &'static str {
        match &self.record {
            None => "Unknown",
            Some(r) if r.authenticated => "Authenticated",
            Some(r) if r.last_error.is_some() => "Error",
            Some(_) => "Pending",
        }
    }
}

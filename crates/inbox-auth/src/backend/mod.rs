//! HTTP integration with the inbox backend
//!
//! This module provides:
//! - A JSON client for the inbox list, auth status and ingest endpoints
//! - Wire types for those endpoints

mod client;

pub use client::BackendClient;

/// Backend response types
pub mod api {
    use serde::Deserialize;

    use crate::models::AuthenticationRecord;

    /// Response from `GET /api/inbox/list`
    #[derive(Debug, Deserialize)]
    pub struct InboxListResponse {
        #[serde(default)]
        pub inboxes: Vec<String>,
    }

    /// Response from `GET /api/auth/status`
    #[derive(Debug, Deserialize)]
    pub struct AuthStatusResponse {
        #[serde(default)]
        pub authenticated: bool,
        #[serde(default)]
        pub error: Option<String>,
    }

    impl From<AuthStatusResponse> for AuthenticationRecord {
        fn from(response: AuthStatusResponse) -> Self {
            AuthenticationRecord::new(response.authenticated, response.error)
        }
    }

    /// Acknowledgement returned by POST endpoints
    #[derive(Debug, Deserialize)]
    pub struct DetailResponse {
        #[serde(default)]
        pub detail: String,
    }
}

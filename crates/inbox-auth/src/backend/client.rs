//! Backend HTTP client
//!
//! Uses synchronous HTTP (ureq) on tokio's blocking pool so the flow
//! controller never blocks the runtime.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::api::{AuthStatusResponse, DetailResponse, InboxListResponse};
use crate::models::{AccountId, AuthenticationRecord};
use crate::services::{AccountSource, StatusService};

/// JSON client for the inbox backend
#[derive(Clone)]
pub struct BackendClient {
    base: Url,
    agent: ureq::Agent,
}

impl BackendClient {
    /// Per-request timeout
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a client for the backend at `base_url` (e.g. `http://localhost:8000`)
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .with_context(|| format!("Invalid backend URL: {}", base_url))?;
        // Url::join drops the last path segment unless it ends in a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Self::REQUEST_TIMEOUT))
            .build()
            .into();

        Ok(Self { base, agent })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Invalid endpoint path: {}", path))
    }

    /// Endpoint that redirects to the provider's consent screen
    pub fn authorize_url(&self) -> Result<Url> {
        self.endpoint("auth/google")
    }

    async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || {
            debug!("GET {}", url);
            let mut response = agent
                .get(url.as_str())
                .call()
                .with_context(|| format!("Request to {} failed", url))?;
            response
                .body_mut()
                .read_json::<T>()
                .with_context(|| format!("Failed to parse response from {}", url))
        })
        .await
        .context("HTTP worker task failed")?
    }

    async fn post_form(&self, url: Url, form: Vec<(String, String)>) -> Result<DetailResponse> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || {
            debug!("POST {}", url);
            let pairs = form.iter().map(|(k, v)| (k.as_str(), v.as_str()));
            let mut response = agent
                .post(url.as_str())
                .send_form(pairs)
                .with_context(|| format!("Request to {} failed", url))?;
            response
                .body_mut()
                .read_json::<DetailResponse>()
                .with_context(|| format!("Failed to parse response from {}", url))
        })
        .await
        .context("HTTP worker task failed")?
    }

    /// Configured inboxes, in the backend's order
    pub async fn list_inboxes(&self) -> Result<Vec<AccountId>> {
        let url = self.endpoint("api/inbox/list")?;
        let response: InboxListResponse = self.get_json(url).await?;
        Ok(response.inboxes.into_iter().map(AccountId::from).collect())
    }

    /// Authentication status for one inbox
    pub async fn auth_status(&self, account: &AccountId) -> Result<AuthenticationRecord> {
        let mut url = self.endpoint("api/auth/status")?;
        url.query_pairs_mut().append_pair("email", account.as_str());
        let response: AuthStatusResponse = self.get_json(url).await?;
        Ok(response.into())
    }

    /// Backend-wide authentication status
    pub async fn system_status(&self) -> Result<AuthenticationRecord> {
        let url = self.endpoint("api/auth/status")?;
        let response: AuthStatusResponse = self.get_json(url).await?;
        Ok(response.into())
    }

    /// Register a new inbox with the backend
    pub async fn add_inbox(&self, email: &str, description: &str) -> Result<String> {
        let url = self.endpoint("api/emails/import")?;
        let form = vec![
            ("email_address".to_string(), email.to_string()),
            ("description".to_string(), description.to_string()),
        ];
        Ok(self.post_form(url, form).await?.detail)
    }

    /// Kick off email ingestion on the backend
    pub async fn start_ingest(&self) -> Result<String> {
        let url = self.endpoint("ingest/emails")?;
        Ok(self.post_form(url, Vec::new()).await?.detail)
    }
}

#[async_trait]
impl StatusService for BackendClient {
    async fn query(&self, account: &AccountId) -> Result<AuthenticationRecord> {
        self.auth_status(account).await
    }

    async fn query_all(&self) -> Result<AuthenticationRecord> {
        self.system_status().await
    }
}

#[async_trait]
impl AccountSource for BackendClient {
    async fn list(&self) -> Result<Vec<AccountId>> {
        self.list_inboxes().await
    }
}

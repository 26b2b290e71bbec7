//! Per-account authentication registry
//!
//! Holds the set of known accounts in registration order together with the
//! last authoritative record for each, and derives the aggregate status.
//! Every mutation that changes the aggregate notifies subscribed observers.

use anyhow::Result as AnyResult;
use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{AuthError, Result};
use crate::models::{AccountId, AccountStatus, AuthSummary, AuthenticationRecord};
use crate::services::{AccountSource, AuthObserver, ObserverSet, StatusService};

/// Result of a full refresh
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    /// One row per account that was still registered when results arrived
    pub records: Vec<AccountStatus>,
    pub summary: AuthSummary,
}

#[derive(Default)]
struct RegistryState {
    order: Vec<AccountId>,
    records: HashMap<AccountId, Option<AuthenticationRecord>>,
}

impl RegistryState {
    fn summary(&self) -> AuthSummary {
        let authenticated = self
            .records
            .values()
            .filter(|r| r.as_ref().is_some_and(|r| r.authenticated))
            .count();
        AuthSummary::from_counts(authenticated, self.order.len())
    }

    fn upsert(&mut self, id: &AccountId) -> bool {
        if self.records.contains_key(id) {
            return false;
        }
        self.order.push(id.clone());
        self.records.insert(id.clone(), None);
        true
    }

    fn remove(&mut self, id: &AccountId) -> bool {
        if self.records.remove(id).is_none() {
            return false;
        }
        self.order.retain(|a| a != id);
        true
    }

    fn record(&mut self, id: &AccountId, record: AuthenticationRecord) -> Result<()> {
        match self.records.get_mut(id) {
            Some(slot) => {
                *slot = Some(record);
                Ok(())
            }
            None => Err(AuthError::UnknownAccount(id.clone())),
        }
    }

    fn row(&self, id: &AccountId) -> Option<AccountStatus> {
        self.records.get(id).map(|record| AccountStatus {
            account: id.clone(),
            record: record.clone(),
        })
    }
}

/// Registry of accounts and their authentication records
pub struct AccountAuthRegistry {
    status: Arc<dyn StatusService>,
    state: RwLock<RegistryState>,
    observers: ObserverSet,
}

impl AccountAuthRegistry {
    /// Create an empty registry backed by the given status service
    pub fn new(status: Arc<dyn StatusService>) -> Self {
        Self {
            status,
            state: RwLock::new(RegistryState::default()),
            observers: ObserverSet::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply a mutation and notify observers if the aggregate changed.
    ///
    /// The lock is released before observers run.
    fn mutate<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
        let (result, before, after) = {
            let mut state = self.write();
            let before = state.summary();
            let result = f(&mut state);
            (result, before, state.summary())
        };
        if before != after {
            self.observers.aggregate_changed(&after);
        }
        result
    }

    /// Register an observer for aggregate and flow notifications
    pub fn subscribe(&self, observer: Arc<dyn AuthObserver>) {
        self.observers.subscribe(observer);
    }

    pub(crate) fn observers(&self) -> &ObserverSet {
        &self.observers
    }

    /// Accounts in registration order
    pub fn list_accounts(&self) -> Vec<AccountId> {
        self.read().order.clone()
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.read().records.contains_key(id)
    }

    /// Latest record for an account (`None` if unknown or never reconciled)
    pub fn record(&self, id: &AccountId) -> Option<AuthenticationRecord> {
        self.read().records.get(id).cloned().flatten()
    }

    pub fn is_authenticated(&self, id: &AccountId) -> bool {
        self.record(id).is_some_and(|r| r.authenticated)
    }

    /// Every account with its record, in registration order
    pub fn snapshot(&self) -> Vec<AccountStatus> {
        let state = self.read();
        state.order.iter().filter_map(|id| state.row(id)).collect()
    }

    /// Add an account if absent. Existing records are left alone.
    pub fn upsert_account(&self, id: &AccountId) {
        if self.mutate(|s| s.upsert(id)) {
            debug!("Registered account {}", id);
        }
    }

    /// Remove an account and its record. No-op if absent.
    pub fn remove_account(&self, id: &AccountId) {
        if self.mutate(|s| s.remove(id)) {
            debug!("Removed account {}", id);
        }
    }

    /// Overwrite the record for a registered account
    pub fn record_status(
        &self,
        id: &AccountId,
        authenticated: bool,
        error: Option<String>,
    ) -> Result<()> {
        self.store_record(id, AuthenticationRecord::new(authenticated, error))
    }

    /// Store a record obtained from the status service
    pub fn store_record(&self, id: &AccountId, record: AuthenticationRecord) -> Result<()> {
        self.mutate(|s| s.record(id, record))
    }

    /// Aggregate status over the current snapshot
    pub fn aggregate(&self) -> AuthSummary {
        self.read().summary()
    }

    /// Ask the status service about one account without touching the registry
    pub async fn query_authoritative(&self, id: &AccountId) -> Result<AuthenticationRecord> {
        self.status
            .query(id)
            .await
            .map_err(|e| AuthError::QueryFailure {
                account: id.clone(),
                message: format!("{e:#}"),
            })
    }

    /// Backend-wide status, independent of any single account
    pub async fn query_system(&self) -> AnyResult<AuthenticationRecord> {
        self.status.query_all().await
    }

    /// Query every known account concurrently and record all results.
    ///
    /// A failed query is stored as unauthenticated with its error message;
    /// it never affects the other accounts.
    pub async fn refresh_all(&self) -> RefreshReport {
        let accounts = self.list_accounts();
        let queries = accounts.iter().map(|id| async move {
            let record = match self.query_authoritative(id).await {
                Ok(record) => record,
                Err(AuthError::QueryFailure { message, .. }) => {
                    warn!("Status query failed for {}: {}", id, message);
                    AuthenticationRecord::failed(message)
                }
                Err(e) => AuthenticationRecord::failed(e.to_string()),
            };
            (id.clone(), record)
        });
        let results = join_all(queries).await;

        let records = self.mutate(|state| {
            results
                .into_iter()
                .filter_map(|(id, record)| match state.record(&id, record) {
                    Ok(()) => state.row(&id),
                    Err(_) => {
                        debug!("Dropping refresh result for removed account {}", id);
                        None
                    }
                })
                .collect::<Vec<_>>()
        });

        let summary = self.aggregate();
        info!(
            "Refreshed {} accounts: {}/{} authenticated",
            records.len(),
            summary.authenticated_count,
            summary.total_count
        );
        RefreshReport { records, summary }
    }

    /// Seed the registry from an account list source.
    ///
    /// Listed accounts are upserted, unlisted ones removed; records of
    /// accounts that stay are kept.
    pub async fn reload_accounts(&self, source: &dyn AccountSource) -> AnyResult<Vec<AccountId>> {
        let listed = source.list().await?;
        let keep: HashSet<&AccountId> = listed.iter().collect();
        self.mutate(|state| {
            let stale: Vec<AccountId> = state
                .order
                .iter()
                .filter(|id| !keep.contains(id))
                .cloned()
                .collect();
            for id in &stale {
                state.remove(id);
            }
            for id in &listed {
                state.upsert(id);
            }
        });
        info!("Loaded {} accounts", listed.len());
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AggregateStatus;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Status service answering from a fixed table; unlisted accounts error
    struct TableStatus {
        answers: HashMap<String, bool>,
    }

    #[async_trait]
    impl StatusService for TableStatus {
        async fn query(&self, account: &AccountId) -> AnyResult<AuthenticationRecord> {
            match self.answers.get(account.as_str()) {
                Some(&ok) => Ok(AuthenticationRecord::new(ok, None)),
                None => Err(anyhow!("backend unreachable")),
            }
        }

        async fn query_all(&self) -> AnyResult<AuthenticationRecord> {
            Ok(AuthenticationRecord::new(self.answers.values().any(|v| *v), None))
        }
    }

    struct FixedSource(Vec<&'static str>);

    #[async_trait]
    impl AccountSource for FixedSource {
        async fn list(&self) -> AnyResult<Vec<AccountId>> {
            Ok(self.0.iter().map(|s| AccountId::from(*s)).collect())
        }
    }

    #[derive(Default)]
    struct SummaryLog(Mutex<Vec<AuthSummary>>);

    impl AuthObserver for SummaryLog {
        fn on_aggregate_changed(&self, summary: &AuthSummary) {
            self.0.lock().unwrap().push(*summary);
        }
    }

    fn registry(answers: &[(&str, bool)]) -> AccountAuthRegistry {
        let answers = answers.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        AccountAuthRegistry::new(Arc::new(TableStatus { answers }))
    }

    fn id(s: &str) -> AccountId {
        AccountId::from(s)
    }

    #[test]
    fn test_empty_registry_is_none() {
        let registry = registry(&[]);
        let summary = registry.aggregate();
        assert_eq!(summary.status, AggregateStatus::None);
        assert_eq!(summary.total_count, 0);
    }

    #[test]
    fn test_upsert_is_idempotent_and_ordered() {
        let registry = registry(&[]);
        registry.upsert_account(&id("b@x.com"));
        registry.upsert_account(&id("a@x.com"));
        registry.record_status(&id("b@x.com"), true, None).unwrap();
        registry.upsert_account(&id("b@x.com"));

        assert_eq!(registry.list_accounts(), vec![id("b@x.com"), id("a@x.com")]);
        assert!(registry.is_authenticated(&id("b@x.com")));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let registry = registry(&[]);
        registry.upsert_account(&id("a@x.com"));
        registry.remove_account(&id("missing@x.com"));
        registry.remove_account(&id("a@x.com"));
        assert!(registry.list_accounts().is_empty());
        assert!(registry.record(&id("a@x.com")).is_none());
    }

    #[test]
    fn test_record_status_unknown_account() {
        let registry = registry(&[]);
        let err = registry.record_status(&id("ghost@x.com"), true, None).unwrap_err();
        assert!(matches!(err, AuthError::UnknownAccount(a) if a.as_str() == "ghost@x.com"));
        assert!(!registry.contains(&id("ghost@x.com")));
    }

    #[test]
    fn test_aggregate_tracks_records() {
        let registry = registry(&[]);
        registry.upsert_account(&id("a@x.com"));
        registry.upsert_account(&id("b@x.com"));
        assert_eq!(registry.aggregate().status, AggregateStatus::None);

        registry.record_status(&id("a@x.com"), true, None).unwrap();
        assert_eq!(registry.aggregate().status, AggregateStatus::Partial);

        registry.record_status(&id("b@x.com"), true, None).unwrap();
        assert_eq!(registry.aggregate().status, AggregateStatus::Complete);

        registry.remove_account(&id("b@x.com"));
        assert_eq!(registry.aggregate().status, AggregateStatus::Complete);
        assert_eq!(registry.aggregate().total_count, 1);
    }

    #[test]
    fn test_observers_only_see_changes() {
        let registry = registry(&[]);
        let log = Arc::new(SummaryLog::default());
        registry.subscribe(log.clone());

        registry.upsert_account(&id("a@x.com"));
        registry.record_status(&id("a@x.com"), false, None).unwrap();
        registry.record_status(&id("a@x.com"), true, None).unwrap();
        registry.record_status(&id("a@x.com"), true, None).unwrap();

        let seen = log.0.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], AuthSummary::from_counts(0, 1));
        assert_eq!(seen[1], AuthSummary::from_counts(1, 1));
    }

    #[tokio::test]
    async fn test_query_authoritative_does_not_mutate() {
        let registry = registry(&[("a@x.com", true)]);
        registry.upsert_account(&id("a@x.com"));

        let record = registry.query_authoritative(&id("a@x.com")).await.unwrap();
        assert!(record.authenticated);
        assert!(registry.record(&id("a@x.com")).is_none());
    }

    #[tokio::test]
    async fn test_refresh_all_isolates_failures() {
        let registry = registry(&[("a@x.com", true), ("c@x.com", false)]);
        for account in ["a@x.com", "b@x.com", "c@x.com"] {
            registry.upsert_account(&id(account));
        }

        let report = registry.refresh_all().await;

        assert_eq!(report.records.len(), 3);
        assert_eq!(report.summary, AuthSummary::from_counts(1, 3));
        assert!(registry.is_authenticated(&id("a@x.com")));

        let b = registry.record(&id("b@x.com")).unwrap();
        assert!(!b.authenticated);
        assert!(b.last_error.unwrap().contains("backend unreachable"));

        let c = registry.record(&id("c@x.com")).unwrap();
        assert!(!c.authenticated);
        assert!(c.last_error.is_none());
    }

    #[tokio::test]
    async fn test_reload_accounts_replaces_list() {
        let registry = registry(&[]);
        registry.upsert_account(&id("old@x.com"));
        registry.upsert_account(&id("kept@x.com"));
        registry.record_status(&id("kept@x.com"), true, None).unwrap();

        let source = FixedSource(vec!["kept@x.com", "new@x.com"]);
        registry.reload_accounts(&source).await.unwrap();

        assert_eq!(registry.list_accounts(), vec![id("kept@x.com"), id("new@x.com")]);
        assert!(registry.is_authenticated(&id("kept@x.com")));
        assert!(registry.record(&id("new@x.com")).is_none());
    }
}

//! Outward notifications

use log::debug;
use std::sync::{Arc, RwLock};

use crate::models::{AccountId, AuthSummary, FlowOutcome};

/// Receives aggregate changes and per-account flow outcomes
///
/// Notifications are fire-and-forget; implementations should not block.
pub trait AuthObserver: Send + Sync {
    fn on_aggregate_changed(&self, _summary: &AuthSummary) {}

    fn on_flow_finished(&self, _account: &AccountId, _outcome: &FlowOutcome) {}
}

/// Fan-out over every subscribed observer
#[derive(Default)]
pub struct ObserverSet {
    observers: RwLock<Vec<Arc<dyn AuthObserver>>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn AuthObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Observers are cloned out so callbacks run without the lock held.
    fn current(&self) -> Vec<Arc<dyn AuthObserver>> {
        self.observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn aggregate_changed(&self, summary: &AuthSummary) {
        debug!(
            "Aggregate status now {} ({}/{})",
            summary.status.as_str(),
            summary.authenticated_count,
            summary.total_count
        );
        for observer in self.current() {
            observer.on_aggregate_changed(summary);
        }
    }

    pub fn flow_finished(&self, account: &AccountId, outcome: &FlowOutcome) {
        for observer in self.current() {
            observer.on_flow_finished(account, outcome);
        }
    }
}

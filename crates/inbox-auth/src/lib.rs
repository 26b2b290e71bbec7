//! Inbox authentication core
//!
//! This crate tracks which mailboxes hold valid credentials and drives the
//! interactive, browser-window authorization flow for the ones that don't:
//! - Domain models (AccountId, AuthenticationRecord, AuthSummary, FlowOutcome)
//! - Account registry with aggregate status and concurrent refresh
//! - Flow controller: presence polling, settle delay, timeout, cancellation
//! - Sequential driver for authenticating every pending account
//! - Collaborator traits plus HTTP backend and browser-process implementations
//!
//! The registry and controller only talk to the outside world through the
//! traits in [`services`], so both can be exercised with in-memory fakes.

pub mod backend;
pub mod error;
pub mod flow;
pub mod models;
pub mod registry;
pub mod services;
pub mod settings;
pub mod surface;

pub use backend::BackendClient;
pub use error::AuthError;
pub use flow::{AuthFlowController, DriverReport, FlowTask, FlowTiming, MAX_INTERVAL};
pub use models::{
    AccountId, AccountStatus, AggregateStatus, AuthSummary, AuthenticationRecord, FailureReason,
    FlowOutcome, FlowState,
};
pub use registry::{AccountAuthRegistry, RefreshReport};
pub use services::{
    AccountSource, AuthObserver, AuthSurface, DisplayHint, ObserverSet, StatusService,
    SurfaceOpener, SurfaceRequest,
};
pub use settings::Settings;
pub use surface::{BrowserWindow, BrowserWindowOpener};

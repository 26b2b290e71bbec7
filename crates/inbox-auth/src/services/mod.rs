//! Collaborator contracts consumed by the registry and flow controller
//!
//! The core never talks to a backend or a browser directly; it goes
//! through these traits so tests can substitute in-memory fakes.

mod observer;

pub use observer::{AuthObserver, ObserverSet};

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::models::{AccountId, AuthenticationRecord};

/// Authoritative authentication status, owned by the backend
///
/// Implementations must be safe to call repeatedly.
#[async_trait]
pub trait StatusService: Send + Sync {
    /// Status for a single account
    async fn query(&self, account: &AccountId) -> Result<AuthenticationRecord>;

    /// Unparameterized, backend-wide status
    async fn query_all(&self) -> Result<AuthenticationRecord>;
}

/// Source of the configured account list
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn list(&self) -> Result<Vec<AccountId>>;
}

/// Window geometry requested for the authorization surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayHint {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayHint {
    fn default() -> Self {
        Self {
            width: 600,
            height: 700,
        }
    }
}

/// What to open and how to present it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceRequest {
    pub uri: Url,
    pub hint: DisplayHint,
}

/// Opens external authorization surfaces (browser windows)
#[async_trait]
pub trait SurfaceOpener: Send + Sync {
    /// Open the surface. An error means the environment refused to open it.
    async fn open(&self, request: SurfaceRequest) -> Result<Box<dyn AuthSurface>>;
}

/// Handle to an opened authorization surface
///
/// The surface's contents are opaque; only its presence can be observed.
pub trait AuthSurface: Send {
    /// Best-effort closure check. An error means "not yet determined".
    fn is_closed(&mut self) -> Result<bool>;

    /// Close the surface if it is still open
    fn force_close(&mut self) -> Result<()>;
}

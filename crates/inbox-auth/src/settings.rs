//! Settings for the authentication tools
//!
//! Loaded in order of priority:
//! 1. Environment overrides (`INBOX_AUTH_BACKEND_URL`, `INBOX_AUTH_BROWSER`)
//! 2. JSON file (~/.config/inbox-auth/settings.json)
//! 3. Built-in defaults

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::flow::FlowTiming;
use crate::services::DisplayHint;

/// Settings filename in the config directory
pub const SETTINGS_FILE: &str = "settings.json";

const BACKEND_URL_ENV: &str = "INBOX_AUTH_BACKEND_URL";
const BROWSER_ENV: &str = "INBOX_AUTH_BROWSER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the inbox backend
    pub backend_url: String,
    /// Browser command used for the authorization window; see
    /// [`BrowserWindowOpener`](crate::surface::BrowserWindowOpener) for placeholders
    pub browser_command: Vec<String>,
    pub window_width: u32,
    pub window_height: u32,
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub timeout_secs: u64,
    pub inter_attempt_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let hint = DisplayHint::default();
        let timing = FlowTiming::default();
        Self {
            backend_url: "http://localhost:8000".to_string(),
            browser_command: vec![
                "chromium".to_string(),
                "--app={url}".to_string(),
                "--window-size={width},{height}".to_string(),
                "--user-data-dir={profile}".to_string(),
                "--no-first-run".to_string(),
            ],
            window_width: hint.width,
            window_height: hint.height,
            poll_interval_ms: timing.poll_interval.as_millis() as u64,
            settle_delay_ms: timing.settle_delay.as_millis() as u64,
            timeout_secs: timing.timeout.as_secs(),
            inter_attempt_delay_ms: timing.inter_attempt_delay.as_millis() as u64,
        }
    }
}

impl Settings {
    /// Load settings from the config directory, then apply environment overrides
    pub fn load() -> Result<Self> {
        let settings = match Self::default_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        Ok(settings.with_env_overrides())
    }

    /// Load settings from a specific file; a missing file yields defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_or_default(path)
    }

    /// Path of the settings file (~/.config/inbox-auth/settings.json)
    pub fn default_path() -> Option<PathBuf> {
        config::config_path(SETTINGS_FILE)
    }

    /// Write these settings to the config directory
    pub fn save(&self) -> Result<PathBuf> {
        config::save_json(SETTINGS_FILE, self)
    }

    fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(BACKEND_URL_ENV).ok(),
            std::env::var(BROWSER_ENV).ok(),
        )
    }

    /// Apply override values; empty strings are ignored
    pub fn with_overrides(mut self, backend_url: Option<String>, browser: Option<String>) -> Self {
        if let Some(url) = backend_url.filter(|u| !u.trim().is_empty()) {
            self.backend_url = url.trim().to_string();
        }
        if let Some(browser) = browser.filter(|b| !b.trim().is_empty()) {
            self.browser_command = browser.split_whitespace().map(str::to_string).collect();
        }
        self
    }

    pub fn timing(&self) -> FlowTiming {
        FlowTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            inter_attempt_delay: Duration::from_millis(self.inter_attempt_delay_ms),
        }
        .normalized()
    }

    pub fn display_hint(&self) -> DisplayHint {
        DisplayHint {
            width: self.window_width,
            height: self.window_height,
        }
    }
}

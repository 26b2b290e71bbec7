//! Browser-process authorization window
//!
//! The window is a child process (typically a browser in app mode). Its
//! presence is the only thing observed: the window counts as closed once
//! the process has exited.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, info};
use std::path::Path;
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::{Child, Command};

use crate::services::{AuthSurface, SurfaceOpener, SurfaceRequest};

/// Opens authorization windows by launching a browser command
///
/// Arguments may contain `{url}`, `{width}`, `{height}` and `{profile}`
/// placeholders. `{profile}` becomes a fresh temporary directory for each
/// window, removed when the window is dropped.
///
/// The launched process must live exactly as long as the window. Most
/// browsers hand a URL to an already running instance and exit at once,
/// which would read as "closed" on the first poll. Give the browser its
/// own instance: Chromium with `--user-data-dir={profile}`, Firefox with
/// `--new-instance --profile {profile}`.
#[derive(Debug, Clone)]
pub struct BrowserWindowOpener {
    command: Vec<String>,
}

impl BrowserWindowOpener {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Whether windows need a private profile directory
    pub fn uses_profile(&self) -> bool {
        self.command.iter().any(|a| a.contains("{profile}"))
    }

    /// Expand placeholders into the final program and argument list
    pub fn render(
        &self,
        request: &SurfaceRequest,
        profile: Option<&Path>,
    ) -> Result<(String, Vec<String>)> {
        let Some((program, args)) = self.command.split_first() else {
            bail!("No browser command configured");
        };
        let profile = match profile {
            Some(dir) => dir.display().to_string(),
            None if self.uses_profile() => bail!("Browser command needs a profile directory"),
            None => String::new(),
        };
        let width = request.hint.width.to_string();
        let height = request.hint.height.to_string();
        let expand = |arg: &String| {
            arg.replace("{url}", request.uri.as_str())
                .replace("{width}", &width)
                .replace("{height}", &height)
                .replace("{profile}", &profile)
        };

        let mut args: Vec<String> = args.iter().map(expand).collect();
        if !self.command.iter().any(|a| a.contains("{url}")) {
            args.push(request.uri.to_string());
        }
        Ok((expand(program), args))
    }

    /// Launch a browser window for the request
    pub fn launch(&self, request: &SurfaceRequest) -> Result<BrowserWindow> {
        let profile = if self.uses_profile() {
            let dir = tempfile::Builder::new()
                .prefix("inbox-auth-")
                .tempdir()
                .context("Failed to create browser profile directory")?;
            Some(dir)
        } else {
            None
        };
        let (program, args) = self.render(request, profile.as_ref().map(TempDir::path))?;
        debug!("Launching {} {:?}", program, args);

        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to launch browser `{}`", program))?;

        info!("Opened authorization window for {}", request.uri);
        Ok(BrowserWindow { child, profile })
    }
}

#[async_trait]
impl SurfaceOpener for BrowserWindowOpener {
    async fn open(&self, request: SurfaceRequest) -> Result<Box<dyn AuthSurface>> {
        Ok(Box::new(self.launch(&request)?))
    }
}

/// A running browser process hosting the provider's consent page
pub struct BrowserWindow {
    child: Child,
    // Declared after `child`: removed once the process handle is gone
    profile: Option<TempDir>,
}

impl BrowserWindow {
    /// Private profile directory of this window, if the command asked for one
    pub fn profile_dir(&self) -> Option<&Path> {
        self.profile.as_ref().map(TempDir::path)
    }
}

impl AuthSurface for BrowserWindow {
    fn is_closed(&mut self) -> Result<bool> {
        let status = self
            .child
            .try_wait()
            .context("Failed to query browser process")?;
        Ok(status.is_some())
    }

    fn force_close(&mut self) -> Result<()> {
        if self.is_closed()? {
            return Ok(());
        }
        self.child
            .start_kill()
            .context("Failed to terminate browser process")
    }
}

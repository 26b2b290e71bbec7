//! CLI definition and dispatch

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inbox_auth::{
    AccountAuthRegistry, AccountId, AccountStatus, AuthFlowController, AuthSummary,
    BackendClient, BrowserWindowOpener, FlowOutcome, Settings,
};
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

use crate::observer::ConsoleObserver;

#[derive(Parser)]
#[command(name = "inboxctl")]
#[command(version)]
#[command(about = "Check and complete Gmail inbox authentication")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (overrides settings.json and INBOX_AUTH_BACKEND_URL)
    #[arg(long, global = true, value_name = "URL")]
    backend: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured inboxes
    List,
    /// Refresh and show authentication status for every inbox
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Authenticate one inbox in a browser window
    Login {
        /// Inbox email address
        email: String,
    },
    /// Authenticate every inbox that is not authenticated yet, one at a time
    LoginAll,
    /// Register a new inbox with the backend
    Add {
        /// Inbox email address
        email: String,
        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Start email processing (needs at least one authenticated inbox)
    Ingest,
    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write default settings to the config directory
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
    /// Print the settings file location
    Path,
}

/// Everything a command needs to talk to the backend
struct Session {
    backend: Arc<BackendClient>,
    registry: Arc<AccountAuthRegistry>,
    controller: Arc<AuthFlowController>,
}

impl Session {
    async fn connect(settings: &Settings) -> Result<Self> {
        let backend = Arc::new(BackendClient::new(&settings.backend_url)?);
        let registry = Arc::new(AccountAuthRegistry::new(backend.clone()));
        registry
            .reload_accounts(backend.as_ref())
            .await
            .context("Failed to load inbox configuration")?;

        let opener = Arc::new(BrowserWindowOpener::new(settings.browser_command.clone()));
        let controller = AuthFlowController::new(registry.clone(), opener, backend.authorize_url()?)
            .with_timing(settings.timing())
            .with_display_hint(settings.display_hint())
            .with_refresh_after_flow(true);

        Ok(Self {
            backend,
            registry,
            controller: Arc::new(controller),
        })
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load()?.with_overrides(cli.backend.clone(), None);

    if let Commands::Config { command } = &cli.command {
        return config_command(command, &settings);
    }

    let session = Session::connect(&settings).await?;
    match cli.command {
        Commands::List => list(&session),
        Commands::Status { json } => status(&session, json).await,
        Commands::Login { email } => login(&session, AccountId::new(email)).await,
        Commands::LoginAll => login_all(&session).await,
        Commands::Add { email, description } => {
            let detail = session.backend.add_inbox(&email, &description).await?;
            println!("{}", detail);
            Ok(())
        }
        Commands::Ingest => ingest(&session).await,
        Commands::Config { .. } => Ok(()),
    }
}

fn config_command(command: &ConfigCommands, settings: &Settings) -> Result<()> {
    let path = Settings::default_path().context("Could not determine config directory")?;
    match command {
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            let written = settings.save()?;
            println!("Wrote {}", written.display());
        }
    }
    Ok(())
}

fn list(session: &Session) -> Result<()> {
    let accounts = session.registry.list_accounts();
    if accounts.is_empty() {
        println!("No inboxes configured.");
    }
    for account in accounts {
        println!("{}", account);
    }
    Ok(())
}

fn print_rows(rows: &[AccountStatus], summary: &AuthSummary) {
    for row in rows {
        match row.record.as_ref().and_then(|r| r.last_error.as_deref()) {
            Some(error) => println!("{:<40} {:<14} {}", row.account, row.label(), error),
            None => println!("{:<40} {}", row.account, row.label()),
        }
    }
    println!();
    println!("{}", summary.status_message());
}

async fn status(session: &Session, as_json: bool) -> Result<()> {
    let report = session.registry.refresh_all().await;
    let system = session.registry.query_system().await;

    if as_json {
        let system = match &system {
            Ok(record) => json!(record),
            Err(e) => json!({ "error": format!("{e:#}") }),
        };
        let body = json!({
            "summary": report.summary,
            "accounts": report.records,
            "backend": system,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    print_rows(&report.records, &report.summary);
    match system {
        Ok(record) if record.authenticated => println!("Backend credentials: active"),
        Ok(_) => println!("Backend credentials: issues detected"),
        Err(e) => warn!("Backend status unavailable: {:#}", e),
    }
    Ok(())
}

async fn login(session: &Session, account: AccountId) -> Result<()> {
    session.registry.subscribe(Arc::new(ConsoleObserver));
    println!(
        "Opening authorization window for {} (Ctrl-C to cancel)...",
        account
    );

    let task = session.controller.start(&account)?;
    let controller = session.controller.clone();
    let interrupt = async move {
        if signal::ctrl_c().await.is_ok() {
            controller.cancel(&account);
        }
    };
    tokio::pin!(interrupt);

    let wait = task.wait();
    tokio::pin!(wait);
    let outcome = tokio::select! {
        outcome = &mut wait => outcome?,
        _ = &mut interrupt => wait.await?,
    };

    match outcome {
        FlowOutcome::Succeeded => Ok(()),
        FlowOutcome::Failed(reason) => bail!("Authentication did not complete: {}", reason),
    }
}

async fn login_all(session: &Session) -> Result<()> {
    let report = session.registry.refresh_all().await;
    if report.summary.total_count == 0 {
        println!("No inboxes configured.");
        return Ok(());
    }
    session.registry.subscribe(Arc::new(ConsoleObserver));
    println!("Starting auto-authentication for all inboxes...");

    let driver = session.controller.authenticate_all_pending();
    let report = tokio::select! {
        report = driver => report,
        _ = signal::ctrl_c() => {
            // Dropping the driver closes any open window and frees its account slot
            warn!("Interrupted; stopping auto-authentication");
            return Ok(());
        }
    };

    info!(
        "Auto-authentication finished: {} succeeded, {} failed, {} already authenticated",
        report.succeeded.len(),
        report.failed.len(),
        report.skipped.len()
    );
    println!("{}", session.registry.aggregate().status_message());
    Ok(())
}

async fn ingest(session: &Session) -> Result<()> {
    let report = session.registry.refresh_all().await;
    if !report.summary.can_start_processing() {
        bail!("{}", report.summary.status_message());
    }
    let detail = session.backend.start_ingest().await?;
    println!("Email processing started: {}", detail);
    Ok(())
}

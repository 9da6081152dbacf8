//! chansync - pushes station-metadata matches into media-management servers.

/// Batch applier over the request executor.
mod applier;
/// Application configuration (TOML).
mod config;
/// Console sink and confirmer.
mod sink;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;

use crate::applier::StationUpdateApplier;
use crate::config::{AppConfig, resolve_config_path, resolve_data_dir};
use crate::sink::{ConsoleConfirmer, ConsoleSink};
use chansync_api::credentials::CredentialStore;
use chansync_api::descriptor::AuthKind;
use chansync_api::executor::RequestExecutor;
use chansync_api::session::SessionManager;
use chansync_api::strategy::{LocalAuthStrategy, NoAuth, PasswordAuth, RefreshAuth};
use chansync_queue::{BatchOutcome, BatchUpdateExecutor, PendingUpdate, QueueFile};

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config/data directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check session state for every configured service.
    Status,
    /// Apply queued station updates to the channel manager.
    Push(PushArgs),
    /// Inspect or extend the pending update queue.
    Queue(QueueCommand),
    /// Force a full re-authentication for one service.
    Login(LoginArgs),
}

/// Arguments for the `push` subcommand.
#[derive(clap::Args)]
struct PushArgs {
    /// Skip the confirmation prompt.
    #[arg(long)]
    yes: bool,

    /// Override the queue file path (default: `{data dir}/pending_updates.csv`).
    #[arg(long)]
    queue: Option<PathBuf>,
}

/// Arguments for the `queue` subcommand.
#[derive(clap::Args)]
struct QueueCommand {
    /// Queue subcommand to run.
    #[command(subcommand)]
    command: QueueSubcommands,
}

/// Available queue subcommands.
#[derive(Subcommand)]
enum QueueSubcommands {
    /// List pending updates without applying them.
    List(QueueListArgs),
    /// Append one pending update record.
    Add(QueueAddArgs),
}

/// Arguments for the `queue list` subcommand.
#[derive(clap::Args)]
struct QueueListArgs {
    /// Override the queue file path.
    #[arg(long)]
    queue: Option<PathBuf>,
}

/// Arguments for the `queue add` subcommand.
#[derive(clap::Args)]
struct QueueAddArgs {
    /// Target station id on the remote service.
    #[arg(long)]
    station_id: String,

    /// Field to change.
    #[arg(long)]
    field: String,

    /// New value for the field.
    #[arg(long)]
    value: String,

    /// Human-readable label for preview display.
    #[arg(long)]
    label: String,

    /// Match confidence (0.0 - 1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Override the queue file path.
    #[arg(long)]
    queue: Option<PathBuf>,
}

/// Arguments for the `login` subcommand.
#[derive(clap::Args)]
struct LoginArgs {
    /// Service to re-authenticate: "epg", "media", or "lookup".
    service: String,
}

/// Loads the app config for the given directory override.
fn load_config(dir: Option<&PathBuf>) -> Result<AppConfig> {
    let config_path = resolve_config_path(dir).context("failed to resolve config path")?;
    AppConfig::load(&config_path).context("failed to load config")
}

/// Opens the credential store under the data directory.
fn open_store(dir: Option<&PathBuf>) -> Result<CredentialStore> {
    let data_dir = resolve_data_dir(dir).context("failed to resolve data directory")?;
    Ok(CredentialStore::new(data_dir.join("credentials")))
}

/// Resolves the queue file path from an override or the data directory.
fn resolve_queue(queue: Option<PathBuf>, dir: Option<&PathBuf>) -> Result<QueueFile> {
    if let Some(path) = queue {
        return Ok(QueueFile::new(path));
    }
    let data_dir = resolve_data_dir(dir).context("failed to resolve data directory")?;
    Ok(QueueFile::new(data_dir.join("pending_updates.csv")))
}

/// Builds the channel/EPG manager session, if configured.
fn epg_session(
    config: &AppConfig,
    store: &CredentialStore,
) -> Result<Option<SessionManager<PasswordAuth>>> {
    let Some(descriptor) = config.services.epg.descriptor("epg", AuthKind::Password)? else {
        return Ok(None);
    };
    let strategy = PasswordAuth::new(descriptor.clone())?;
    Ok(Some(SessionManager::new(descriptor, strategy, store.clone())?))
}

/// Builds the media server session, if configured.
fn media_session(
    config: &AppConfig,
    store: &CredentialStore,
) -> Result<Option<SessionManager<RefreshAuth>>> {
    let Some(descriptor) = config.services.media.descriptor("media", AuthKind::Refresh)? else {
        return Ok(None);
    };
    let strategy = RefreshAuth::new(descriptor.clone())?;
    Ok(Some(SessionManager::new(descriptor, strategy, store.clone())?))
}

/// Builds the direct-search API session, if configured.
fn lookup_session(
    config: &AppConfig,
    store: &CredentialStore,
) -> Result<Option<SessionManager<NoAuth>>> {
    let Some(descriptor) = config.services.lookup.descriptor("lookup", AuthKind::Anonymous)?
    else {
        return Ok(None);
    };
    Ok(Some(SessionManager::new(descriptor, NoAuth, store.clone())?))
}

/// Reports one service's session state.
async fn report_session<S: LocalAuthStrategy>(session: Option<SessionManager<S>>, name: &str) {
    let Some(mut session) = session else {
        tracing::info!("{name}: not configured");
        return;
    };
    match session.ensure_valid_session().await {
        Ok(()) => tracing::info!("{name}: session OK"),
        Err(err) => tracing::warn!("{name}: {err}"),
    }
}

/// Runs the `status` subcommand.
///
/// # Errors
///
/// Returns an error if the config or a stored credential cannot be read.
#[instrument(skip_all)]
async fn run_status(dir: Option<&PathBuf>) -> Result<()> {
    let config = load_config(dir)?;
    let store = open_store(dir)?;

    report_session(epg_session(&config, &store)?, "epg").await;
    report_session(media_session(&config, &store)?, "media").await;
    report_session(lookup_session(&config, &store)?, "lookup").await;

    Ok(())
}

/// Runs the `push` subcommand: drains the queue into the channel manager.
///
/// # Errors
///
/// Returns an error if the channel manager is unconfigured or the queue
/// cannot be read, confirmed, or cleared. Per-record failures are counted in
/// the summary, not raised.
#[instrument(skip_all)]
async fn run_push(args: &PushArgs, dir: Option<&PathBuf>) -> Result<()> {
    let config = load_config(dir)?;
    let store = open_store(dir)?;

    let Some(descriptor) = config.services.epg.descriptor("epg", AuthKind::Password)? else {
        bail!("channel manager is not configured; set [services.epg] base_url in config.toml");
    };
    let strategy = PasswordAuth::new(descriptor.clone())?;
    let session = SessionManager::new(descriptor.clone(), strategy, store)?;
    let executor = RequestExecutor::new(&descriptor, Arc::new(Mutex::new(session)))?;
    let station_applier = StationUpdateApplier::new(executor);

    let queue = resolve_queue(args.queue.clone(), dir)?;
    let batch = BatchUpdateExecutor::new(queue);
    let mut sink = ConsoleSink;
    let mut confirmer = ConsoleConfirmer::new(args.yes);

    match batch.run(&station_applier, &mut sink, &mut confirmer).await? {
        BatchOutcome::Completed(summary) if summary.failed > 0 => {
            tracing::warn!(
                "{} update(s) failed and were dropped from the queue; re-run the matcher for them",
                summary.failed
            );
        }
        BatchOutcome::Completed(_) | BatchOutcome::Empty | BatchOutcome::Declined => {}
    }
    Ok(())
}

/// Runs the `queue list` subcommand.
///
/// # Errors
///
/// Returns an error if the queue file cannot be read.
#[instrument(skip_all)]
fn run_queue_list(args: &QueueListArgs, dir: Option<&PathBuf>) -> Result<()> {
    let queue = resolve_queue(args.queue.clone(), dir)?;
    let records = queue.load()?;
    if records.is_empty() {
        tracing::info!("no pending updates queued");
        return Ok(());
    }
    tracing::info!("{} pending update(s):", records.len());
    for record in &records {
        tracing::info!(
            "{}: {} → {} (station {})",
            record.label,
            record.field,
            record.new_value,
            record.station_id,
        );
    }
    Ok(())
}

/// Runs the `queue add` subcommand.
///
/// # Errors
///
/// Returns an error if the record cannot be appended.
#[instrument(skip_all)]
fn run_queue_add(args: &QueueAddArgs, dir: Option<&PathBuf>) -> Result<()> {
    let queue = resolve_queue(args.queue.clone(), dir)?;
    let record = PendingUpdate {
        station_id: args.station_id.clone(),
        field: args.field.clone(),
        new_value: args.value.clone(),
        label: args.label.clone(),
        confidence: args.confidence,
    };
    queue.append(&record)?;
    tracing::info!("queued: {} → {}", record.label, record.new_value);
    Ok(())
}

/// Forces a full re-authentication for one session.
async fn login_session<S: LocalAuthStrategy>(
    session: Option<SessionManager<S>>,
    name: &str,
) -> Result<()> {
    let Some(mut session) = session else {
        bail!("{name} is not configured");
    };
    session.invalidate("login requested");
    session
        .ensure_valid_session()
        .await
        .with_context(|| format!("login failed for {name}"))?;
    tracing::info!("{name}: authenticated");
    Ok(())
}

/// Runs the `login` subcommand.
///
/// # Errors
///
/// Returns an error for an unknown service name or a failed login.
#[instrument(skip_all)]
async fn run_login(args: &LoginArgs, dir: Option<&PathBuf>) -> Result<()> {
    let config = load_config(dir)?;
    let store = open_store(dir)?;

    match args.service.as_str() {
        "epg" => login_session(epg_session(&config, &store)?, "epg").await,
        "media" => login_session(media_session(&config, &store)?, "media").await,
        "lookup" => login_session(lookup_session(&config, &store)?, "lookup").await,
        other => bail!("unknown service: {other} (expected epg, media, or lookup)"),
    }
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Status => run_status(cli.dir.as_ref()).await,
        Commands::Push(args) => run_push(&args, cli.dir.as_ref()).await,
        Commands::Queue(queue) => match queue.command {
            QueueSubcommands::List(args) => run_queue_list(&args, cli.dir.as_ref()),
            QueueSubcommands::Add(args) => run_queue_add(&args, cli.dir.as_ref()),
        },
        Commands::Login(args) => run_login(&args, cli.dir.as_ref()).await,
    }
}

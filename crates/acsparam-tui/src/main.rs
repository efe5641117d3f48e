//! `acsparam-tui`: terminal console for one device's TR-069 parameters.
//!
//! Loads a device parameter document, shows every parameter in a
//! searchable table, and turns row actions into ACS tasks. Tasks go to the
//! northbound interface when an NBI URL is configured and are otherwise
//! staged locally and printed as JSON on exit.
//!
//! `--store-password` prompts for the NBI password and saves it in the
//! system keyring instead of starting the console.
//!
//! Logs are written to a file (default `/tmp/acsparam-tui.log`) so they
//! never corrupt the terminal.

mod action;
mod app;
mod bridge;
mod component;
mod event;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;
use std::sync::Arc;

use acsparam_api::NbiClient;
use acsparam_config::{
    Config, load_config, load_config_from, resolve_nbi_credentials, store_nbi_password,
};
use acsparam_core::{Device, ExpressionCache, NbiSink, StagedSink, TaskDispatcher};
use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{App, SinkLabel};
use crate::screens::parameters::ParametersScreen;

/// Browse and edit the parameters of a TR-069 device.
#[derive(Parser, Debug)]
#[command(name = "acsparam-tui", version, about)]
struct Cli {
    /// Device parameter document (JSON map of parameter path to parameter)
    #[arg(
        short = 'd',
        long,
        env = "ACSPARAM_DEVICE",
        required_unless_present = "store_password"
    )]
    device: Option<PathBuf>,

    /// NBI base URL (e.g., http://acs.local:7557)
    #[arg(short = 'n', long)]
    nbi_url: Option<String>,

    /// NBI basic-auth username
    #[arg(short = 'U', long)]
    nbi_username: Option<String>,

    /// Prompt for the NBI password, store it in the system keyring, and exit
    #[arg(long)]
    store_password: bool,

    /// Web UI base URL used for the CSV export link
    #[arg(short = 'u', long)]
    ui_url: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Stage tasks locally even if an NBI URL is configured
    #[arg(long)]
    stage: bool,

    /// Log file path
    #[arg(long, default_value = "/tmp/acsparam-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing. Hold the returned guard until exit so buffered
/// lines are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "acsparam_tui={level},acsparam_core={level},acsparam_api={level}"
        ))
    });

    let log_dir = cli
        .log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(std::path::Path::new("."));
    let log_name = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("acsparam-tui.log"));

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, log_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

/// Config file and environment, then CLI flags on top.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(ref url) = cli.nbi_url {
        config.nbi_url = Some(url.clone());
    }
    if let Some(ref user) = cli.nbi_username {
        config.nbi_username = Some(user.clone());
    }
    if let Some(ref url) = cli.ui_url {
        config.ui_url.clone_from(url);
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    let config = resolve_config(&cli)?;

    if cli.store_password {
        let password = rpassword::prompt_password("NBI password: ")?;
        store_nbi_password(&config, &password)?;
        info!(username = config.nbi_username.as_deref(), "stored NBI password in keyring");
        eprintln!("NBI password stored in system keyring");
        return Ok(());
    }

    let device_path = cli
        .device
        .as_deref()
        .ok_or_else(|| eyre!("--device is required"))?;
    let device = Device::load(device_path)?;

    let cache = Arc::new(ExpressionCache::new(config.expression_cache_capacity));
    let screen = ParametersScreen::new(
        device,
        &config.ui_base_url()?,
        cache,
        config.search_debounce(),
    )?;
    info!(
        device = screen.device_id(),
        csv = %screen.csv_link(),
        parameters = screen.view().rows().len(),
        "starting acsparam-tui"
    );

    let cancel = CancellationToken::new();
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let nbi_url = if cli.stage {
        None
    } else {
        config.nbi_base_url()?
    };

    let mut staged = None;
    let (queue, dispatcher, sink) = if let Some(url) = nbi_url {
        let credentials = resolve_nbi_credentials(&config)?;
        let client = NbiClient::new(url.as_str(), &config.transport(), credentials)?;
        let nbi = NbiSink::new(client, config.task_options());
        let (queue, handle) = TaskDispatcher::spawn(nbi, Some(outcome_tx), cancel.clone());
        (queue, handle, SinkLabel::Nbi(url.to_string()))
    } else {
        let sink = StagedSink::new();
        staged = Some(sink.clone());
        let (queue, handle) = TaskDispatcher::spawn(sink, Some(outcome_tx), cancel.clone());
        (queue, handle, SinkLabel::Staged)
    };

    let mut app = App::new(Box::new(screen), queue, sink);
    tokio::spawn(bridge::forward_outcomes(
        outcome_rx,
        app.action_sender(),
        cancel.clone(),
    ));

    let result = app.run().await;

    // Dropping the app closes the queue; staged delivery drains what is
    // left, NBI delivery stops after the task in flight.
    drop(app);
    if staged.is_none() {
        cancel.cancel();
    }
    if let Err(e) = dispatcher.await {
        warn!(error = %e, "dispatcher task ended abnormally");
    }
    cancel.cancel();

    if let Some(sink) = staged {
        for staged_task in sink.drain() {
            println!("{}", serde_json::to_string(&staged_task.task)?);
        }
    }

    result
}

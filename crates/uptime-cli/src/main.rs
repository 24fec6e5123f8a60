mod config;
mod render;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, EnvFilter};

use uptime_core::{
    transition_channel, HttpProber, JsonFileStore, LogFeedback, LogSink, Monitor, MonitorOptions,
    NotificationDispatcher, Notifier, SettingsUpdate, SharedConfig, StatusSummary, SweepReport,
    TargetView, WebhookSink,
};

use crate::config::{AppConfig, DEFAULT_STORE_PATH};

fn version_string() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| match env!("GIT_HASH") {
        "" => env!("CARGO_PKG_VERSION").to_string(),
        hash => format!("{} ({})", env!("CARGO_PKG_VERSION"), hash),
    })
}

/// HTTP endpoint uptime monitor: probe targets on an interval and alert when
/// their status changes.
#[derive(Parser)]
#[command(name = "uptime-monitor", version = version_string(), about)]
struct Cli {
    /// JSON file holding targets and settings [default: config.json].
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler and the HTTP API server.
    Serve {
        /// Listen address (e.g. 0.0.0.0:8080). Overrides config file.
        #[arg(short, long)]
        listen: Option<SocketAddr>,

        /// Path to TOML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run the scheduler in the terminal and print transitions as they happen.
    Watch,
    /// Probe every monitored target once and print the results.
    Check {
        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Turn monitoring on for a target.
    Enable(ToggleArgs),
    /// Turn monitoring off for a target.
    Disable(ToggleArgs),
    /// Show or change the persisted settings.
    Settings {
        #[arg(long, value_enum)]
        notifications: Option<Switch>,

        #[arg(long, value_enum)]
        vibration: Option<Switch>,

        /// Seconds between sweeps.
        #[arg(long)]
        interval: Option<u64>,

        /// Minimum seconds between problem alerts for one target.
        #[arg(long)]
        cooldown: Option<u64>,
    },
}

#[derive(Args)]
struct ToggleArgs {
    /// Target name.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    name: Option<String>,

    /// Apply to every target.
    #[arg(long)]
    all: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(s: Switch) -> bool {
        matches!(s, Switch::On)
    }
}

#[derive(Serialize)]
struct CheckOutput {
    summary: StatusSummary,
    report: SweepReport,
    targets: Vec<TargetView>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let store = cli.store;

    match cli.command {
        Commands::Serve { listen, config } => {
            run_serve(listen, config, store).await;
        }
        Commands::Watch => {
            init_tracing("pretty", "warn");
            run_watch(store_path(store)).await;
        }
        Commands::Check { json } => {
            init_tracing("pretty", "warn");
            let code = run_check(store_path(store), json).await;
            std::process::exit(code);
        }
        Commands::Enable(args) => {
            init_tracing("pretty", "warn");
            run_toggle(store_path(store), args, true).await;
        }
        Commands::Disable(args) => {
            init_tracing("pretty", "warn");
            run_toggle(store_path(store), args, false).await;
        }
        Commands::Settings {
            notifications,
            vibration,
            interval,
            cooldown,
        } => {
            init_tracing("pretty", "warn");
            let update = SettingsUpdate {
                check_interval_seconds: interval,
                alert_cooldown_seconds: cooldown,
                notifications_enabled: notifications.map(bool::from),
                vibration_enabled: vibration.map(bool::from),
            };
            run_settings(store_path(store), update).await;
        }
    }
}

fn store_path(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
}

fn load_shared(path: &Path) -> SharedConfig {
    SharedConfig::load(Arc::new(JsonFileStore::new(path)))
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("error:").red().bold(), message);
    std::process::exit(1);
}

fn build_prober(options: &MonitorOptions) -> HttpProber {
    match HttpProber::from_options(options) {
        Ok(prober) => prober,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        }
    }
}

fn build_notifier(shared: SharedConfig, app: &AppConfig, client: reqwest::Client) -> Notifier {
    let mut notifier = Notifier::new(shared).with_app_name(&app.notifications.app_name);
    if app.notifications.log {
        notifier = notifier.with_sink(Arc::new(LogSink));
    }
    if app.notifications.feedback {
        notifier = notifier.with_feedback(Arc::new(LogFeedback));
    }
    if !app.webhook.is_empty() {
        tracing::info!(endpoints = app.webhook.len(), "Webhook delivery enabled");
        notifier = notifier.with_sink(Arc::new(WebhookSink::new(app.webhook.clone(), client)));
    }
    notifier
}

/// Monitor wired to a notifier through the dispatcher channel.
fn assemble(
    shared: SharedConfig,
    app: &AppConfig,
    options: MonitorOptions,
) -> (Arc<Monitor>, Arc<Notifier>, JoinHandle<()>) {
    let prober = build_prober(&options);
    let notifier = Arc::new(build_notifier(shared.clone(), app, prober.client().clone()));
    tracing::debug!(sinks = ?notifier.sink_names(), "Notifier ready");

    let (event_tx, event_rx) = transition_channel();
    let dispatcher = tokio::spawn(NotificationDispatcher::new(event_rx, notifier.clone()).run());

    let monitor = Arc::new(Monitor::new(shared, Arc::new(prober), options, Some(event_tx)));
    (monitor, notifier, dispatcher)
}

/// Stop the scheduler, write the last statuses, and let queued
/// notifications go out.
async fn wind_down(monitor: Arc<Monitor>, dispatcher: JoinHandle<()>) {
    monitor.stop().await;
    monitor.config().persist().await;
    drop(monitor);

    match tokio::time::timeout(Duration::from_secs(5), dispatcher).await {
        Ok(_) => tracing::info!("Notification dispatcher drained"),
        Err(_) => tracing::warn!("Notification dispatcher did not drain in time"),
    }
}

async fn run_serve(
    listen_override: Option<SocketAddr>,
    config_path: Option<PathBuf>,
    store_override: Option<PathBuf>,
) {
    let app_config = match config_path {
        Some(ref path) => match AppConfig::load(path) {
            Ok(c) => {
                init_tracing(&c.server.log_format, "info");
                tracing::info!(path = %path.display(), "Loaded config file");
                c
            }
            Err(e) => {
                init_tracing("pretty", "info");
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => {
            init_tracing("pretty", "info");
            AppConfig::default()
        }
    };

    let listen = listen_override.unwrap_or(app_config.server.listen);
    let store = store_override.unwrap_or_else(|| app_config.store.path.clone());

    let shared = load_shared(&store);
    let snapshot = shared.snapshot().await;
    tracing::info!(
        path = %store.display(),
        targets = snapshot.targets.len(),
        interval_secs = snapshot.check_interval_seconds,
        "Loaded monitor config"
    );

    let (monitor, notifier, dispatcher) =
        assemble(shared, &app_config, app_config.probe.to_options());
    monitor.start().await;

    let state = uptime_api::state::AppState::new(monitor.clone(), notifier);

    tracing::info!(%listen, "Starting uptime monitor API server");
    if let Err(e) = uptime_api::serve_with_state(listen, state, uptime_api::shutdown_signal()).await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }

    tracing::info!("Stopping scheduler...");
    wind_down(monitor, dispatcher).await;
    tracing::info!("Shutdown complete");
}

async fn run_watch(store: PathBuf) {
    let shared = load_shared(&store);
    let snapshot = shared.snapshot().await;
    let (monitor, _notifier, dispatcher) =
        assemble(shared, &AppConfig::default(), MonitorOptions::default());

    let multi = MultiProgress::new();
    for line in render::banner(&store, &snapshot) {
        multi.println(line).ok();
    }

    monitor.start().await;

    let msg_style = ProgressStyle::with_template("{wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let status_bar = multi.add(ProgressBar::new_spinner().with_style(msg_style));
    status_bar.set_message(render::status_block(&[], &StatusSummary::default(), None));

    let shutdown = uptime_api::shutdown_signal();
    tokio::pin!(shutdown);
    let mut redraw = tokio::time::interval(Duration::from_millis(500));
    // Id of the newest transition already printed.
    let mut printed: Option<String> = None;

    loop {
        tokio::select! {
            _ = redraw.tick() => {}
            _ = &mut shutdown => {
                status_bar.finish_and_clear();
                multi.println(format!("\n{}", style("Monitor stopped.").dim())).ok();
                break;
            }
        }

        let events = monitor.events().await;
        let fresh: Vec<_> = events
            .iter()
            .take_while(|ev| printed.as_deref() != Some(ev.id.as_str()))
            .collect();
        for ev in fresh.iter().rev() {
            multi.println(render::transition_line(ev)).ok();
        }
        if let Some(newest) = events.first() {
            printed = Some(newest.id.clone());
        }

        let targets = monitor.targets().await;
        let summary = monitor.summary().await;
        status_bar.set_message(render::status_block(
            &targets,
            &summary,
            monitor.last_sweep().await,
        ));
    }

    wind_down(monitor, dispatcher).await;
}

async fn run_check(store: PathBuf, json: bool) -> i32 {
    let options = MonitorOptions::default();
    let prober = Arc::new(build_prober(&options));
    let monitor = Monitor::new(load_shared(&store), prober, options, None);

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Probing targets...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let report = monitor.sweep_once().await;
    spinner.finish_and_clear();

    let output = CheckOutput {
        summary: monitor.summary().await,
        report,
        targets: monitor.targets().await,
    };

    if json {
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(e),
        }
    } else {
        println!("{}", render::target_table(&output.targets));
        println!();
        println!("  {}", render::headline(&output.summary));
    }

    if output.summary.problems > 0 {
        2
    } else {
        0
    }
}

async fn run_toggle(store: PathBuf, args: ToggleArgs, enabled: bool) {
    let shared = load_shared(&store);
    let verb = if enabled { "enabled" } else { "disabled" };

    match args.name {
        Some(name) => {
            if let Err(e) = shared.set_target_enabled(&name, enabled).await {
                fail(e);
            }
            println!("Monitoring {} for {}", verb, style(&name).bold());
        }
        None => {
            let count = shared.set_all_enabled(enabled).await;
            println!("Monitoring {} for {} targets", verb, count);
        }
    }
}

async fn run_settings(store: PathBuf, update: SettingsUpdate) {
    let shared = load_shared(&store);
    if update != SettingsUpdate::default() {
        if let Err(e) = shared.apply_settings(update).await {
            fail(e);
        }
    }
    println!("{}", render::settings_block(&shared.snapshot().await));
}

fn init_tracing(log_format: &str, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_format {
        "json" => fmt().with_env_filter(filter).json().init(),
        _ => fmt().with_env_filter(filter).init(),
    }
}

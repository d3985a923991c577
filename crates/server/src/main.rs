use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use exemptd_core::TracingAlertSink;
use exemptd_engine::{
    AlertMarkerReset, ChangeNotifier, Evaluator, ExpirationScanner, HttpProbe,
    MemoryCustomerDirectory, MemoryRoleBackend, ProfileService, ProfileStore, RoleAssigner,
};
use exemptd_server::api::{self, AppState};
use exemptd_server::config::ServerConfig;
use exemptd_server::{schedule, telemetry};
use exemptd_state_memory::MemoryAttributeStore;
use exemptd_sync::{RecordSync, RestCustomerRecordApi};
use exemptd_webhook::WebhookNotifier;

/// Exemption management HTTP server.
#[derive(Parser, Debug)]
#[command(name = "exemptd-server", about = "HTTP server for exemption management")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "exemptd.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    /// Re-derive exemption status for every customer on file before serving.
    #[arg(long)]
    backfill: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from TOML file, or use defaults if the file does not exist.
    let config: ServerConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str("")?
    };

    telemetry::init();

    if !Path::new(&cli.config).exists() {
        info!(path = %cli.config, "config file not found, using defaults");
    }
    // Fail fast on a bad cron expression instead of at first occurrence.
    schedule::parse_cron(&config.scanner.cron)?;

    let settings = config.settings.clone();
    if !settings.auto_assign_active() {
        warn!("no default exemption category configured, automatic status assignment is disabled");
    }

    let profile = ProfileStore::new(Arc::new(MemoryAttributeStore::new()));
    let alerts = Arc::new(TracingAlertSink::new(settings.log_admin_errors));
    let roles = Arc::new(RoleAssigner::new(Arc::new(MemoryRoleBackend::new())));
    let directory = Arc::new(MemoryCustomerDirectory::new());

    let evaluator = Arc::new(Evaluator::new(
        profile.clone(),
        roles,
        Arc::new(HttpProbe::new()),
        alerts.clone(),
        settings.clone(),
    ));

    let mut notifier = ChangeNotifier::new(alerts.clone())
        .with_subscriber(Arc::new(AlertMarkerReset::new(profile.clone())))
        .with_subscriber(Arc::new(WebhookNotifier::new(settings.webhooks.clone())));
    if config.remote.enabled {
        let api = Arc::new(RestCustomerRecordApi::new(
            config.remote.base_url.clone(),
            config.remote.api_token.clone(),
        ));
        notifier.subscribe(Arc::new(RecordSync::new(api, directory.clone())));
        info!(base_url = %config.remote.base_url, "remote record sync enabled");
    }
    let notifier = Arc::new(notifier);

    let service = Arc::new(ProfileService::new(
        profile.clone(),
        evaluator,
        notifier.clone(),
        settings.clone(),
    ));
    if cli.backfill {
        let changed = service.backfill(chrono::Utc::now().timestamp()).await?;
        info!(changed, "startup backfill finished");
    }

    let scanner = Arc::new(ExpirationScanner::new(
        profile.clone(),
        directory,
        notifier,
        alerts,
        settings.clone(),
    ));

    tokio::spawn(schedule::run_scanner(
        scanner,
        config.scanner.clone(),
        settings.timezone,
    ));

    let state = Arc::new(AppState {
        profile,
        service,
        download: config.download.clone(),
    });
    let app = api::router(state);

    // Resolve the bind address (CLI overrides take precedence).
    let host = cli.host.unwrap_or(config.listen.host);
    let port = cli.port.unwrap_or(config.listen.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "exemptd-server listening");

    // Serve with graceful shutdown on SIGINT / SIGTERM.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("exemptd-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}

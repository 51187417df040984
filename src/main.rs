//! marian-relay - translation relay for Marian engines
//!
//! Entry point: loads settings and the services file, launches one engine
//! per language pair and serves the HTTP API.

use anyhow::Result;
use clap::Parser;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use marian_relay::api::create_router;
use marian_relay::cli::{Args, Commands};
use marian_relay::config::{Config, ServiceConfig};
use marian_relay::engine::TokioLauncher;
use marian_relay::error::RelayError;
use marian_relay::registry::WorkerRegistry;
use marian_relay::session::WebSocketSession;
use marian_relay::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    let _guard = setup_logging(args.verbose, &config.logging.log_dir)?;

    match args.command {
        Commands::Serve { port, services } => {
            let services = load_services(&config, services)?;
            serve(config, services, port).await?;
        }
        Commands::Languages { services } => {
            let services = load_services(&config, services)?;
            for (source, targets) in services.languages() {
                println!("{:<8} -> {}", source, targets.join(", "));
            }
        }
        Commands::Translate { from, to, text, services, attempts } => {
            let services = load_services(&config, services)?;
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let translation = translate_once(&config, &services, &from, &to, &text, attempts).await?;
            println!("{}", translation);
        }
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

fn load_services(config: &Config, override_path: Option<PathBuf>) -> Result<ServiceConfig> {
    let path = override_path.unwrap_or_else(|| config.server.services_path.clone());
    info!("Loading services from {}", path.display());
    let services = ServiceConfig::from_file(&path)?;
    info!("Found {} language pairs", services.pair_count());
    Ok(services)
}

fn build_registry(config: &Config, services: &ServiceConfig) -> WorkerRegistry {
    WorkerRegistry::build(
        services,
        &config.engine,
        Arc::new(TokioLauncher),
        Arc::new(WebSocketSession::new(config.engine.session_timeout())),
    )
}

async fn serve(config: Config, services: ServiceConfig, port: Option<u16>) -> Result<()> {
    let state = AppState::new(build_registry(&config, &services));
    if state.registry.is_empty() {
        warn!("No language pairs configured, every translation will be rejected");
    }
    let app = create_router(state.clone());

    let addr = format!("{}:{}", config.server.host, port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Stopping engines");
    state.registry.shutdown().await;
    Ok(())
}

/// Launch only the requested pair and retry while its engine comes up
async fn translate_once(
    config: &Config,
    services: &ServiceConfig,
    from: &str,
    to: &str,
    text: &str,
    attempts: u32,
) -> Result<String> {
    let entry = services
        .pairs
        .get(from)
        .and_then(|targets| targets.get(to))
        .ok_or_else(|| RelayError::UnsupportedPair(format!("{}-{}", from, to)))?;

    let single = ServiceConfig {
        pairs: BTreeMap::from([(
            from.to_string(),
            BTreeMap::from([(to.to_string(), entry.clone())]),
        )]),
    };
    let registry = build_registry(config, &single);
    let worker = registry
        .lookup_pair(from, to)
        .ok_or_else(|| RelayError::UnsupportedPair(format!("{}-{}", from, to)))?;

    let mut attempt = 0;
    let result = loop {
        attempt += 1;
        match worker.translate(text).await {
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!("Attempt {} failed: {} (engine may still be loading)", attempt, e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            other => break other,
        }
    };

    registry.shutdown().await;
    Ok(result?)
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(log_dir, "marian-relay.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("marian-relay.log").display()
    );

    Ok(guard)
}

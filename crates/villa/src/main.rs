use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use villa::api::{self, AppState};
use villa::config::{AppConfig, ConfigOverrides};
use villa::db::Database;
use villa::ws::RealtimeHub;

const APP_NAME: &str = "villa";

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.common.config.as_deref())?;
    config.apply_overrides(cli.common.overrides());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            init_logging(&cli.common, &config);
            debug!("effective config: {:?}", config);
            async_serve(config)
        }
        Command::Config => handle_config(&config),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Villa backend: REST API and live feed server.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Load settings from this TOML file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,
    /// Address to listen on
    #[arg(long, env = "HOST", global = true)]
    host: Option<String>,
    /// Port to listen on
    #[arg(long, env = "PORT", global = true)]
    port: Option<u16>,
    /// Database URL, e.g. sqlite://villa.db
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,
    /// Comma separated CORS origins; unset allows any origin
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',', global = true)]
    allowed_origins: Option<Vec<String>>,
}

impl CommonOpts {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            database_url: self.database_url.clone(),
            allowed_origins: self.allowed_origins.clone(),
        }
    }

    fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server (default)
    Serve,
    /// Print the effective configuration as TOML
    Config,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(common: &CommonOpts, config: &AppConfig) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let level = common.log_level(&config.logging.level);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{APP_NAME}={level},tower_http={level}")));

    if common.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .try_init()
            .ok();
    }
}

fn handle_config(config: &AppConfig) -> Result<()> {
    let toml = config.to_toml()?;
    io::stdout()
        .write_all(toml.as_bytes())
        .context("writing config to stdout")
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}

#[tokio::main]
async fn async_serve(config: AppConfig) -> Result<()> {
    handle_serve(config).await
}

async fn handle_serve(config: AppConfig) -> Result<()> {
    let db = Database::connect(&config.database.url, config.database.max_connections).await?;

    let realtime = Arc::new(RealtimeHub::new());
    let state = AppState::new(&db, realtime.clone(), config.cors.allowed_origins.clone());
    let app = api::create_router(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    info!("Listening on http://{}", addr);

    // Open sockets block graceful shutdown until the hub closes them.
    let hub = realtime.clone();
    let shutdown = async move {
        shutdown_signal().await;
        info!("Shutdown signal received, closing realtime connections...");
        hub.shutdown();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("running server")?;

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
}

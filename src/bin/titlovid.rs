//! titlovid: Titlovi.com subtitle add-on server.
//!
//! Serves Stremio subtitle routes backed by an authenticated, cached and
//! rate-limited Titlovi.com client.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use titlovi_gateway::server::config::Config;
use titlovi_gateway::server::{AppState, serve, shutdown_signal};
use titlovi_gateway::types::Credentials;
use titlovi_gateway::{GatewayError, RateLimiter, credentials};

/// Titlovi.com subtitle gateway.
#[derive(Parser)]
#[command(name = "titlovid")]
#[command(version = titlovi_gateway::PKG_VERSION)]
#[command(about = "Titlovi.com subtitle add-on server")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "TITLOVI_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Address to bind to, overriding the config file.
    #[arg(long, env = "TITLOVI_ADDRESS", global = true)]
    address: Option<String>,

    /// Public base URL, overriding the config file.
    #[arg(long, env = "TITLOVI_PUBLIC_URL", global = true)]
    public_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server (default).
    Serve,
    /// Print the add-on configuration token for an account.
    EncodeCredentials {
        #[arg(long, env = "TITLOVI_USERNAME")]
        username: String,
        #[arg(long, env = "TITLOVI_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Some(Command::EncodeCredentials { username, password }) => {
            let token = credentials::encode(&Credentials::new(username, password))?;
            println!("{token}");
            Ok(())
        }
        Some(Command::Serve) | None => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();
            run(args.config, args.address, args.public_url).await
        }
    }
}

async fn run(
    config_path: Option<PathBuf>,
    address: Option<String>,
    public_url: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load(config_path.as_deref())?;
    if let Some(address) = address {
        config.server.address = address;
    }
    if let Some(public_url) = public_url {
        config.server.public_url = public_url;
    }

    let gateway = Arc::new(config.gateway_builder().build()?);
    let limiter = Arc::new(RateLimiter::new(config.rate_limit_config())?);
    limiter.start_eviction();

    let listener = TcpListener::bind(&config.server.address).await.map_err(|e| {
        GatewayError::Configuration(format!("cannot bind {}: {e}", config.server.address))
    })?;

    info!(
        version = titlovi_gateway::version_string(),
        addr = %listener.local_addr()?,
        public_url = %gateway.public_url(),
        "titlovid starting"
    );

    let state = AppState {
        gateway,
        limiter: limiter.clone(),
    };
    serve(listener, state, shutdown_signal()).await?;

    limiter.shutdown().await;
    info!("titlovid stopped");
    Ok(())
}

//! fnstack - local runner for serverless voice and messaging functions
//!
//! Serves registered functions and static assets over HTTP the way the hosted
//! runtime would invoke them.

use clap::Parser;
use fnstack::{config::Config, create_router, functions, AppState};
use fnstack_core::credentials::{ACCOUNT_SID, AUTH_TOKEN};
use fnstack_runtime::FunctionRegistry;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "fnstack")]
#[command(about = "Local runner for serverless voice and messaging functions", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "FNSTACK_PORT")]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "FNSTACK_HOST")]
    host: Option<String>,

    /// Public base URL functions see as their domain
    #[arg(long, env = "FNSTACK_URL")]
    url: Option<String>,

    /// Directory served as static assets
    #[arg(long, env = "FNSTACK_ASSETS_DIR")]
    assets_dir: Option<PathBuf>,

    /// Configuration file (defaults to ./fnstack.toml when present)
    #[arg(short, long, env = "FNSTACK_CONFIG")]
    config: Option<PathBuf>,

    /// Account SID handed to functions
    #[arg(long, env = "ACCOUNT_SID", hide_env_values = true)]
    account_sid: Option<String>,

    /// Auth token handed to functions
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Extra environment entries for functions, as KEY=VALUE
    #[arg(short, long = "env", value_parser = parse_env_entry)]
    env: Vec<(String, String)>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "FNSTACK_LOG_LEVEL")]
    log_level: String,
}

fn parse_env_entry(entry: &str) -> Result<(String, String), String> {
    match entry.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", entry)),
    }
}

impl Args {
    /// Apply command line overrides on top of the loaded configuration
    fn apply(self, mut config: Config) -> Config {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if self.url.is_some() {
            config.runtime.url = self.url;
        }
        if self.assets_dir.is_some() {
            config.runtime.assets_dir = self.assets_dir;
        }
        if let Some(account_sid) = self.account_sid {
            config.env.insert(ACCOUNT_SID.to_string(), account_sid);
        }
        if let Some(auth_token) = self.auth_token {
            config.env.insert(AUTH_TOKEN.to_string(), auth_token);
        }
        config.env.extend(self.env);
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "fnstack={level},fnstack_runtime={level},tower_http=debug",
                    level = args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let config = args.apply(config);

    info!("Starting fnstack...");
    info!("  URL: {}", config.base_url());
    match &config.runtime.assets_dir {
        Some(dir) => info!("  Assets: {}", dir.display()),
        None => info!("  Assets: none"),
    }

    let registry = FunctionRegistry::new();
    functions::register_samples(&registry);
    for name in registry.names() {
        info!("  Function: /{}", name);
    }

    let app = create_router(AppState::new(&config, Arc::new(registry)));

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Serves a federated users subgraph over HTTP.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use federated_subgraph::Federation;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::configuration::Configuration;
use crate::store::UserStore;

mod app;
mod configuration;
mod store;

/// Options for the users subgraph
#[derive(Parser, Debug)]
#[command(name = "users-subgraph", about = "Federated users subgraph")]
struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(long = "log", default_value = "info", env = "USERS_SUBGRAPH_LOG")]
    env_filter: String,

    /// Emit logs as JSON.
    #[arg(long, env = "USERS_SUBGRAPH_JSON_LOGS")]
    json_logs: bool,

    /// Configuration file location.
    #[arg(short, long = "config", env = "USERS_SUBGRAPH_CONFIG_PATH")]
    configuration_path: Option<PathBuf>,

    /// Overrides the listen address of the configuration.
    #[arg(long, env = "USERS_SUBGRAPH_LISTEN")]
    listen: Option<SocketAddr>,
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(rt_main())
}

async fn rt_main() -> Result<()> {
    let opt = Opt::parse();

    let env_filter = std::env::var("RUST_LOG").ok().unwrap_or(opt.env_filter);
    let builder = tracing_subscriber::fmt::fmt()
        .with_env_filter(EnvFilter::try_new(&env_filter).context("could not parse log")?);
    if opt.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    let mut configuration = match &opt.configuration_path {
        Some(path) => Configuration::from_file(path)?,
        None => Configuration::default(),
    };
    if let Some(listen) = opt.listen {
        configuration.listen = listen;
    }

    let (sdl, schema_name) = configuration.load_schema()?;
    let federation = Arc::new(Federation::new());
    federation
        .build_subgraph_schema_from_sdl(&sdl, &schema_name)
        .with_context(|| format!("could not build the subgraph schema from {schema_name}"))?;
    Arc::new(UserStore::default()).register(&federation)?;

    let listener = TcpListener::bind(configuration.listen)
        .await
        .with_context(|| format!("could not listen on {}", configuration.listen))?;
    tracing::info!(
        address = %listener.local_addr()?,
        path = %configuration.path,
        "users subgraph is listening"
    );
    axum::serve(listener, app::router(federation, &configuration.path))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("users subgraph stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "could not listen for the shutdown signal");
    }
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use clap::Parser;
use clap_serde_derive::ClapSerde;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::inference::{InferenceService, TractRuntime};
use crate::store::{BlobStore, FsBlobStore, HttpBlobStore};

mod api;
mod config;
mod error;
mod headers;
mod inference;
mod store;
mod telemetry;

#[cfg(unix)]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

const DEFAULT_CONFIG_FILE: &str = "WeaveRunner.toml";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: Arc<InferenceService>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = match Config::from_toml(&args.config_file) {
        Ok(conf) => conf.merge(args.opt_config),
        Err(_) if args.config_file == DEFAULT_CONFIG_FILE => {
            Config::default().merge(args.opt_config)
        }
        Err(err) => return Err(err),
    };
    telemetry::init_telemetry(config.otel_endpoint(), config.console)?;

    let store: Arc<dyn BlobStore> = match config.model_bucket_url() {
        Some(url) => {
            info!("Serving models from bucket {url}");
            Arc::new(HttpBlobStore::new(url)?)
        }
        None => {
            info!("Serving models from directory {}", config.model_dir);
            Arc::new(FsBlobStore::new(&config.model_dir))
        }
    };
    let state = AppState {
        service: Arc::new(InferenceService::new(store, Arc::new(TractRuntime))),
    };
    let router = api::router(state);

    let address: SocketAddr = format!("{}:{}", config.address, config.port)
        .parse()
        .context("Invalid listen address")?;

    match config.tls_paths() {
        Some((cert, key)) => {
            let tls = RustlsConfig::from_pem_file(cert, key)
                .await
                .context("Failed to load TLS certificate")?;
            let handle = Handle::new();
            tokio::spawn(shutdown_on_signal(handle.clone()));

            info!("Listening on {address} (TLS)");
            axum_server::bind_rustls(address, tls)
                .handle(handle)
                .serve(router.into_make_service())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(address).await?;
            info!("Listening on {}", listener.local_addr()?);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

async fn shutdown_on_signal(handle: Handle) {
    shutdown_signal().await;
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}

//! Entry point: parse CLI, validate configuration, wire up the cache and
//! periodic cleaner, then run the listener until interrupted.

use std::sync::Arc;

use clap::Parser;
use proxy_cache::{spawn_cleaner, ResponseCache};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod handler;
mod listener;
mod origin;

use config::{Args, Config};

fn init_logging() {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let directive = match level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" => "warn",
        "ERROR" => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = match Config::from_args(Args::parse()) {
        Ok(config) => Arc::new(config),
        Err(error) => {
            eprintln!("configuration error: {error}");
            std::process::exit(1);
        }
    };

    let tls_config = origin::build_tls_config()?;
    let cache = Arc::new(Mutex::new(ResponseCache::new(
        config.size_limit,
        config.policy,
        config.hit_ttl,
    )));

    let cleaner = spawn_cleaner(Arc::clone(&cache), config.clean_interval);

    tokio::select! {
        result = listener::run(Arc::clone(&config), Arc::clone(&cache), tls_config) => {
            if let Err(error) = result {
                eprintln!("fatal listener error: {error}");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt, shutting down");
        }
    }

    if let Some(cleaner) = cleaner {
        cleaner.abort();
    }

    Ok(())
}

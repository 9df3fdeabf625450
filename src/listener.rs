//! Binds the listening socket and dispatches each accepted connection to an
//! independent handler task. Never blocks on a handler.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{error, info};

use proxy_cache::ResponseCache;

use crate::config::Config;
use crate::handler;

pub async fn run(
    config: Arc<Config>,
    cache: Arc<Mutex<ResponseCache>>,
    tls_config: Arc<rustls::ClientConfig>,
) -> std::io::Result<()> {
    let address = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&address).await?;
    info!(address = address.as_str(), origin = ?config.origin, "caching proxy listening");

    loop {
        let (socket, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                error!(%error, "failed to accept connection");
                continue;
            }
        };

        let config = Arc::clone(&config);
        let cache = Arc::clone(&cache);
        let tls_config = Arc::clone(&tls_config);
        task::spawn(async move {
            handler::run_handler(socket, peer_addr, config, cache, tls_config).await;
        });
    }
}

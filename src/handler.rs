//! Per-connection orchestration: read client request, consult the cache,
//! optionally round-trip to the origin, write the response, close.

use std::net::SocketAddr;
use std::sync::Arc;

use proxy_http::{Message, Request, Response};
use proxy_http1::{DechunkedMessageBuilder, RawMessageBuilder};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{error, info};

use proxy_cache::ResponseCache;

use crate::config::Config;
use crate::error::{ClientWriteError, HandlerError, OriginError};
use crate::origin;

const CACHE_HEADER: &str = "x_cached_by_proxy";
const HIT: &str = "HIT";
const MISS: &str = "MISS";

/// Runs one connection to completion, logging and closing the client socket
/// on any failure rather than propagating it — errors here must never reach
/// the listener or disturb other connections.
pub async fn run_handler(
    client_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<Config>,
    cache: Arc<Mutex<ResponseCache>>,
    tls_config: Arc<rustls::ClientConfig>,
) {
    info!(peer = %peer_addr, "connection accepted");

    if let Err(error) = handle_connection(client_stream, config, cache, tls_config).await {
        error!(peer = %peer_addr, %error, "closing connection without a reply");
    }
}

async fn handle_connection(
    client_stream: TcpStream,
    config: Arc<Config>,
    cache: Arc<Mutex<ResponseCache>>,
    tls_config: Arc<rustls::ClientConfig>,
) -> Result<(), HandlerError> {
    let mut client = BufReader::new(client_stream);

    let mut request = DechunkedMessageBuilder::new(&mut client).build_request().await?;
    rewrite_host_header(&mut request, &config);

    let method = request.method();
    if method != "GET" {
        let mut response = forward_to_origin(&request, &config, &tls_config).await?;
        stamp_cache_status(&mut response, MISS);
        return write_to_client(&mut client, &response).await.map_err(Into::into);
    }

    let key = request.request_line().to_string();
    let cached = {
        let mut cache = cache.lock().await;
        if cache.has(&key) {
            cache.get(&key)
        } else {
            None
        }
    };

    let (mut response, status) = match cached {
        Some((headers, body)) => {
            info!(key = key.as_str(), "cache hit");
            (RawMessageBuilder::build_response(&headers, &body), HIT)
        }
        None => {
            info!(key = key.as_str(), "cache miss");
            let response = forward_to_origin(&request, &config, &tls_config).await?;
            let mut cache = cache.lock().await;
            cache.put(key, response.headers().raw().to_vec(), response.body().as_bytes().to_vec());
            (response, MISS)
        }
    };

    stamp_cache_status(&mut response, status);
    write_to_client(&mut client, &response).await.map_err(Into::into)
}

/// Always overwrites `Host`, creating it if the client somehow omitted one.
fn rewrite_host_header(request: &mut Request, config: &Config) {
    let host_header = config.origin.host_header();
    if !request.replace_header("host", vec![host_header.clone()]) {
        request.set_header("host", vec![host_header]);
    }
}

fn stamp_cache_status(response: &mut Response, status: &str) {
    if !response.replace_header(CACHE_HEADER, vec![status.to_string()]) {
        response.set_header(CACHE_HEADER, vec![status.to_string()]);
    }
}

async fn forward_to_origin(
    request: &Request,
    config: &Config,
    tls_config: &Arc<rustls::ClientConfig>,
) -> Result<Response, HandlerError> {
    let origin_stream = origin::connect(&config.origin, tls_config)
        .await
        .map_err(HandlerError::Origin)?;
    let mut origin_stream = BufReader::new(origin_stream);

    origin_stream
        .write_all(&request.raw())
        .await
        .map_err(|error| HandlerError::Origin(OriginError(error)))?;
    origin_stream
        .flush()
        .await
        .map_err(|error| HandlerError::Origin(OriginError(error)))?;

    let response = DechunkedMessageBuilder::new(&mut origin_stream).build_response().await?;
    Ok(response)
}

async fn write_to_client<W>(client: &mut W, response: &Response) -> Result<(), ClientWriteError>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    client.write_all(&response.raw()).await?;
    client.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OriginAddress;
    use proxy_cache::EvictionPolicy;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_config(origin_port: u16) -> Arc<Config> {
        Arc::new(Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            origin: OriginAddress {
                host: "127.0.0.1".to_string(),
                port: origin_port,
                use_tls: false,
            },
            size_limit: 10,
            clean_interval: 0,
            policy: EvictionPolicy::Lru,
            hit_ttl: 10,
        })
    }

    fn plain_tls_config() -> Arc<rustls::ClientConfig> {
        let roots = rustls::RootCertStore::empty();
        Arc::new(
            rustls::ClientConfig::builder()
                .with_safe_defaults()
                .with_root_certificates(roots)
                .with_no_client_auth(),
        )
    }

    /// Runs a stand-in origin that accepts exactly one connection, echoes back
    /// a fixed response, and reports the request bytes it saw.
    async fn run_stub_origin(listener: TcpListener, response: &'static [u8]) -> Vec<u8> {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 4096];
        let n = stream.read(&mut request).await.unwrap();
        request.truncate(n);
        stream.write_all(response).await.unwrap();
        stream.flush().await.unwrap();
        request
    }

    async fn proxy_one_request(
        config: Arc<Config>,
        cache: Arc<Mutex<ResponseCache>>,
        request_bytes: &[u8],
    ) -> Vec<u8> {
        let client_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client_addr = client_listener.local_addr().unwrap();

        let mut client_side = TcpStream::connect(client_addr).await.unwrap();
        client_side.write_all(request_bytes).await.unwrap();
        client_side.flush().await.unwrap();

        let (server_side, _) = client_listener.accept().await.unwrap();
        handle_connection(server_side, config, cache, plain_tls_config())
            .await
            .unwrap();

        let mut response = Vec::new();
        client_side.read_to_end(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn second_identical_get_is_served_from_cache() {
        let origin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin_port = origin_listener.local_addr().unwrap().port();
        let origin_task = tokio::spawn(run_stub_origin(
            origin_listener,
            b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok",
        ));

        let config = test_config(origin_port);
        let cache = Arc::new(Mutex::new(ResponseCache::new(10, EvictionPolicy::Lru, 10)));

        let first = proxy_one_request(
            Arc::clone(&config),
            Arc::clone(&cache),
            b"GET /x HTTP/1.1\r\nHost: client\r\n\r\n",
        )
        .await;
        assert!(String::from_utf8_lossy(&first).contains("X-Cached-By-Proxy: MISS"));

        let origin_request = origin_task.await.unwrap();
        assert!(String::from_utf8_lossy(&origin_request).contains("Host: 127.0.0.1"));

        let second = proxy_one_request(
            Arc::clone(&config),
            Arc::clone(&cache),
            b"GET /x HTTP/1.1\r\nHost: client\r\n\r\n",
        )
        .await;
        assert!(String::from_utf8_lossy(&second).contains("X-Cached-By-Proxy: HIT"));
    }

    #[tokio::test]
    async fn post_is_never_cached() {
        let origin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin_port = origin_listener.local_addr().unwrap().port();

        let first_origin = tokio::spawn(run_stub_origin(
            origin_listener,
            b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n",
        ));

        let config = test_config(origin_port);
        let cache = Arc::new(Mutex::new(ResponseCache::new(10, EvictionPolicy::Lru, 10)));

        let first = proxy_one_request(
            Arc::clone(&config),
            Arc::clone(&cache),
            b"POST /submit HTTP/1.1\r\nHost: client\r\nContent-Length: 0\r\n\r\n",
        )
        .await;
        assert!(String::from_utf8_lossy(&first).contains("X-Cached-By-Proxy: MISS"));
        first_origin.await.unwrap();

        assert_eq!(cache.lock().await.size(), 0);
    }

    #[tokio::test]
    async fn chunked_origin_response_is_dechunked_before_reaching_client() {
        let origin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin_port = origin_listener.local_addr().unwrap().port();
        let origin_task = tokio::spawn(run_stub_origin(
            origin_listener,
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n",
        ));

        let config = test_config(origin_port);
        let cache = Arc::new(Mutex::new(ResponseCache::new(10, EvictionPolicy::Lru, 10)));

        let response = proxy_one_request(
            config,
            cache,
            b"GET /wiki HTTP/1.1\r\nHost: client\r\n\r\n",
        )
        .await;
        origin_task.await.unwrap();

        let response = String::from_utf8_lossy(&response);
        assert!(response.contains("Content-Length: 9"));
        assert!(!response.contains("Transfer-Encoding"));
        assert!(response.ends_with("Wikipedia"));
    }
}

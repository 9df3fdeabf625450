//! Dialing the single configured origin, plain or TLS-wrapped.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use crate::config::OriginAddress;
use crate::error::OriginError;

/// One connection to the origin: either a bare TCP stream, or one wrapped in
/// TLS. Unified so the handler can read/write through it without caring
/// which it got.
pub enum OriginStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for OriginStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            OriginStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            OriginStream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for OriginStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            OriginStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            OriginStream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            OriginStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            OriginStream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            OriginStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            OriginStream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Opens a connection to `origin`, wrapping it in TLS when the origin URL's
/// scheme was `https://`.
pub async fn connect(
    origin: &OriginAddress,
    tls_config: &Arc<rustls::ClientConfig>,
) -> Result<OriginStream, OriginError> {
    let dial_target = (origin.host.as_str(), origin.port);
    debug!(host = origin.host.as_str(), port = origin.port, tls = origin.use_tls, "dialing origin");
    let stream = TcpStream::connect(dial_target).await?;

    if !origin.use_tls {
        return Ok(OriginStream::Plain(stream));
    }

    let domain = origin
        .host
        .split(':')
        .next()
        .unwrap_or(origin.host.as_str());
    let server_name = rustls::ServerName::try_from(domain)
        .map_err(|_| OriginError(io::Error::new(io::ErrorKind::InvalidInput, "invalid origin host for TLS SNI")))?;

    let connector = tokio_rustls::TlsConnector::from(Arc::clone(tls_config));
    let tls_stream = connector.connect(server_name, stream).await?;
    Ok(OriginStream::Tls(Box::new(tls_stream)))
}

/// Builds the `rustls::ClientConfig` used for every origin TLS connection,
/// trusting the platform's native root certificate store.
pub fn build_tls_config() -> anyhow::Result<Arc<rustls::ClientConfig>> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs()? {
        roots.add(&rustls::Certificate(cert.0))?;
    }

    let config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

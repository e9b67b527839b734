//! Accept loops: HTTPS via tokio-rustls + hyper-util, or plain HTTP.
//!
//! Both modes serve connections through the same hyper-util builder, so the
//! header read timeout and the idle bound hold whether or not TLS is on.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::Result;
use axum::{extract::Request, Router};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use rustls::ServerConfig;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_rustls::TlsAcceptor;
use tower::Service;
use tracing::{debug, error, warn};

use super::middleware::{HEADER_READ_TIMEOUT, IDLE_TIMEOUT};

/// Pause after a failed `accept` so a persistent error (EMFILE) cannot spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Per-connection time limits.
#[derive(Debug, Clone, Copy)]
struct ConnLimits {
    header_read: Duration,
    idle: Duration,
}

impl Default for ConnLimits {
    fn default() -> Self {
        Self {
            header_read: HEADER_READ_TIMEOUT,
            idle: IDLE_TIMEOUT,
        }
    }
}

/// Serve `router` over TLS until the process is killed.
///
/// Each connection is handshaked and served on its own task; a failed
/// handshake only drops that connection.
pub async fn serve_tls(listener: TcpListener, tls: Arc<ServerConfig>, router: Router) -> Result<()> {
    accept_loop(listener, Some(TlsAcceptor::from(tls)), router, ConnLimits::default()).await
}

/// Serve `router` over plain HTTP until the process is killed.
pub async fn serve_plain(listener: TcpListener, router: Router) -> Result<()> {
    accept_loop(listener, None, router, ConnLimits::default()).await
}

async fn accept_loop(
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
    router: Router,
    limits: ConnLimits,
) -> Result<()> {
    loop {
        let (tcp, peer_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!(error = %e, "accept error");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let router = router.clone();
        tokio::spawn(async move {
            match acceptor {
                Some(acceptor) => match acceptor.accept(tcp).await {
                    Ok(stream) => serve_connection(stream, router, peer_addr, limits).await,
                    Err(e) => warn!(%peer_addr, error = %e, "TLS handshake failed"),
                },
                None => serve_connection(tcp, router, peer_addr, limits).await,
            }
        });
    }
}

/// Serve one connection. Once no bytes have moved in either direction for
/// `limits.idle`, the connection is asked to shut down gracefully, which lets
/// an in-flight response finish first.
async fn serve_connection<S>(stream: S, router: Router, peer_addr: SocketAddr, limits: ConnLimits)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let clock = Arc::new(ActivityClock::new());
    let io = TokioIo::new(Tracked {
        inner: stream,
        clock: Arc::clone(&clock),
    });

    let service = hyper::service::service_fn(move |req: Request<Incoming>| {
        router.clone().call(req)
    });

    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(limits.header_read);

    let conn = builder.serve_connection(io, service);
    tokio::pin!(conn);

    let mut closing = false;
    loop {
        let idle_left = limits.idle.saturating_sub(clock.idle_for());
        tokio::select! {
            res = conn.as_mut() => {
                if let Err(e) = res {
                    debug!(%peer_addr, error = %e, "connection closed with error");
                }
                return;
            }
            _ = tokio::time::sleep(idle_left), if !closing => {
                if clock.idle_for() >= limits.idle {
                    debug!(%peer_addr, "closing idle connection");
                    conn.as_mut().graceful_shutdown();
                    closing = true;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Idle tracking
// ---------------------------------------------------------------------------

/// Time of the last successful read or write on a connection.
struct ActivityClock {
    start: Instant,
    last_ms: AtomicU64,
}

impl ActivityClock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        let ms = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_ms.store(ms, Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_ms.load(Ordering::Relaxed));
        self.start.elapsed().saturating_sub(last)
    }
}

/// Stream wrapper that touches an [`ActivityClock`] whenever bytes move.
struct Tracked<S> {
    inner: S,
    clock: Arc<ActivityClock>,
}

impl<S: AsyncRead + Unpin> AsyncRead for Tracked<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let res = Pin::new(&mut this.inner).poll_read(cx, buf);
        if buf.filled().len() > before {
            this.clock.touch();
        }
        res
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Tracked<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let res = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = res {
            if n > 0 {
                this.clock.touch();
            }
        }
        res
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

//! HTTP server and graceful shutdown.
//!
//! The server owns the transport: it accepts connections, lets hyper parse
//! requests, builds one [`Store`] per request, and runs the configured
//! [`Chain`]. The chain core never fabricates responses (a miss is not an
//! error); the server is the wrapping caller that guarantees the client gets
//! one anyway — `500` when the chain failed, `404` when it fell through with
//! nothing to say.
//!
//! # Shutdown
//!
//! On SIGTERM or Ctrl-C the listener stops accepting immediately and every
//! in-flight connection drains before [`Server::serve`] returns. Size your
//! orchestrator's grace period (Kubernetes
//! `terminationGracePeriodSeconds`) to exceed your slowest request.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::chain::Chain;
use crate::error::Error;
use crate::response::plain_status;
use crate::store::Store;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and running each request through `chain`.
    ///
    /// Returns only after a full graceful shutdown: a signal arrives, the
    /// listener closes, and every in-flight request completes.
    pub async fn serve(self, chain: Chain) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // One chain, shared read-only by every connection task.
        let chain = Arc::new(chain);

        info!(addr = %self.addr, "strand listening");

        // Every connection task lands in the JoinSet so shutdown can wait
        // for all of them.
        let mut tasks = tokio::task::JoinSet::new();

        // The signal future is polled across loop iterations, so it must be
        // pinned once, outside the loop.
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Top-to-bottom arm order: a pending signal beats a pending
                // accept, so no new connection sneaks in after SIGTERM.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let chain = Arc::clone(&chain);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection, not once
                        // per connection.
                        let svc = service_fn(move |req| {
                            let chain = Arc::clone(&chain);
                            async move { dispatch(chain, req, remote_addr).await }
                        });

                        // Auto builder speaks whichever of HTTP/1.1 and
                        // HTTP/2 the client negotiates; the upgrade-aware
                        // variant keeps 101 switches (WebSocket) working.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection_with_upgrades(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the set stays bounded on
                // long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain every in-flight connection before returning.
        while tasks.join_next().await.is_some() {}

        info!("strand stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Hot path: one request in, one response out.
///
/// The error type is [`Infallible`] — every failure becomes a response here,
/// so hyper never sees an error.
async fn dispatch(
    chain: Arc<Chain>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let store = Store::from_hyper(req, remote_addr);
    let (mut store, error) = chain.run(store).await;

    let response = match (store.take_response(), error) {
        (Some(res), _) => res.into_http(),
        (None, Some(_)) => plain_status(StatusCode::INTERNAL_SERVER_ERROR),
        (None, None) => plain_status(StatusCode::NOT_FOUND),
    };
    Ok(response)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal: SIGTERM (orchestrators) or SIGINT
/// (Ctrl-C) on Unix, Ctrl-C only elsewhere.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    // Never resolves, so the SIGTERM arm is inert off Unix.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

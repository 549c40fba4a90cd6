//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use super::routes::router;
use crate::error::Result;
use crate::ratelimit::RateLimiterBackend;

/// HTTP server fronting the demo endpoint with the rate limit.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The rate limiter consulted for every request
    backend: Arc<dyn RateLimiterBackend>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, backend: Arc<dyn RateLimiterBackend>) -> Self {
        Self { addr, backend }
    }

    /// Bind the configured address and serve until `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(addr = %self.addr, error = %e, "Failed to bind HTTP listener");
            e
        })?;

        Self::serve_listener(listener, self.backend, signal).await
    }

    /// Serve on an already bound listener until `signal` resolves.
    pub async fn serve_listener<F>(
        listener: TcpListener,
        backend: Arc<dyn RateLimiterBackend>,
        signal: F,
    ) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "Starting HTTP server with graceful shutdown");

        let app = router(backend).into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                e
            })?;

        info!("HTTP server stopped");
        Ok(())
    }
}

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::service::RelayService;
use crate::sweeper::ExpirySweeper;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// The relay HTTP server.
///
/// Owns the service state, the expiry sweeper and the shutdown signal. State
/// is memory-only and is dropped with the server.
pub struct RelayServer {
    config: RelayConfig,
    service: RelayService,
    shutdown_sender: watch::Sender<bool>,
}

impl RelayServer {
    /// Creates a server with empty state.
    pub fn new(config: RelayConfig) -> Self {
        let service = RelayService::new(config.clone());
        Self::with_service(config, service)
    }

    /// Creates a server around an existing service.
    pub fn with_service(config: RelayConfig, service: RelayService) -> Self {
        let (shutdown_sender, _) = watch::channel(false);
        Self {
            config,
            service,
            shutdown_sender,
        }
    }

    pub fn service(&self) -> RelayService {
        self.service.clone()
    }

    /// Binds the configured address and serves until [`shutdown`](Self::shutdown).
    ///
    /// # Returns
    ///
    /// `Ok(())` after a clean shutdown, or [`RelayError::Network`] if the
    /// address cannot be bound or serving fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use relay_core::{RelayConfig, RelayServer};
    /// use std::sync::Arc;
    ///
    /// # async fn run() -> relay_core::RelayResult<()> {
    /// let server = Arc::new(RelayServer::new(RelayConfig::default()));
    /// let running = {
    ///     let server = server.clone();
    ///     tokio::spawn(async move { server.start().await })
    /// };
    ///
    /// // ... later, on a shutdown signal:
    /// server.shutdown().await?;
    /// # let _ = running.await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(&self) -> RelayResult<()> {
        let address = self.config.bind_address;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| RelayError::Network(format!("failed to bind {address}: {e}")))?;
        self.serve(listener).await
    }

    /// Serves on an already-bound listener until [`shutdown`](Self::shutdown).
    ///
    /// The sweeper runs for exactly as long as the listener is served.
    pub async fn serve(&self, listener: TcpListener) -> RelayResult<()> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| RelayError::Network(format!("listener has no address: {e}")))?;
        info!("🚀 Command relay listening on http://{}", local_addr);
        info!("📡 Client API available at http://{}/api", local_addr);

        // The flag is latched, so a shutdown requested before this point is
        // still observed.
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let sweeper = ExpirySweeper::spawn(self.service.clone(), &self.config);

        let result = axum::serve(listener, super::router(self.service.clone()))
            .with_graceful_shutdown(async move {
                let _ = shutdown_receiver.wait_for(|stop| *stop).await;
            })
            .await
            .map_err(|e| RelayError::Network(format!("server error: {e}")));

        sweeper.stop().await;
        info!("✅ Command relay stopped");
        result
    }

    /// Signals the server to stop accepting requests and drain.
    ///
    /// The request is latched: calling this before [`start`](Self::start)
    /// or [`serve`](Self::serve) has subscribed makes them return as soon as
    /// they begin serving.
    pub async fn shutdown(&self) -> RelayResult<()> {
        info!("🛑 Shutting down command relay...");
        self.shutdown_sender.send_replace(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_serves_health_and_shuts_down() {
        let server = Arc::new(RelayServer::new(RelayConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let running = {
            let server = server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"status\":\"ok\""));

        server.shutdown().await.unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("server should stop after shutdown")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_before_serve_is_not_lost() {
        let server = RelayServer::new(RelayConfig::default());
        server.shutdown().await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), server.serve(listener))
            .await
            .expect("serve should return at once after an earlier shutdown");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bind_failure_is_network_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = RelayConfig {
            bind_address: taken.local_addr().unwrap(),
            ..RelayConfig::default()
        };

        let err = RelayServer::new(config).start().await.unwrap_err();
        assert!(matches!(err, RelayError::Network(_)));
    }
}

//! Server startup and binding
//!
//! Starts the Axum server together with the event consumer and shuts both down in order:
//! stop accepting requests, close the event channel, let the consumer drain it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use lending_outputs::events::EventConsumer;
use tokio::net::TcpListener;

use crate::app::Application;
use crate::config::{ConfigError, ServerConfig};
use crate::routes::{self, AppState};

/// Server instance that can be started
pub struct Server {
    /// Server configuration
    config: Arc<ServerConfig>,
    /// Engine and collaborators
    app: Application,
    /// The built router
    router: Router,
}

impl Server {
    /// Create a new server instance with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let config = Arc::new(config);
        let app = Application::wire(&config);
        let router = routes::build_router(AppState::new(config.clone(), app.engine.clone()));

        Self {
            config,
            app,
            router,
        }
    }

    /// Get the socket address the server will bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.config.socket_addr()
    }

    /// Get the configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Engine and collaborators behind the routes
    pub fn application(&self) -> &Application {
        &self.app
    }

    /// Bind to the configured host/port and serve until Ctrl-C
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = self
            .socket_addr()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Run the server with a specific listener until Ctrl-C
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then drain the event consumer
    pub async fn serve<F>(mut self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let consumer = self.app.take_consumer().map(EventConsumer::spawn);
        tracing::info!("Server listening on {}", addr);

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;

        tracing::info!("Server stopped accepting requests, draining events");
        self.app.channel.close();
        if let Some(consumer) = consumer {
            let timeout = Duration::from_secs(self.config.shutdown_timeout_secs);
            match tokio::time::timeout(timeout, consumer).await {
                Ok(Ok(stats)) => tracing::info!(
                    processed = stats.processed(),
                    malformed = stats.malformed,
                    "Event consumer drained"
                ),
                Ok(Err(e)) => tracing::error!(error = %e, "Event consumer task failed"),
                Err(_) => tracing::warn!(
                    timeout_secs = self.config.shutdown_timeout_secs,
                    "Event consumer did not drain in time"
                ),
            }
        }

        served
    }

    /// Create a test server and return the bound address
    ///
    /// Binds to port 0, serves in a background task and returns the bound address.
    #[cfg(test)]
    pub async fn spawn_test_server(config: ServerConfig) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Self::new(config);
        let handle = tokio::spawn(async move {
            server.serve(listener, std::future::pending()).await.ok();
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        (addr, handle)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

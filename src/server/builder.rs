//! ServerBuilder for fluent API to build the HTTP server

use super::exposure::RestExposure;
use super::state::AppState;
use crate::lifecycle::Services;
use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for the REST application
///
/// # Example
///
/// ```ignore
/// let services = Services::new(Store::in_memory(), &AppConfig::default());
/// ServerBuilder::new()
///     .with_services(services)
///     .serve("127.0.0.1:3000")
///     .await?;
/// ```
pub struct ServerBuilder {
    services: Option<Services>,
    custom_routes: Vec<Router<AppState>>,
    permissive_cors: bool,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            services: None,
            custom_routes: Vec::new(),
            permissive_cors: true,
        }
    }

    /// Set the lifecycle services (required)
    pub fn with_services(mut self, services: Services) -> Self {
        self.services = Some(services);
        self
    }

    /// Add routes that are not part of the resource API
    pub fn with_custom_routes(mut self, routes: Router<AppState>) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Drop the permissive CORS layer, for deployments behind a gateway
    /// that handles CORS itself
    pub fn without_cors(mut self) -> Self {
        self.permissive_cors = false;
        self
    }

    /// Build the router with tracing (and CORS unless disabled)
    pub fn build(self) -> Result<Router> {
        let services = self
            .services
            .ok_or_else(|| anyhow::anyhow!("Services are required. Call .with_services()"))?;

        let mut app = RestExposure::build_router(AppState::new(services), self.custom_routes);
        if self.permissive_cors {
            app = app.layer(CorsLayer::permissive());
        }
        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// Serve until SIGTERM or Ctrl+C, then drain in-flight requests
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

//! Auth API Server

use super::{api::AuthApi, handlers::AppState};
use crate::Result;
use anyhow::Context;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// HTTP server hosting the auth API
pub struct AuthServer {
    bind_addr: SocketAddr,
    app_state: AppState,
}

impl AuthServer {
    pub fn new(bind_addr: SocketAddr, app_state: AppState) -> Self {
        Self {
            bind_addr,
            app_state,
        }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting auth API server on {}", self.bind_addr);

        let app = AuthApi::create_router(self.app_state);

        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind auth API server to {}", self.bind_addr))?;

        info!("Auth API server listening on {}", self.bind_addr);

        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        {
            error!("Auth API server error: {}", e);
            return Err(e.into());
        }

        info!("Auth API server stopped");
        Ok(())
    }

    /// Create a router for testing
    pub fn create_test_router(&self) -> Router {
        AuthApi::create_router(self.app_state.clone())
    }
}

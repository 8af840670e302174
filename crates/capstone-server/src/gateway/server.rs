use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use capstone_core::config::{AuthConfig, ServerConfig};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use super::auth::{auth_middleware, TokenValidator};
use super::blobs::{get_blob, put_blob};
use super::call::{call_handler, call_operation_handler, CallHandler};
use super::trace::trace_middleware;
use crate::context::AppState;
use crate::registry::OperationRegistry;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Gateway HTTP server.
pub struct GatewayServer {
    server_config: ServerConfig,
    auth_config: AuthConfig,
    registry: OperationRegistry,
    state: Arc<AppState>,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(
        server_config: ServerConfig,
        auth_config: AuthConfig,
        registry: OperationRegistry,
        state: Arc<AppState>,
    ) -> Self {
        Self {
            server_config,
            auth_config,
            registry,
            state,
        }
    }

    /// Build the axum router.
    pub fn router(&self) -> Router {
        let call_state = Arc::new(CallHandler::new(self.registry.clone(), self.state.clone()));
        let validator = Arc::new(TokenValidator::new(self.auth_config.clone()));

        let cors = if self.server_config.cors_enabled {
            if self.server_config.cors_origins.contains(&"*".to_string()) {
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
            } else {
                let origins: Vec<_> = self
                    .server_config
                    .cors_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect();
                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        } else {
            CorsLayer::new()
        };

        Router::new()
            // Health check endpoint
            .route("/health", get(health_handler))
            // Direct blob upload/download via signed URLs
            .route(
                "/blobs/{*path}",
                put(put_blob).get(get_blob).with_state(self.state.clone()),
            )
            // Operation endpoints
            .route("/call", post(call_handler))
            .route("/call/{operation}", post(call_operation_handler))
            .with_state(call_state)
            .layer(
                ServiceBuilder::new()
                    .layer(cors)
                    .layer(middleware::from_fn_with_state(validator, auth_middleware))
                    .layer(middleware::from_fn(trace_middleware)),
            )
    }

    /// The socket address to bind to.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.server_config.port))
    }

    /// Run the server (blocking).
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = self.addr();
        let router = self.router();

        tracing::info!("Gateway server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await
    }
}

/// Health check handler.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

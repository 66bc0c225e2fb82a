//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::routes::{
    case_execution, case_instance, execution, health, message, process_instance, task,
};
use crate::core::CoreApp;
use crate::engine::ProcessEngine;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        // Clone shutdown before moving app
        let shutdown = app.shutdown.clone();

        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let engine = app.engine.clone();

        let router = build_router(engine);

        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "API server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}

/// Build the full application router against an engine.
pub fn build_router(engine: Arc<dyn ProcessEngine>) -> Router<()> {
    Router::new()
        .route("/health", get(health::health))
        .nest("/process-instance", process_instance::routes(engine.clone()))
        .nest("/execution", execution::routes(engine.clone()))
        .nest("/case-instance", case_instance::routes(engine.clone()))
        .nest("/case-execution", case_execution::routes(engine.clone()))
        .nest("/message", message::routes(engine.clone()))
        .nest("/task", task::routes(engine))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

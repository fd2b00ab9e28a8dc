//! HTTP server: axum router over the task store.
//!
//! Endpoints:
//!   GET    /                       (single-page client)
//!   GET    /api/health
//!   GET    /api/tasks
//!   POST   /api/tasks
//!   GET    /api/tasks/stats
//!   GET    /api/tasks/{id}
//!   PUT    /api/tasks/{id}
//!   PATCH  /api/tasks/{id}/toggle
//!   DELETE /api/tasks/{id}

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{
    response::Html,
    routing::{get, patch},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

/// The embedded single-page client, served at `/`.
const INDEX_HTML: &str = include_str!("../../client/index.html");

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(routes::health::health))
        .route(
            "/api/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/api/tasks/stats", get(routes::tasks::task_stats))
        .route(
            "/api/tasks/{id}",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/api/tasks/{id}/toggle", patch(routes::tasks::toggle_task))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Serve the API on an already-bound listener. Split out from
/// [`start_server`] so tests can bind port 0 and learn the real address.
pub async fn serve(listener: TcpListener, ctx: Arc<AppContext>) -> Result<()> {
    let router = build_router(ctx);
    axum::serve(listener, router).await?;
    Ok(())
}

pub async fn start_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("taskd listening on http://{}", addr);
    serve(listener, ctx).await
}

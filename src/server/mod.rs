use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::query::QueryEngine;
use crate::ui::Icons;

pub mod routes;

/// Server state
pub struct AppState {
    pub engine: QueryEngine,
}

pub fn router(engine: QueryEngine) -> Router {
    let state = Arc::new(AppState { engine });

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/stats", get(routes::get_stats))
        .route("/api/domains", get(routes::list_domains))
        .route("/api/domains/{key}", get(routes::get_domain))
        .route("/api/inventions", get(routes::list_inventions))
        .route("/api/inventions/{domain}/{id}", get(routes::get_invention))
        .route("/api/search", get(routes::search))
        .route("/api/generate", post(routes::generate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn start_server<F>(port: u16, engine: QueryEngine, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = router(engine);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    println!("{} Server running at http://{}", Icons::GLOBE, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

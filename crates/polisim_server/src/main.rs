use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use polisim_core::cache::CacheLayer;
use polisim_core::country::CountryRegistry;

mod error;
mod handlers;
mod store;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the cache layer from the environment. The debug flag forces
/// every request to recompute; a store that fails to open degrades to
/// the same behavior rather than blocking startup.
fn build_cache() -> CacheLayer {
    let debug_mode = std::env::var("POLISIM_DEBUG").is_ok_and(|v| !v.is_empty());
    if debug_mode {
        tracing::info!("debug mode: response cache disabled");
        return CacheLayer::disabled(VERSION);
    }
    let path = std::env::var("POLISIM_CACHE_DB").unwrap_or_else(|_| "polisim-cache.db".to_string());
    match store::SqliteStore::open(&path) {
        Ok(store) => CacheLayer::new(Box::new(store), VERSION),
        Err(e) => {
            tracing::warn!(path, error = %e, "cache store unavailable, recomputing everything");
            CacheLayer::disabled(VERSION)
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    tracing::info!("initialising countries");
    let registry = CountryRegistry::bundled(build_cache()).expect("failed to build baselines");
    let countries: Vec<&str> = registry.country_names().collect();
    tracing::info!(?countries, version = VERSION, "initialisation complete");

    let app = Router::new()
        .route("/", get(|| async { "PoliSim API Server" }))
        .route(
            "/{country}/api/{endpoint}",
            get(handlers::dispatch).post(handlers::dispatch),
        )
        .with_state(Arc::new(registry))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("failed to bind");
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}

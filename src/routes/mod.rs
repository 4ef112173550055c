//! Router de la API
//!
//! Monta los routers de viajes y kilometraje con las capas comunes
//! (trazas, compresión, límite de concurrencia y CORS).

pub mod mileage_routes;
pub mod trip_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::middleware::cors::cors_middleware;
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = cors_middleware(&state.config.cors_origins);
    let max_concurrent = state.config.max_concurrent_requests;

    Router::new()
        .route("/health", get(health))
        .nest("/api/trips", trip_routes::create_trip_router())
        .nest("/api/vehicles", mileage_routes::create_mileage_router())
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

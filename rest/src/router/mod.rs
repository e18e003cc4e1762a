mod annotations;
mod backfill;
mod backup;
mod coach;
mod import;
mod settings;
mod trades;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    decompression::RequestDecompressionLayer,
};

use crate::AppState;

/// Broker exports and backups can be several megabytes.
const BODY_LIMIT: usize = 32 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let router = Router::new()
        .merge(trades::create_router())
        .merge(import::create_router())
        .merge(backfill::create_router())
        .merge(coach::create_router())
        .merge(settings::create_router())
        .merge(annotations::create_router())
        .nest("/backup", backup::create_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(cors);

    return router;
}

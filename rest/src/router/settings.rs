use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{error::AppError, AppState};

pub fn create_router() -> Router<AppState> {
    let router = Router::new()
        .route(
            "/settings/symbol-map",
            get(get_symbol_map).put(put_symbol_map),
        )
        .route("/symbols/:symbol/resolve", get(resolve_symbol));

    return router;
}

async fn get_symbol_map(
    State(state): State<AppState>,
) -> Result<Json<HashMap<String, String>>, AppError> {
    return Ok(Json(state.settings.symbol_map().await?));
}

async fn put_symbol_map(
    State(state): State<AppState>,
    Json(symbol_map): Json<HashMap<String, String>>,
) -> Result<Json<HashMap<String, String>>, AppError> {
    let symbol_map: HashMap<String, String> = symbol_map
        .into_iter()
        .map(|(k, v)| (k.trim().to_uppercase(), v.trim().to_owned()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect();
    state.settings.set_symbol_map(&symbol_map).await?;
    return Ok(Json(symbol_map));
}

#[derive(Debug, Serialize)]
struct Resolved {
    symbol: String,
    resolved: String,
}

async fn resolve_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Resolved>, AppError> {
    let resolved = state.backfill.symbol_mapper().await?.resolve(&symbol);
    return Ok(Json(Resolved { symbol, resolved }));
}

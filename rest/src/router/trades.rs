use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use models::{KlineData, ManualTrade, Trade};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, AppState};

pub fn create_router() -> Router<AppState> {
    let router = Router::new()
        .route("/trades", get(list_trades).post(create_trade))
        .route("/trades/delete", post(delete_trades))
        .route("/trades/:trade_id", get(get_trade).delete(delete_trade))
        .route("/trades/:trade_id/klines", get(get_klines));

    return router;
}

async fn list_trades(State(state): State<AppState>) -> Result<Json<Vec<Trade>>, AppError> {
    return Ok(Json(state.trades.list().await?));
}

async fn create_trade(
    State(state): State<AppState>,
    Json(form): Json<ManualTrade>,
) -> Result<(StatusCode, Json<Trade>), AppError> {
    let trade = form.into_trade()?;
    state.trades.upsert(&trade).await?;
    tracing::info!("Created manual trade {}", trade.trade_id());
    return Ok((StatusCode::CREATED, Json(trade)));
}

async fn get_trade(
    State(state): State<AppState>,
    Path(trade_id): Path<String>,
) -> Result<Json<Trade>, AppError> {
    return Ok(Json(state.trades.require(&trade_id).await?));
}

async fn delete_trade(
    State(state): State<AppState>,
    Path(trade_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.trades.delete(&trade_id).await?;
    return Ok(StatusCode::NO_CONTENT);
}

#[derive(Debug, Deserialize)]
struct DeleteTrades {
    ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Deleted {
    deleted: usize,
}

async fn delete_trades(
    State(state): State<AppState>,
    Json(body): Json<DeleteTrades>,
) -> Result<Json<Deleted>, AppError> {
    let deleted = state.trades.delete_many(&body.ids).await?;
    return Ok(Json(Deleted { deleted }));
}

#[derive(Debug, Deserialize)]
struct KlinesParams {
    #[serde(default)]
    refresh: bool,
}

async fn get_klines(
    State(state): State<AppState>,
    Path(trade_id): Path<String>,
    Query(params): Query<KlinesParams>,
) -> Result<Json<KlineData>, AppError> {
    let kline_data = state.backfill.klines(&trade_id, params.refresh).await?;
    return Ok(Json(kline_data));
}

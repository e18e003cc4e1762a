use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use journal::import::{self, ImportOutcome, ImportWarning};
use models::Cost;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, AppState};

use super::backfill::spawn_batch;

pub fn create_router() -> Router<AppState> {
    let router = Router::new()
        .route("/import", post(import_trades))
        .route("/import/costs", post(import_costs));

    return router;
}

#[derive(Debug, Deserialize)]
struct ImportParams {
    #[serde(default)]
    backfill: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    imported: usize,
    trade_ids: Vec<String>,
    warnings: Vec<ImportWarning>,
    backfill_started: bool,
}

async fn import_trades(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    body: String,
) -> Result<Json<ImportResponse>, AppError> {
    let outcome = import::parse_trades(&body)?;
    let trade_ids = import::store_trades(&state.trades, outcome.records).await?;
    tracing::info!(
        "Imported {} trades with {} warnings",
        trade_ids.len(),
        outcome.warnings.len()
    );

    let backfill_started = params.backfill && !trade_ids.is_empty();
    if backfill_started {
        spawn_batch(state.clone(), trade_ids.clone(), false);
    }
    return Ok(Json(ImportResponse {
        imported: trade_ids.len(),
        trade_ids,
        warnings: outcome.warnings,
        backfill_started,
    }));
}

async fn import_costs(body: String) -> Result<Json<ImportOutcome<Cost>>, AppError> {
    return Ok(Json(import::parse_costs(&body)?));
}

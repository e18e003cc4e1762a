use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use base64::Engine;
use journal::coach::{CoachService, PerformanceCoaching};
use models::AiCoach;
use provider_api::RestClient;
use serde::Deserialize;

use crate::{error::AppError, AppState};

pub fn create_router() -> Router<AppState> {
    let router = Router::new()
        .route("/trades/:trade_id/coach", post(coach_trade))
        .route("/coach/performance", post(coach_performance));

    return router;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoachRequest {
    /// Base64 PNG, optionally as a `data:image/png;base64,` URL.
    chart_png: Option<String>,
}

fn coach(state: &AppState) -> Result<Arc<CoachService<RestClient>>, AppError> {
    return state
        .coach
        .clone()
        .ok_or_else(|| AppError::Unavailable("GEMINI_API_KEY is not configured".to_owned()));
}

fn decode_chart(chart_png: &str) -> Result<Vec<u8>, AppError> {
    let data = chart_png
        .split_once("base64,")
        .map(|(_, x)| x)
        .unwrap_or(chart_png);
    return base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|err| AppError::BadRequest(format!("chartPng is not valid base64: {err}")));
}

async fn coach_trade(
    State(state): State<AppState>,
    Path(trade_id): Path<String>,
    body: Option<Json<CoachRequest>>,
) -> Result<Json<AiCoach>, AppError> {
    let coach = coach(&state)?;
    let request = body.map(|Json(x)| x).unwrap_or_default();
    let chart_png = match request.chart_png.as_deref() {
        Some(x) => Some(decode_chart(x)?),
        None => None,
    };
    let ai_coach = coach.coach_trade(&trade_id, chart_png.as_deref()).await?;
    return Ok(Json(ai_coach));
}

async fn coach_performance(
    State(state): State<AppState>,
) -> Result<Json<PerformanceCoaching>, AppError> {
    let coach = coach(&state)?;
    return Ok(Json(coach.coach_performance().await?));
}

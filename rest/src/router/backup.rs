use axum::{extract::State, routing::get, Json, Router};
use journal::backup::RestoreSummary;
use models::Backup;

use crate::{error::AppError, AppState};

/// Gzip in both directions is handled by the compression layers.
pub fn create_router() -> Router<AppState> {
    let router = Router::new().route("/", get(export_backup).post(restore_backup));

    return router;
}

async fn export_backup(State(state): State<AppState>) -> Result<Json<Backup>, AppError> {
    return Ok(Json(state.backup.export().await?));
}

async fn restore_backup(
    State(state): State<AppState>,
    Json(backup): Json<Backup>,
) -> Result<Json<RestoreSummary>, AppError> {
    return Ok(Json(state.backup.restore(backup).await?));
}

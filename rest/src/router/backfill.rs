use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response as AxumResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use journal::batch::{BatchBackfill, BatchReport};
use serde::Deserialize;
use tokio::sync::{broadcast::Receiver, Mutex};

use crate::{error::AppError, AppState, WsBroadcastMessage};

pub fn create_router() -> Router<AppState> {
    let router = Router::new()
        .route("/backfill", post(backfill))
        .route("/backfill/ws", get(ws_handler));

    return router;
}

/// Runs the batch driver and broadcasts progress to websocket clients.
pub async fn run_batch(state: AppState, trade_ids: Vec<String>, force: bool) -> BatchReport {
    let broadcast_tx = state.broadcast_tx.lock().await.clone();
    let publish = |msg: WsBroadcastMessage| match serde_json::to_string(&msg) {
        // No subscribers is not an error.
        Ok(x) => {
            let _ = broadcast_tx.send(Message::Text(x));
        }
        Err(err) => tracing::error!("Serializing {msg:?}: {err:#}"),
    };

    let driver = BatchBackfill::new(Arc::new(state.backfill.clone())).with_force(force);
    let report = driver
        .run(&trade_ids, |progress| {
            publish(WsBroadcastMessage::BackfillProgress(progress))
        })
        .await;
    publish(WsBroadcastMessage::BackfillDone(report.clone()));
    return report;
}

pub fn spawn_batch(state: AppState, trade_ids: Vec<String>, force: bool) {
    tokio::spawn(async move {
        run_batch(state, trade_ids, force).await;
    });
}

#[derive(Debug, Default, Deserialize)]
struct BackfillRequest {
    /// Every stored trade when absent.
    ids: Option<Vec<String>>,
    #[serde(default)]
    force: bool,
}

async fn backfill(
    State(state): State<AppState>,
    body: Option<Json<BackfillRequest>>,
) -> Result<Json<BatchReport>, AppError> {
    let request = body.map(|Json(x)| x).unwrap_or_default();
    let trade_ids = match request.ids {
        Some(x) => x,
        None => state.trades.ids().await?,
    };
    return Ok(Json(run_batch(state, trade_ids, request.force).await));
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> AxumResponse {
    return ws.on_upgrade(|websocket| handle_socket(websocket, state));
}

async fn handle_socket(ws: WebSocket, state: AppState) {
    let (ws_tx, _) = ws.split();
    let ws_tx = Arc::new(Mutex::new(ws_tx));

    let broadcast_rx = state.broadcast_tx.lock().await.subscribe();
    tokio::spawn(async move {
        if let Err(err) = recv_broadcast(ws_tx, broadcast_rx).await {
            tracing::debug!("Backfill progress socket closed: {err:#}");
        }
    });
}

async fn recv_broadcast(
    client_tx: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    mut broadcast_rx: Receiver<Message>,
) -> anyhow::Result<()> {
    loop {
        let msg = broadcast_rx.recv().await?;
        client_tx
            .lock()
            .await
            .send(msg)
            .await
            .context("Send Msg to ws client")?;
    }
}

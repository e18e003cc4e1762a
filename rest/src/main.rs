mod config;
mod error;
mod router;

use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::Message;
use journal::{
    backfill::{BackfillService, Backfiller, ChartSource},
    backup::BackupService,
    batch::{BackfillProgress, BatchReport},
    coach::CoachService,
    repository::{AnnotationRepository, SettingsRepository, TradeRepository},
    store::{redis::init_redis_pool, KvStore, MemoryStore, RedisStore},
    symbols,
};
use models::{Note, Setup, Tag};
use provider_api::RestClient;
use serde::Serialize;
use tokio::sync::{
    broadcast::{self, Sender},
    Mutex,
};
use tracing::{info, warn};

use crate::config::{Config, StoreKind};

#[derive(Clone)]
pub struct AppState {
    trades: TradeRepository,
    settings: SettingsRepository,
    notes: AnnotationRepository<Note>,
    setups: AnnotationRepository<Setup>,
    tags: AnnotationRepository<Tag>,
    backfill: BackfillService,
    coach: Option<Arc<CoachService<RestClient>>>,
    backup: BackupService,
    broadcast_tx: Arc<Mutex<Sender<Message>>>,
}

#[derive(Debug, Serialize)]
pub enum WsBroadcastMessage {
    BackfillProgress(BackfillProgress),
    BackfillDone(BatchReport),
}

fn init_store(config: &Config) -> anyhow::Result<Arc<dyn KvStore>> {
    return match config.store {
        StoreKind::Redis => {
            let redis_url = config.redis_url.as_deref().context("REDIS_URL from .env file")?;
            let redis_pool = init_redis_pool(redis_url)?;
            let store: Arc<dyn KvStore> = Arc::new(RedisStore::new(redis_pool));
            Ok(store)
        }
        StoreKind::Memory => {
            warn!("Using the in-memory store, nothing will be persisted");
            let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
            Ok(store)
        }
    };
}

fn init_state(config: &Config) -> anyhow::Result<AppState> {
    let store = init_store(config)?;
    let trades = TradeRepository::new(store.clone());
    let settings = SettingsRepository::new(store.clone());

    let chart_client =
        RestClient::new(&config.market_data_url).context("MARKET_DATA_URL from .env file")?;
    let backfiller = Backfiller::new(Arc::new(ChartSource::new(chart_client)));
    let backfill = BackfillService::new(
        trades.clone(),
        settings.clone(),
        backfiller,
        symbols::env_overrides(),
    );

    let coach = match config.gemini_api_key.as_ref() {
        Some(api_key) => {
            let client =
                RestClient::new(&config.gemini_url).context("GEMINI_URL from .env file")?;
            Some(Arc::new(CoachService::new(
                trades.clone(),
                client,
                config.gemini_model.clone(),
                api_key.clone(),
            )))
        }
        None => {
            warn!("GEMINI_API_KEY not set, coaching endpoints are disabled");
            None
        }
    };
    let (broadcast_tx, _broadcast_rx) = broadcast::channel(200);

    return Ok(AppState {
        trades,
        settings,
        notes: AnnotationRepository::new(store.clone()),
        setups: AnnotationRepository::new(store.clone()),
        tags: AnnotationRepository::new(store.clone()),
        backfill,
        coach,
        backup: BackupService::new(store),
        broadcast_tx: Arc::new(Mutex::new(broadcast_tx)),
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    if let Err(err) = dotenvy::dotenv() {
        info!("No .env file loaded: {err:#}");
    }
    let config = Config::from_env()?;
    let state = init_state(&config)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context(format!("Binding {}", config.bind_addr))?;
    info!("listening on {}", config.bind_addr);
    let app = router::create_router(state);
    axum::serve(listener, app).await.context("Serving http")?;
    return Ok(());
}

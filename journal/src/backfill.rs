use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use models::{KlineData, Trade};
use provider_api::rest::client::Client;
use serde::Serialize;
use tracing::{info, warn};
use types::Interval;

use crate::{
    error::Error,
    repository::{SettingsRepository, TradeRepository},
    symbols::SymbolMapper,
    window::{select_window, FetchWindow, DAY, HOUR},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Primary,
    BroadMinute,
    FiveMinute,
    FifteenMinute,
    Daily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub stage: Stage,
    pub window: FetchWindow,
}

/// Ordered fetch attempts for a trade. Each fallback widens the window or
/// coarsens the interval; intraday retries are skipped when the primary tier
/// is already coarser than they are.
pub fn cascade_plan(entry: i64, exit: i64, now: i64) -> Vec<Attempt> {
    let primary = select_window(entry, exit, now);
    let original = primary.interval;
    let mut plan = vec![Attempt {
        stage: Stage::Primary,
        window: primary,
    }];

    if original == Interval::OneMinute {
        plan.push(Attempt {
            stage: Stage::BroadMinute,
            window: FetchWindow::new(
                Interval::OneMinute,
                (now - 7 * DAY).max(exit - 2 * DAY),
                now.min(exit + 4 * HOUR),
            ),
        });
        plan.push(Attempt {
            stage: Stage::FiveMinute,
            window: FetchWindow::new(
                Interval::FiveMinutes,
                entry - 24 * HOUR,
                now.min(exit + 4 * HOUR),
            ),
        });
    }
    if matches!(original, Interval::OneMinute | Interval::FiveMinutes) {
        plan.push(Attempt {
            stage: Stage::FifteenMinute,
            window: FetchWindow::new(
                Interval::FifteenMinutes,
                entry - 48 * HOUR,
                now.min(exit + 6 * HOUR),
            ),
        });
    }
    let intraday = plan.last().is_some_and(|x| x.window.interval.is_intraday());
    if intraday {
        plan.push(Attempt {
            stage: Stage::Daily,
            window: FetchWindow::new(
                Interval::OneDay,
                entry - 30 * DAY,
                now.min(exit + 15 * DAY),
            ),
        });
    }
    return plan;
}

#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch(&self, symbol: &str, window: &FetchWindow)
        -> Result<KlineData, provider_api::Error>;
}

/// Candle source backed by the chart endpoint.
pub struct ChartSource<C> {
    client: C,
}

impl<C: Client + Send + Sync> ChartSource<C> {
    pub fn new(client: C) -> Self {
        return Self { client };
    }
}

#[async_trait]
impl<C: Client + Send + Sync> CandleSource for ChartSource<C> {
    async fn fetch(
        &self,
        symbol: &str,
        window: &FetchWindow,
    ) -> Result<KlineData, provider_api::Error> {
        let candles = provider_api::fetch_candles(
            &self.client,
            symbol,
            window.interval,
            window.period_start,
            window.period_end,
        )
        .await?;
        return Ok(KlineData::new(symbol, window.interval, candles));
    }
}

/// Runs the cascade for one trade against a candle source.
#[derive(Clone)]
pub struct Backfiller {
    source: Arc<dyn CandleSource>,
}

impl Backfiller {
    pub fn new(source: Arc<dyn CandleSource>) -> Self {
        return Self { source };
    }

    /// Failures before the last attempt are logged and swallowed; the last
    /// attempt's error is returned.
    pub async fn backfill_at(
        &self,
        symbol: &str,
        trade: &Trade,
        now: i64,
    ) -> Result<KlineData, Error> {
        let plan = cascade_plan(
            trade.entry_timestamp().timestamp(),
            trade.exit_timestamp().timestamp(),
            now,
        );
        let (last, fallbacks) = plan
            .split_last()
            .ok_or_else(|| anyhow::anyhow!("Empty cascade plan for {}", trade.trade_id()))?;

        for attempt in fallbacks {
            match self.source.fetch(symbol, &attempt.window).await {
                Ok(x) => {
                    info!(
                        "Backfilled {} ({symbol}) at {} via {:?}",
                        trade.trade_id(),
                        attempt.window.interval,
                        attempt.stage
                    );
                    return Ok(x);
                }
                Err(err) => warn!(
                    "{:?} fetch for {} ({symbol}) failed, trying next stage: {err:#}",
                    attempt.stage,
                    trade.trade_id()
                ),
            }
        }
        let res = self.source.fetch(symbol, &last.window).await?;
        info!(
            "Backfilled {} ({symbol}) at {} via {:?}",
            trade.trade_id(),
            last.window.interval,
            last.stage
        );
        return Ok(res);
    }

    pub async fn backfill(&self, symbol: &str, trade: &Trade) -> Result<KlineData, Error> {
        return self
            .backfill_at(symbol, trade, chrono::Utc::now().timestamp())
            .await;
    }
}

/// Trade-level backfill: load, resolve the provider symbol, fetch, cache.
#[derive(Clone)]
pub struct BackfillService {
    trades: TradeRepository,
    settings: SettingsRepository,
    backfiller: Backfiller,
    env_overrides: Arc<HashMap<String, String>>,
}

impl BackfillService {
    pub fn new(
        trades: TradeRepository,
        settings: SettingsRepository,
        backfiller: Backfiller,
        env_overrides: HashMap<String, String>,
    ) -> Self {
        return Self {
            trades,
            settings,
            backfiller,
            env_overrides: Arc::new(env_overrides),
        };
    }

    pub async fn symbol_mapper(&self) -> Result<SymbolMapper, Error> {
        let user = self.settings.symbol_map().await?;
        return Ok(SymbolMapper::new(user, self.env_overrides.as_ref().clone()));
    }

    /// Cached candles unless `force` is set or nothing is cached yet.
    pub async fn klines(&self, trade_id: &str, force: bool) -> Result<KlineData, Error> {
        let mut trade = self.trades.require(trade_id).await?;
        if !force {
            if let Some(x) = trade.kline_data().as_ref().filter(|x| !x.is_empty()) {
                return Ok(x.clone());
            }
        }
        let symbol = self.symbol_mapper().await?.resolve(trade.symbol());
        let kline_data = self.backfiller.backfill(&symbol, &trade).await?;

        trade.set_kline_data(kline_data.clone());
        self.trades.upsert(&trade).await?;
        return Ok(kline_data);
    }
}

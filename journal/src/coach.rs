use models::{AiCoach, Side, Trade};
use provider_api::{grading, rest::client::Client};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::{error::Error, repository::TradeRepository};

pub const PROVIDER: &str = "gemini";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const TRADE_INSTRUCTIONS: &str = "You are a trading coach reviewing one closed futures trade. \
Comment on entry timing, exit management and risk. Keep it under 200 words. \
Finish with a line 'Rating: X/5' and a line 'Grade: <A-F>'.";

const PERFORMANCE_INSTRUCTIONS: &str = "You are a trading coach reviewing a trader's journal \
statistics. Point out the strongest and weakest aspects and give three concrete improvements. \
Finish with a line 'Rating: X/5' and a line 'Grade: <A-F>'.";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStats {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percentage, 0-100.
    pub win_rate: Decimal,
    pub total_pnl: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    /// Gross profit over gross loss; absent without losing trades.
    pub profit_factor: Option<Decimal>,
    pub best_trade: Decimal,
    pub worst_trade: Decimal,
}

impl PerformanceStats {
    /// Uses net PnL (after commissions).
    pub fn from_trades(trades: &[Trade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }
        let pnls: Vec<Decimal> = trades.iter().map(Trade::net_pnl).collect();
        let gross_profit: Decimal = pnls.iter().filter(|x| **x > Decimal::ZERO).sum();
        let gross_loss: Decimal = pnls.iter().filter(|x| **x < Decimal::ZERO).sum();
        let wins = pnls.iter().filter(|x| **x > Decimal::ZERO).count();
        let losses = pnls.iter().filter(|x| **x < Decimal::ZERO).count();

        let average = |total: Decimal, count: usize| {
            if count == 0 {
                return Decimal::ZERO;
            }
            return (total / Decimal::from(count)).round_dp(2);
        };
        let profit_factor = if gross_loss.is_zero() {
            None
        } else {
            Some((gross_profit / gross_loss.abs()).round_dp(2))
        };

        return Self {
            trades: trades.len(),
            wins,
            losses,
            win_rate: (Decimal::from(wins * 100) / Decimal::from(trades.len())).round_dp(1),
            total_pnl: pnls.iter().sum(),
            average_win: average(gross_profit, wins),
            average_loss: average(gross_loss, losses),
            profit_factor,
            best_trade: pnls.iter().copied().max().unwrap_or_default(),
            worst_trade: pnls.iter().copied().min().unwrap_or_default(),
        };
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceCoaching {
    pub stats: PerformanceStats,
    pub advice: String,
    pub rating: Option<f32>,
    pub grade: Option<String>,
}

pub fn trade_prompt(trade: &Trade) -> String {
    let side = match trade.side() {
        Some(Side::Long) => "LONG",
        Some(Side::Short) => "SHORT",
        None if trade.quantity().is_sign_negative() => "SHORT",
        None => "LONG",
    };
    let mut lines = vec![
        format!("{TRADE_INSTRUCTIONS}\n"),
        format!("Symbol: {}", trade.symbol()),
        format!("Side: {side}"),
        format!("Quantity: {}", trade.quantity().abs()),
        format!(
            "Entry: {} at {}",
            trade.entry_price(),
            trade.entry_timestamp().to_rfc3339()
        ),
        format!(
            "Exit: {} at {}",
            trade.exit_price(),
            trade.exit_timestamp().to_rfc3339()
        ),
        format!("Duration: {} minutes", trade.duration_seconds() / 60),
        format!(
            "PnL: {} {} (commissions {})",
            trade.pnl(),
            trade.currency(),
            trade.non_pnl_costs()
        ),
    ];
    if let Some(x) = trade.stop_loss() {
        lines.push(format!("Stop loss: {x}"));
    }
    if let Some(x) = trade.profit_target() {
        lines.push(format!("Profit target: {x}"));
    }

    if let Some(kline_data) = trade.kline_data() {
        let entry = trade.entry_timestamp().timestamp();
        let exit = trade.exit_timestamp().timestamp();
        let during: Vec<_> = kline_data
            .candles()
            .iter()
            .filter(|x| x.time >= entry && x.time <= exit)
            .collect();
        let high = during.iter().map(|x| x.high).fold(f64::NAN, f64::max);
        let low = during.iter().map(|x| x.low).fold(f64::NAN, f64::min);
        if !during.is_empty() {
            lines.push(format!(
                "Market during the trade ({} candles at {}): high {high}, low {low}",
                during.len(),
                kline_data.interval()
            ));
        }
    }
    return lines.join("\n") + "\n";
}

pub fn performance_prompt(stats: &PerformanceStats) -> String {
    let profit_factor = match stats.profit_factor {
        Some(x) => x.to_string(),
        None => "n/a (no losing trades)".to_owned(),
    };
    let lines = [
        format!("{PERFORMANCE_INSTRUCTIONS}\n"),
        format!("Trades: {}", stats.trades),
        format!("Wins: {} / Losses: {}", stats.wins, stats.losses),
        format!("Win rate: {}%", stats.win_rate),
        format!("Total net PnL: {}", stats.total_pnl),
        format!("Average win: {}", stats.average_win),
        format!("Average loss: {}", stats.average_loss),
        format!("Profit factor: {profit_factor}"),
        format!("Best trade: {}", stats.best_trade),
        format!("Worst trade: {}", stats.worst_trade),
    ];
    return lines.join("\n") + "\n";
}

pub struct CoachService<C> {
    trades: TradeRepository,
    client: C,
    model: String,
    api_key: String,
}

impl<C: Client + Send + Sync> CoachService<C> {
    pub fn new(trades: TradeRepository, client: C, model: String, api_key: String) -> Self {
        return Self {
            trades,
            client,
            model,
            api_key,
        };
    }

    /// Reviews one trade, optionally with a PNG chart, and stores the advice
    /// on it.
    pub async fn coach_trade(
        &self,
        trade_id: &str,
        chart_png: Option<&[u8]>,
    ) -> Result<AiCoach, Error> {
        let mut trade = self.trades.require(trade_id).await?;
        let advice = provider_api::generate_text(
            &self.client,
            &self.model,
            &self.api_key,
            &trade_prompt(&trade),
            chart_png,
        )
        .await?;
        let assessment = grading::assess(&advice);
        info!(
            "Coached {trade_id}: rating {:?}, grade {:?}",
            assessment.rating, assessment.grade
        );

        let ai_coach = AiCoach::new(
            advice,
            assessment.rating,
            assessment.grade,
            PROVIDER,
            self.model.as_str(),
        );
        trade.set_ai_coach(ai_coach.clone());
        self.trades.upsert(&trade).await?;
        return Ok(ai_coach);
    }

    /// Reviews aggregate statistics over every stored trade. Nothing is
    /// persisted.
    pub async fn coach_performance(&self) -> Result<PerformanceCoaching, Error> {
        let trades = self.trades.list().await?;
        let stats = PerformanceStats::from_trades(&trades);
        let advice = provider_api::generate_text(
            &self.client,
            &self.model,
            &self.api_key,
            &performance_prompt(&stats),
            None,
        )
        .await?;
        let assessment = grading::assess(&advice);

        return Ok(PerformanceCoaching {
            stats,
            advice,
            rating: assessment.rating,
            grade: assessment.grade,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::TimeZone;
    use http::{request, response, StatusCode};
    use models::{Trade, TradeBuilder};
    use provider_api::rest::client::Client;
    use rust_decimal::Decimal;
    use url::Url;

    use super::{performance_prompt, trade_prompt, CoachService, PerformanceStats};
    use crate::{error::Error, repository::TradeRepository, store::MemoryStore};

    struct CannedModel {
        status: StatusCode,
        reply: &'static str,
        requests: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl Client for CannedModel {
        fn url(&self, endpoint: &str) -> Result<Url, provider_api::Error> {
            return Ok(Url::parse("https://model.test/")?.join(endpoint)?);
        }

        async fn exec(
            &self,
            _request: request::Builder,
            body: Vec<u8>,
        ) -> Result<response::Response<Bytes>, provider_api::Error> {
            self.requests
                .lock()
                .unwrap()
                .push(serde_json::from_slice(&body)?);
            return Ok(response::Builder::new()
                .status(self.status)
                .body(Bytes::from_static(self.reply.as_bytes()))?);
        }
    }

    const REPLY: &str = r#"{"candidates":[{"content":{"parts":[
        {"text":"Entry chased the move.\n\nRating: 3.5/5\nGrade: B-"}]}}]}"#;

    fn trade(trade_id: &str, pnl: i64) -> Trade {
        return TradeBuilder::default()
            .trade_id(trade_id)
            .symbol("MESM4")
            .broker("Tradovate")
            .quantity(Decimal::from(-2))
            .pnl(Decimal::from(pnl))
            .non_pnl_costs(Decimal::new(-250, 2))
            .currency("USD")
            .entry_price(Decimal::from(5300))
            .entry_timestamp(chrono::Utc.with_ymd_and_hms(2024, 5, 20, 13, 30, 0).unwrap())
            .exit_price(Decimal::from(5290))
            .exit_timestamp(chrono::Utc.with_ymd_and_hms(2024, 5, 20, 14, 0, 0).unwrap())
            .build()
            .unwrap();
    }

    fn service(status: StatusCode) -> (CoachService<Arc<CannedModel>>, Arc<CannedModel>, TradeRepository) {
        let model = Arc::new(CannedModel {
            status,
            reply: REPLY,
            requests: Mutex::new(Vec::new()),
        });
        let trades = TradeRepository::new(Arc::new(MemoryStore::new()));
        let service = CoachService::new(
            trades.clone(),
            model.clone(),
            "gemini-1.5-flash".to_owned(),
            "key".to_owned(),
        );
        return (service, model, trades);
    }

    #[test]
    fn stats() {
        let trades = vec![trade("a", 100), trade("b", -50), trade("c", 30), trade("d", 0)];
        let stats = PerformanceStats::from_trades(&trades);
        assert_eq!(stats.trades, 4);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 2, "a flat trade loses its commission");
        assert_eq!(stats.win_rate, Decimal::from(50));
        assert_eq!(stats.total_pnl, Decimal::from(70));
        assert_eq!(stats.best_trade, Decimal::new(9750, 2));
        assert_eq!(stats.worst_trade, Decimal::new(-5250, 2));
        assert_eq!(stats.profit_factor, Some(Decimal::new(227, 2)));

        assert_eq!(PerformanceStats::from_trades(&[]), PerformanceStats::default());
    }

    #[test]
    fn prompt_mentions_short_side() {
        let prompt = trade_prompt(&trade("a", -20));
        assert!(prompt.contains("Side: SHORT"));
        assert!(prompt.contains("Quantity: 2"));
        assert!(prompt.contains("Duration: 30 minutes"));
    }

    #[test]
    fn prompts_have_one_fact_per_line() {
        let prompt = trade_prompt(&trade("a", -20));
        assert!(prompt.contains("'Grade: <A-F>'.\n\nSymbol: MESM4\nSide: SHORT\n"));
        assert!(prompt.ends_with("(commissions -2.50)\n"));

        let winners = PerformanceStats::from_trades(&[trade("a", 100)]);
        let prompt = performance_prompt(&winners);
        assert!(prompt.contains("\nTrades: 1\nWins: 1 / Losses: 0\n"));
        assert!(prompt.contains("\nProfit factor: n/a (no losing trades)\n"));
        assert!(prompt.ends_with("Worst trade: 97.50\n"));
    }

    #[tokio::test]
    async fn coaching_is_stored_on_trade() {
        let (service, model, trades) = service(StatusCode::OK);
        trades.upsert(&trade("1_2", 40)).await.unwrap();

        let coach = service
            .coach_trade("1_2", Some(b"png".as_slice()))
            .await
            .expect("coaching should succeed");
        assert_eq!(coach.rating(), &Some(3.5));
        assert_eq!(coach.grade().as_deref(), Some("B-"));
        assert_eq!(coach.provider(), "gemini");

        let stored = trades.require("1_2").await.unwrap();
        assert_eq!(stored.ai_coach().as_ref(), Some(&coach));

        let requests = model.requests.lock().unwrap();
        let parts = &requests[0]["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("Symbol: MESM4"));
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
    }

    #[tokio::test]
    async fn provider_failure_leaves_trade_untouched() {
        let (service, _, trades) = service(StatusCode::TOO_MANY_REQUESTS);
        trades.upsert(&trade("1_2", 40)).await.unwrap();

        let err = service.coach_trade("1_2", None).await.expect_err("429 should fail");
        assert!(matches!(
            err,
            Error::ProviderError(provider_api::Error::Provider {
                status: Some(429),
                ..
            })
        ));
        assert!(trades.require("1_2").await.unwrap().ai_coach().is_none());
        assert!(matches!(
            service.coach_trade("missing", None).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn performance_review() {
        let (service, _, trades) = service(StatusCode::OK);
        trades.upsert(&trade("1_2", 40)).await.unwrap();

        let review = service.coach_performance().await.unwrap();
        assert_eq!(review.stats.trades, 1);
        assert_eq!(review.grade.as_deref(), Some("B-"));
    }
}

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use types::{Candle, Interval};

/// Candles cached on a trade. Always replaced as a whole, never merged.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineData {
    symbol: String,
    interval: Interval,
    candles: Vec<Candle>,
    fetched_at: chrono::DateTime<chrono::Utc>,
}

impl KlineData {
    pub fn new(symbol: impl Into<String>, interval: Interval, candles: Vec<Candle>) -> Self {
        return Self {
            symbol: symbol.into(),
            interval,
            candles,
            fetched_at: chrono::Utc::now(),
        };
    }

    pub fn is_empty(&self) -> bool {
        return self.candles.is_empty();
    }
}

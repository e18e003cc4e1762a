use derive_builder::Builder;
use derive_getters::Getters;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cash-flow event outside of a round-trip trade (funding, fees).
#[derive(Debug, Clone, PartialEq, Builder, Getters, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into))]
pub struct Cost {
    timestamp: chrono::DateTime<chrono::Utc>,
    contract: String,
    currency: String,
    #[serde(rename = "type")]
    cost_type: String,
    amount: Decimal,
}

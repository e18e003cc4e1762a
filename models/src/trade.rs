use derive_builder::Builder;
use derive_getters::Getters;
use garde::Validate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AiCoach, Error, KlineData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

/// A closed round-trip position, keyed by `trade_id`.
#[derive(Debug, Clone, PartialEq, Builder, Getters, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[builder(setter(into))]
pub struct Trade {
    trade_id: String,
    symbol: String,
    broker: String,
    quantity: Decimal,
    pnl: Decimal,
    /// Commissions and fees, stored as a negative amount.
    #[builder(default)]
    #[serde(default)]
    non_pnl_costs: Decimal,
    currency: String,
    entry_price: Decimal,
    entry_timestamp: chrono::DateTime<chrono::Utc>,
    exit_price: Decimal,
    exit_timestamp: chrono::DateTime<chrono::Utc>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stop_loss: Option<Decimal>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    profit_target: Option<Decimal>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    side: Option<Side>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kline_data: Option<KlineData>,
    #[builder(default)]
    #[serde(default, rename = "AICoach", skip_serializing_if = "Option::is_none")]
    ai_coach: Option<AiCoach>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    manual: Option<bool>,
    #[builder(default = "chrono::Utc::now()")]
    created_at: chrono::DateTime<chrono::Utc>,
    #[builder(default = "chrono::Utc::now()")]
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl Trade {
    pub fn duration_seconds(&self) -> i64 {
        return self
            .exit_timestamp
            .signed_duration_since(self.entry_timestamp)
            .num_seconds();
    }

    pub fn net_pnl(&self) -> Decimal {
        return self.pnl + self.non_pnl_costs;
    }

    pub fn is_win(&self) -> bool {
        return self.net_pnl() > Decimal::ZERO;
    }

    pub fn set_kline_data(&mut self, kline_data: KlineData) {
        self.kline_data = Some(kline_data);
        self.updated_at = chrono::Utc::now();
    }

    pub fn set_ai_coach(&mut self, ai_coach: AiCoach) {
        self.ai_coach = Some(ai_coach);
        self.updated_at = chrono::Utc::now();
    }

    /// Carries user and cached state over from the stored version of the same
    /// trade so a re-import only refreshes the broker fields.
    pub fn inherit_from(&mut self, previous: Trade) {
        self.created_at = previous.created_at;
        self.stop_loss = self.stop_loss.or(previous.stop_loss);
        self.profit_target = self.profit_target.or(previous.profit_target);
        if self.kline_data.is_none() {
            self.kline_data = previous.kline_data;
        }
        if self.ai_coach.is_none() {
            self.ai_coach = previous.ai_coach;
        }
    }
}

fn positive(value: &Decimal, _context: &()) -> garde::Result {
    if *value > Decimal::ZERO {
        return Ok(());
    }
    return Err(garde::Error::new("must be greater than zero"));
}

fn not_positive(value: &Decimal, _context: &()) -> garde::Result {
    if *value <= Decimal::ZERO {
        return Ok(());
    }
    return Err(garde::Error::new("commissions are stored as a negative amount"));
}

/// Trade submitted by hand instead of imported from a broker export.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualTrade {
    #[garde(length(min = 1, max = 32))]
    pub symbol: String,
    #[garde(length(min = 1, max = 64))]
    #[serde(default = "ManualTrade::default_broker")]
    pub broker: String,
    #[garde(skip)]
    pub side: Side,
    #[garde(custom(positive))]
    pub quantity: Decimal,
    #[garde(custom(positive))]
    pub entry_price: Decimal,
    #[garde(skip)]
    pub entry_timestamp: chrono::DateTime<chrono::Utc>,
    #[garde(custom(positive))]
    pub exit_price: Decimal,
    #[garde(skip)]
    pub exit_timestamp: chrono::DateTime<chrono::Utc>,
    #[garde(skip)]
    pub pnl: Decimal,
    #[garde(custom(not_positive))]
    #[serde(default)]
    pub commission: Decimal,
    #[garde(length(min = 1, max = 8))]
    #[serde(default = "ManualTrade::default_currency")]
    pub currency: String,
    #[garde(skip)]
    pub stop_loss: Option<Decimal>,
    #[garde(skip)]
    pub profit_target: Option<Decimal>,
}

impl ManualTrade {
    fn default_broker() -> String {
        return "Manual".to_owned();
    }

    fn default_currency() -> String {
        return "USD".to_owned();
    }

    pub fn into_trade(self) -> Result<Trade, Error> {
        self.validate(&())?;
        if self.exit_timestamp < self.entry_timestamp {
            return Err(Error::InvalidTrade(
                "exit timestamp is before entry timestamp".to_owned(),
            ));
        }
        let quantity = match self.side {
            Side::Long => self.quantity,
            Side::Short => -self.quantity,
        };
        let trade = TradeBuilder::default()
            .trade_id(format!("manual_{}", uuid::Uuid::new_v4()))
            .symbol(self.symbol.trim().to_uppercase())
            .broker(self.broker)
            .quantity(quantity)
            .pnl(self.pnl)
            .non_pnl_costs(self.commission)
            .currency(self.currency)
            .entry_price(self.entry_price)
            .entry_timestamp(self.entry_timestamp)
            .exit_price(self.exit_price)
            .exit_timestamp(self.exit_timestamp)
            .stop_loss(self.stop_loss)
            .profit_target(self.profit_target)
            .side(self.side)
            .manual(true)
            .build()?;
        return Ok(trade);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use super::{ManualTrade, Side, TradeBuilder};
    use crate::Trade;

    fn manual(side: Side) -> ManualTrade {
        return ManualTrade {
            symbol: " mnq ".to_owned(),
            broker: "Manual".to_owned(),
            side,
            quantity: Decimal::from(2),
            entry_price: Decimal::new(180_2550, 2),
            entry_timestamp: chrono::Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap(),
            exit_price: Decimal::new(180_5000, 2),
            exit_timestamp: chrono::Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap(),
            pnl: Decimal::new(9800, 2),
            commission: Decimal::new(-248, 2),
            currency: "USD".to_owned(),
            stop_loss: None,
            profit_target: Some(Decimal::from(18100)),
        };
    }

    fn sample() -> Trade {
        return TradeBuilder::default()
            .trade_id("1_2")
            .symbol("ESM4")
            .broker("Tradovate")
            .quantity(Decimal::ONE)
            .pnl(Decimal::new(-1250, 2))
            .currency("USD")
            .entry_price(Decimal::from(5200))
            .entry_timestamp(chrono::Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap())
            .exit_price(Decimal::new(519975, 2))
            .exit_timestamp(chrono::Utc.with_ymd_and_hms(2024, 5, 1, 13, 5, 0).unwrap())
            .build()
            .unwrap();
    }

    #[test]
    fn manual_trade_is_flagged() {
        let trade = manual(Side::Short).into_trade().expect("valid manual trade");
        assert_eq!(trade.symbol(), "MNQ");
        assert_eq!(trade.quantity(), &Decimal::from(-2));
        assert_eq!(trade.manual(), &Some(true));
        assert!(trade.trade_id().starts_with("manual_"));
        assert_eq!(trade.net_pnl(), Decimal::new(9552, 2));
    }

    #[test]
    fn manual_trade_validation() {
        let mut empty_symbol = manual(Side::Long);
        empty_symbol.symbol = String::new();
        empty_symbol.into_trade().expect_err("empty symbol should not be valid");

        let mut zero_quantity = manual(Side::Long);
        zero_quantity.quantity = Decimal::ZERO;
        zero_quantity.into_trade().expect_err("zero quantity should not be valid");

        let mut positive_commission = manual(Side::Long);
        positive_commission.commission = Decimal::ONE;
        positive_commission
            .into_trade()
            .expect_err("positive commission should not be valid");

        let mut reversed = manual(Side::Long);
        reversed.exit_timestamp = chrono::Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap();
        reversed.into_trade().expect_err("exit before entry should not be valid");
    }

    #[test]
    fn serializes_pascal_case() {
        let original = sample();
        let value = serde_json::to_value(&original).unwrap();
        assert_eq!(value["TradeId"], "1_2");
        assert!(value["EntryTimestamp"].is_string());
        assert!(value.get("KlineData").is_none());

        let trade: Trade = serde_json::from_value(value).unwrap();
        assert_eq!(trade, original);
    }

    #[test]
    fn inherit_keeps_cached_state() {
        let mut previous = sample();
        previous.set_kline_data(crate::KlineData::new("ES=F", types::Interval::OneMinute, vec![]));
        let created_at = *previous.created_at();

        let mut reimported = sample();
        reimported.inherit_from(previous);
        assert!(reimported.kline_data().is_some());
        assert_eq!(reimported.created_at(), &created_at);
        assert!(!reimported.is_win());
        assert_eq!(reimported.duration_seconds(), 300);
    }
}

//! Broker CSV exports into trades and cost records.
//!
//! Parsing is pure. Rows that cannot be turned into a record are skipped and
//! reported as warnings so one bad row never blocks the rest of the file.

use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use models::{Cost, CostBuilder, Side, Trade, TradeBuilder};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use anyhow::Context;
use tracing::{info, warn};

use crate::{error::Error, repository::TradeRepository};

pub const BROKER: &str = "Tradovate";
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";
pub const UNKNOWN_CURRENCY: &str = "?";

/// Parentheses only count as a pair: `($1.00)` and `$(1.00)`.
const MONEY_PATTERN: &str = r"^(?P<minus>-)?(?:\((?P<c1>[$€£])(?P<n1>[0-9][0-9,]*(?:\.[0-9]+)?)\)|(?P<c2>[$€£])\((?P<n2>[0-9][0-9,]*(?:\.[0-9]+)?)\)|(?P<c3>[$€£])(?P<n3>[0-9][0-9,]*(?:\.[0-9]+)?))$";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
    /// Row skipped: missing or unparsable required column.
    MalformedRow,
    /// Row kept with a zero amount and currency `?`.
    UnparsedAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportWarning {
    pub line: u64,
    pub kind: WarningKind,
    pub trade_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome<T> {
    pub records: Vec<T>,
    pub warnings: Vec<ImportWarning>,
}

/// `" Buy Fill Id "` -> `"Buy_Fill_Id"`.
pub fn normalize_header(header: &str) -> String {
    return header.trim().replace(' ', "_");
}

fn canonical(header: &str) -> String {
    return normalize_header(header).replace('_', "").to_lowercase();
}

/// Parses `$123.45`, `$(123.45)`, `-$1,234.50` and the euro/pound
/// equivalents. Anything else becomes zero with currency `?`; the flag is
/// false in that case.
pub struct MoneyParser {
    regex: Regex,
}

impl MoneyParser {
    pub fn new() -> Result<Self, Error> {
        let regex = Regex::new(MONEY_PATTERN).context("Compiling money pattern")?;
        return Ok(Self { regex });
    }

    pub fn parse(&self, value: &str) -> (Decimal, String, bool) {
        let unparsed = (Decimal::ZERO, UNKNOWN_CURRENCY.to_owned(), false);
        let Some(captures) = self.regex.captures(value.trim()) else {
            return unparsed;
        };
        let (symbol, digits, wrapped) = if let Some(x) = captures.name("n1") {
            (captures.name("c1"), x, true)
        } else if let Some(x) = captures.name("n2") {
            (captures.name("c2"), x, true)
        } else if let Some(x) = captures.name("n3") {
            (captures.name("c3"), x, false)
        } else {
            return unparsed;
        };
        let Ok(amount) = Decimal::from_str(&digits.as_str().replace(',', "")) else {
            return unparsed;
        };
        let negative = wrapped || captures.name("minus").is_some();
        let currency = match symbol.map(|x| x.as_str()) {
            Some("€") => "EUR",
            Some("£") => "GBP",
            _ => "USD",
        };
        let amount = if negative { -amount } else { amount };
        return (amount, currency.to_owned(), true);
    }
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    return NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|x| x.and_utc());
}

fn parse_decimal(value: &str) -> Option<Decimal> {
    let value = value.trim().replace(',', "");
    return Decimal::from_str(&value).ok();
}

/// One CSV row with case-, space- and underscore-insensitive column lookup.
struct Row<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
    line: u64,
}

impl<'a> Row<'a> {
    fn get(&self, name: &str) -> Option<&'a str> {
        let index = self.columns.get(&canonical(name))?;
        return self
            .record
            .get(*index)
            .map(str::trim)
            .filter(|x| !x.is_empty());
    }

    fn require(&self, name: &str) -> Result<&'a str, String> {
        return self.get(name).ok_or_else(|| format!("missing {name}"));
    }

    fn decimal(&self, name: &str) -> Result<Decimal, String> {
        let value = self.require(name)?;
        return parse_decimal(value).ok_or_else(|| format!("invalid {name} '{value}'"));
    }

    fn timestamp(&self, name: &str) -> Result<DateTime<Utc>, String> {
        let value = self.require(name)?;
        return parse_timestamp(value).ok_or_else(|| format!("invalid {name} '{value}'"));
    }
}

fn read_rows<T, F>(csv: &str, mut parse_row: F) -> Result<ImportOutcome<T>, Error>
where
    F: FnMut(&Row, &MoneyParser, &mut Vec<ImportWarning>) -> Result<T, String>,
{
    let money = MoneyParser::new()?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv.as_bytes());
    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, x)| (canonical(x), i))
        .collect();

    let mut outcome = ImportOutcome {
        records: Vec::new(),
        warnings: Vec::new(),
    };
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|x| x.trim().is_empty()) {
            continue;
        }
        let row = Row {
            columns: &columns,
            record: &record,
            line: record.position().map(|x| x.line()).unwrap_or_default(),
        };
        match parse_row(&row, &money, &mut outcome.warnings) {
            Ok(x) => outcome.records.push(x),
            Err(reason) => {
                warn!("Skipping line {}: {reason}", row.line);
                outcome.warnings.push(ImportWarning {
                    line: row.line,
                    kind: WarningKind::MalformedRow,
                    trade_id: None,
                    reason,
                });
            }
        }
    }
    return Ok(outcome);
}

fn parse_trade_row(
    row: &Row,
    money: &MoneyParser,
    warnings: &mut Vec<ImportWarning>,
) -> Result<Trade, String> {
    let buy_fill_id = row.require("buyFillId")?;
    let sell_fill_id = row.require("sellFillId")?;
    let trade_id = format!("{buy_fill_id}_{sell_fill_id}");

    let symbol = row.require("symbol")?;
    let quantity = row.decimal("qty")?.abs();
    let buy_price = row.decimal("buyPrice")?;
    let sell_price = row.decimal("sellPrice")?;
    let bought_at = row.timestamp("boughtTimestamp")?;
    let sold_at = row.timestamp("soldTimestamp")?;

    let raw_pnl = row.get("pnl").unwrap_or_default();
    let (pnl, currency, parsed) = money.parse(raw_pnl);
    if !parsed {
        warn!("Unparsed pnl '{raw_pnl}' for {trade_id} on line {}", row.line);
        warnings.push(ImportWarning {
            line: row.line,
            kind: WarningKind::UnparsedAmount,
            trade_id: Some(trade_id.clone()),
            reason: format!("unparsed pnl '{raw_pnl}'"),
        });
    }

    let (side, quantity, entry, exit) = if bought_at <= sold_at {
        (Side::Long, quantity, (buy_price, bought_at), (sell_price, sold_at))
    } else {
        (Side::Short, -quantity, (sell_price, sold_at), (buy_price, bought_at))
    };
    return TradeBuilder::default()
        .trade_id(trade_id)
        .symbol(symbol)
        .broker(BROKER)
        .quantity(quantity)
        .pnl(pnl)
        .currency(currency)
        .entry_price(entry.0)
        .entry_timestamp(entry.1)
        .exit_price(exit.0)
        .exit_timestamp(exit.1)
        .side(side)
        .build()
        .map_err(|err| format!("{err:#}"));
}

/// Round-trip trades from a broker performance export. Each row pairs a buy
/// and a sell fill; the trade id is `{buyFillId}_{sellFillId}` so importing
/// the same file again overwrites instead of duplicating.
pub fn parse_trades(csv: &str) -> Result<ImportOutcome<Trade>, Error> {
    return read_rows(csv, parse_trade_row);
}

fn parse_cost_row(
    row: &Row,
    money: &MoneyParser,
    warnings: &mut Vec<ImportWarning>,
) -> Result<Cost, String> {
    let timestamp = row.timestamp("timestamp")?;
    let cost_type = row
        .get("cashChangeType")
        .or_else(|| row.get("type"))
        .ok_or_else(|| "missing type".to_owned())?;
    let raw_amount = row
        .get("delta")
        .or_else(|| row.get("amount"))
        .ok_or_else(|| "missing amount".to_owned())?;

    let (amount, currency) = match parse_decimal(raw_amount) {
        Some(x) => (x, row.get("currency").unwrap_or("USD").to_owned()),
        None => {
            let (amount, currency, parsed) = money.parse(raw_amount);
            if !parsed {
                warnings.push(ImportWarning {
                    line: row.line,
                    kind: WarningKind::UnparsedAmount,
                    trade_id: None,
                    reason: format!("unparsed amount '{raw_amount}'"),
                });
            }
            (amount, currency)
        }
    };

    return CostBuilder::default()
        .timestamp(timestamp)
        .contract(row.get("contract").unwrap_or_default())
        .currency(currency)
        .cost_type(cost_type)
        .amount(amount)
        .build()
        .map_err(|err| format!("{err:#}"));
}

/// Cash-history export: fees, funding and other non-trade cash flows.
pub fn parse_costs(csv: &str) -> Result<ImportOutcome<Cost>, Error> {
    return read_rows(csv, parse_cost_row);
}

/// Upserts parsed trades, keeping user and cached state from earlier imports.
/// Returns the stored ids in input order.
pub async fn store_trades(repo: &TradeRepository, trades: Vec<Trade>) -> Result<Vec<String>, Error> {
    let mut ids = Vec::with_capacity(trades.len());
    for mut trade in trades {
        if let Some(previous) = repo.get(trade.trade_id()).await? {
            trade.inherit_from(previous);
        }
        repo.upsert(&trade).await?;
        ids.push(trade.trade_id().to_owned());
    }
    info!("Stored {} imported trades", ids.len());
    return Ok(ids);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use models::Side;
    use rust_decimal::Decimal;

    use super::{
        normalize_header, parse_costs, parse_trades, store_trades, MoneyParser, WarningKind,
    };
    use crate::{repository::TradeRepository, store::MemoryStore};

    const PERFORMANCE: &str = "\
symbol,_priceFormat,_priceFormatType,_tickSize,buyFillId,sellFillId,qty,buyPrice,sellPrice,pnl,boughtTimestamp,soldTimestamp,duration
MESM4,-2,0,0.25,111,222,2,5300.25,5302.50,$22.50,05/20/2024 13:30:05,05/20/2024 13:42:10,12min 5sec
MNQM4,-2,0,0.25,333,444,1,18500.00,18450.00,$(100.00),05/21/2024 14:10:00,05/21/2024 14:02:30,7min 30sec
";

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header("  Buy Fill Id "), "Buy_Fill_Id");
        assert_eq!(normalize_header("pnl"), "pnl");
    }

    #[test]
    fn money_formats() {
        let money = MoneyParser::new().unwrap();
        assert_eq!(money.parse("$12.34"), (Decimal::new(1234, 2), "USD".to_owned(), true));
        assert_eq!(money.parse("$(12.34)"), (Decimal::new(-1234, 2), "USD".to_owned(), true));
        assert_eq!(money.parse("($12.34)"), (Decimal::new(-1234, 2), "USD".to_owned(), true));
        assert_eq!(money.parse("-$1,234.50").0, Decimal::new(-123450, 2));
        assert_eq!(money.parse("£(3)"), (Decimal::from(-3), "GBP".to_owned(), true));
        assert_eq!(money.parse("€7").1, "EUR");
        assert_eq!(money.parse("12.34 USD"), (Decimal::ZERO, "?".to_owned(), false));
        assert_eq!(money.parse(""), (Decimal::ZERO, "?".to_owned(), false));
    }

    #[test]
    fn unbalanced_parentheses_are_unparsed() {
        let money = MoneyParser::new().unwrap();
        for value in ["$12.34)", "$(12.34", "($12.34", "-$(12.34"] {
            assert_eq!(money.parse(value), (Decimal::ZERO, "?".to_owned(), false), "{value}");
        }
        assert_eq!(money.parse("($(12.34))").2, false);
    }

    #[test]
    fn long_and_short_rows() {
        let outcome = parse_trades(PERFORMANCE).expect("csv should parse");
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.records.len(), 2);

        let long = &outcome.records[0];
        assert_eq!(long.trade_id(), "111_222");
        assert_eq!(long.side(), &Some(Side::Long));
        assert_eq!(long.quantity(), &Decimal::from(2));
        assert_eq!(long.entry_price(), &Decimal::new(530025, 2));
        assert_eq!(long.pnl(), &Decimal::new(2250, 2));
        assert_eq!(long.broker(), "Tradovate");

        let short = &outcome.records[1];
        assert_eq!(short.trade_id(), "333_444");
        assert_eq!(short.side(), &Some(Side::Short));
        assert_eq!(short.quantity(), &Decimal::from(-1));
        assert_eq!(short.entry_price(), &Decimal::from(18450));
        assert_eq!(
            short.entry_timestamp(),
            &chrono::Utc.with_ymd_and_hms(2024, 5, 21, 14, 2, 30).unwrap()
        );
        assert!(short.entry_timestamp() <= short.exit_timestamp());
        assert_eq!(short.pnl(), &Decimal::from(-100));
    }

    #[test]
    fn spaced_headers_are_accepted() {
        let csv = "\
 Symbol , Buy Fill Id , Sell Fill Id ,Qty,Buy Price,Sell Price,PnL,Bought Timestamp,Sold Timestamp
ESM4,1,2,1,5200,5201,$50.00,05/01/2024 13:00:00,05/01/2024 13:05:00
";
        let outcome = parse_trades(csv).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].trade_id(), "1_2");
    }

    #[test]
    fn bad_rows_become_warnings() {
        let csv = "\
symbol,buyFillId,sellFillId,qty,buyPrice,sellPrice,pnl,boughtTimestamp,soldTimestamp
ESM4,1,2,1,5200,5201,50 dollars,05/01/2024 13:00:00,05/01/2024 13:05:00
ESM4,,4,1,5200,5201,$1.00,05/01/2024 13:00:00,05/01/2024 13:05:00
ESM4,5,6,1,5200,5201,$1.00,2024-13-45,05/01/2024 13:05:00
";
        let outcome = parse_trades(csv).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].currency(), "?");
        assert_eq!(outcome.records[0].pnl(), &Decimal::ZERO);

        let kinds: Vec<WarningKind> = outcome.warnings.iter().map(|x| x.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                WarningKind::UnparsedAmount,
                WarningKind::MalformedRow,
                WarningKind::MalformedRow
            ]
        );
        assert_eq!(outcome.warnings[0].trade_id.as_deref(), Some("1_2"));
        assert_eq!(outcome.warnings[1].line, 3);
    }

    #[test]
    fn cash_history() {
        let csv = "\
Transaction ID,Timestamp,Currency,Cash Change Type,Delta,Contract
9001,05/20/2024 21:00:00,USD,Commission,-2.48,MESM4
9002,05/20/2024 21:00:00,USD,Exchange Fee,-1.10,MESM4
";
        let outcome = parse_costs(csv).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].cost_type(), "Commission");
        assert_eq!(outcome.records[1].amount(), &Decimal::new(-110, 2));
    }

    #[tokio::test]
    async fn double_import_is_idempotent() {
        let repo = TradeRepository::new(Arc::new(MemoryStore::new()));

        let first = parse_trades(PERFORMANCE).unwrap().records;
        store_trades(&repo, first).await.unwrap();
        let created_at = *repo.require("111_222").await.unwrap().created_at();

        let second = parse_trades(PERFORMANCE).unwrap().records;
        let ids = store_trades(&repo, second).await.unwrap();

        assert_eq!(ids, vec!["111_222", "333_444"]);
        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert_eq!(
            repo.require("111_222").await.unwrap().created_at(),
            &created_at,
            "re-import keeps the original creation time"
        );
    }
}

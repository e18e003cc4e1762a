//! Broker ticker -> market-data provider ticker.

use std::collections::HashMap;

use regex::Regex;
use tracing::warn;

pub const SYMBOL_OVERRIDES_ENV: &str = "SYMBOL_OVERRIDES";

/// Continuous front-month tickers for the common futures roots.
fn builtin(root: &str) -> Option<&'static str> {
    let symbol = match root {
        // Equity indices
        "ES" => "ES=F",
        "MES" => "MES=F",
        "NQ" => "NQ=F",
        "MNQ" => "MNQ=F",
        "YM" => "YM=F",
        "MYM" => "MYM=F",
        "RTY" => "RTY=F",
        "M2K" => "M2K=F",
        "NKD" => "NKD=F",
        // Energy
        "CL" => "CL=F",
        "MCL" => "MCL=F",
        "QM" => "QM=F",
        "NG" => "NG=F",
        "QG" => "QG=F",
        "RB" => "RB=F",
        "HO" => "HO=F",
        // Metals
        "GC" => "GC=F",
        "MGC" => "MGC=F",
        "SI" => "SI=F",
        "SIL" => "SIL=F",
        "HG" => "HG=F",
        "PL" => "PL=F",
        "PA" => "PA=F",
        // Rates
        "ZB" => "ZB=F",
        "UB" => "UB=F",
        "ZN" => "ZN=F",
        "ZF" => "ZF=F",
        "ZT" => "ZT=F",
        // Agriculture
        "ZC" => "ZC=F",
        "ZS" => "ZS=F",
        "ZW" => "ZW=F",
        "ZL" => "ZL=F",
        "ZM" => "ZM=F",
        "LE" => "LE=F",
        "HE" => "HE=F",
        // Currencies
        "6E" => "6E=F",
        "M6E" => "M6E=F",
        "6B" => "6B=F",
        "6J" => "6J=F",
        "6A" => "6A=F",
        "6C" => "6C=F",
        "6S" => "6S=F",
        "6N" => "6N=F",
        "DX" => "DX=F",
        // Crypto
        "BTC" => "BTC=F",
        "MBT" => "MBT=F",
        "ETH" => "ETH=F",
        "MET" => "MET=F",
        _ => return None,
    };
    return Some(symbol);
}

/// Root of a contract symbol such as `ESZ4` or `MNQH25`: a month code
/// (`F G H J K M N Q U V X Z`) followed by one or two year digits.
pub fn contract_root(symbol: &str) -> Option<&str> {
    let regex = Regex::new(r"^(.+?)[FGHJKMNQUVXZ]\d{1,2}$").ok()?;
    let captures = regex.captures(symbol)?;
    return captures.get(1).map(|x| x.as_str());
}

fn normalize_table(table: HashMap<String, String>) -> HashMap<String, String> {
    return table
        .into_iter()
        .map(|(k, v)| (k.trim().to_uppercase(), v.trim().to_owned()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect();
}

/// Parses `SYMBOL_OVERRIDES`, a JSON object such as `{"MES": "ES=F"}`. A
/// malformed value is logged and ignored.
pub fn env_overrides() -> HashMap<String, String> {
    let Ok(raw) = std::env::var(SYMBOL_OVERRIDES_ENV) else {
        return HashMap::new();
    };
    return match serde_json::from_str::<HashMap<String, String>>(&raw) {
        Ok(x) => normalize_table(x),
        Err(err) => {
            warn!("Ignoring {SYMBOL_OVERRIDES_ENV}: {err:#}");
            HashMap::new()
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct SymbolMapper {
    user: HashMap<String, String>,
    env: HashMap<String, String>,
}

impl SymbolMapper {
    pub fn new(user: HashMap<String, String>, env: HashMap<String, String>) -> Self {
        return Self {
            user: normalize_table(user),
            env: normalize_table(env),
        };
    }

    fn lookup(&self, symbol: &str) -> Option<String> {
        return self
            .user
            .get(symbol)
            .or_else(|| self.env.get(symbol))
            .cloned()
            .or_else(|| builtin(symbol).map(str::to_owned));
    }

    /// User table, then environment, then built-in table; the same three
    /// again on the contract root; otherwise the input unchanged.
    pub fn resolve(&self, broker_symbol: &str) -> String {
        let symbol = broker_symbol.trim().to_uppercase();
        if let Some(x) = self.lookup(&symbol) {
            return x;
        }
        if let Some(x) = contract_root(&symbol).and_then(|root| self.lookup(root)) {
            return x;
        }
        return broker_symbol.to_owned();
    }
}

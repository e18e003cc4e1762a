use std::{net::SocketAddr, str::FromStr};

use anyhow::{bail, Context};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3003";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s.trim().to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => bail!("Unknown STORE '{other}', expected redis or memory"),
        };
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreKind,
    pub redis_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub market_data_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        return Self::from_lookup(|key| std::env::var(key).ok());
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|x| !x.trim().is_empty());

        let store = match lookup("STORE") {
            Some(x) => x.parse()?,
            None => StoreKind::Redis,
        };
        let redis_url = match store {
            StoreKind::Redis => Some(lookup("REDIS_URL").context("REDIS_URL from .env file")?),
            StoreKind::Memory => None,
        };
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned())
            .parse()
            .context("BIND_ADDR from .env file")?;

        return Ok(Self {
            store,
            redis_url,
            bind_addr,
            market_data_url: lookup("MARKET_DATA_URL")
                .unwrap_or_else(|| provider_api::DEFAULT_CHART_URL.to_owned()),
            gemini_api_key: lookup("GEMINI_API_KEY"),
            gemini_model: lookup("GEMINI_MODEL")
                .unwrap_or_else(|| journal::coach::DEFAULT_MODEL.to_owned()),
            gemini_url: lookup("GEMINI_URL")
                .unwrap_or_else(|| provider_api::DEFAULT_GENERATE_URL.to_owned()),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{Config, StoreKind};

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        return Config::from_lookup(|key| vars.get(key).cloned());
    }

    #[test]
    fn defaults() {
        let config = config(&[("REDIS_URL", "redis://127.0.0.1/")]).expect("valid config");
        assert_eq!(config.store, StoreKind::Redis);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3003");
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn redis_requires_url() {
        config(&[]).expect_err("redis store without REDIS_URL");
        config(&[("STORE", "redis"), ("REDIS_URL", "")]).expect_err("empty REDIS_URL");
    }

    #[test]
    fn memory_store() {
        let config = config(&[("STORE", "Memory"), ("BIND_ADDR", "0.0.0.0:8080")]).unwrap();
        assert_eq!(config.store, StoreKind::Memory);
        assert!(config.redis_url.is_none());
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn invalid_values() {
        config(&[("STORE", "postgres")]).expect_err("unknown store");
        config(&[("STORE", "memory"), ("BIND_ADDR", "localhost")]).expect_err("bad address");
    }
}

use std::{collections::HashMap, marker::PhantomData, sync::Arc};

use models::{annotation::Annotation, Trade};
use serde::{de::DeserializeOwned, Serialize};
use tracing::error;

use crate::{
    error::Error,
    store::{Key, KvStore},
};

const TRADES: &str = "trades";
const SETTINGS: &str = "settings";
const SYMBOL_MAP: &str = "symbol_map";

async fn list_values<T: DeserializeOwned>(
    store: &dyn KvStore,
    prefix: &Key,
) -> Result<Vec<T>, Error> {
    let entries = store.list(prefix).await?;
    let res = entries
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_str::<T>(&value) {
            Ok(x) => Some(x),
            Err(err) => {
                error!("Skipping unreadable entry {key}: {err:#}");
                None
            }
        })
        .collect();
    return Ok(res);
}

#[derive(Clone)]
pub struct TradeRepository {
    store: Arc<dyn KvStore>,
}

impl TradeRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        return Self { store };
    }

    fn key(trade_id: &str) -> Key {
        return Key::new([TRADES, trade_id]);
    }

    pub async fn get(&self, trade_id: &str) -> Result<Option<Trade>, Error> {
        let value = self.store.get(&Self::key(trade_id)).await?;
        return match value {
            Some(x) => Ok(Some(serde_json::from_str(&x)?)),
            None => Ok(None),
        };
    }

    pub async fn require(&self, trade_id: &str) -> Result<Trade, Error> {
        return self
            .get(trade_id)
            .await?
            .ok_or_else(|| Error::NotFound(trade_id.to_owned()));
    }

    /// Insert or overwrite by trade id.
    pub async fn upsert(&self, trade: &Trade) -> Result<(), Error> {
        let value = serde_json::to_string(trade)?;
        self.store.set(&Self::key(trade.trade_id()), value).await?;
        return Ok(());
    }

    /// All trades, most recently closed first.
    pub async fn list(&self) -> Result<Vec<Trade>, Error> {
        let mut trades: Vec<Trade> = list_values(self.store.as_ref(), &Key::new([TRADES])).await?;
        trades.sort_by(|a, b| b.exit_timestamp().cmp(a.exit_timestamp()));
        return Ok(trades);
    }

    pub async fn ids(&self) -> Result<Vec<String>, Error> {
        let entries = self.store.list(&Key::new([TRADES])).await?;
        return Ok(entries
            .into_iter()
            .filter_map(|(key, _)| key.last().map(str::to_owned))
            .collect());
    }

    pub async fn delete(&self, trade_id: &str) -> Result<(), Error> {
        let key = Self::key(trade_id);
        if self.store.get(&key).await?.is_none() {
            return Err(Error::NotFound(trade_id.to_owned()));
        }
        self.store.delete(&key).await?;
        return Ok(());
    }

    /// Deletes every listed id that exists; returns how many were removed.
    pub async fn delete_many(&self, trade_ids: &[String]) -> Result<usize, Error> {
        let mut deleted = 0;
        for trade_id in trade_ids {
            match self.delete(trade_id).await {
                Ok(()) => deleted += 1,
                Err(Error::NotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        return Ok(deleted);
    }
}

/// Notes, setups and tags: one collection per record type.
pub struct AnnotationRepository<T> {
    store: Arc<dyn KvStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for AnnotationRepository<T> {
    fn clone(&self) -> Self {
        return Self {
            store: self.store.clone(),
            _marker: PhantomData,
        };
    }
}

impl<T> AnnotationRepository<T>
where
    T: Annotation + Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        return Self {
            store,
            _marker: PhantomData,
        };
    }

    pub async fn list(&self) -> Result<Vec<T>, Error> {
        return list_values(self.store.as_ref(), &Key::new([T::COLLECTION])).await;
    }

    pub async fn upsert(&self, mut record: T) -> Result<T, Error> {
        let key = Key::new([T::COLLECTION, record.ensure_id()]);
        self.store.set(&key, serde_json::to_string(&record)?).await?;
        return Ok(record);
    }

    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        self.store.delete(&Key::new([T::COLLECTION, id])).await?;
        return Ok(());
    }
}

#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<dyn KvStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        return Self { store };
    }

    /// User-defined broker symbol -> provider symbol overrides.
    pub async fn symbol_map(&self) -> Result<HashMap<String, String>, Error> {
        let value = self.store.get(&Key::new([SETTINGS, SYMBOL_MAP])).await?;
        return match value {
            Some(x) => Ok(serde_json::from_str(&x)?),
            None => Ok(HashMap::new()),
        };
    }

    pub async fn set_symbol_map(&self, symbol_map: &HashMap<String, String>) -> Result<(), Error> {
        self.store
            .set(
                &Key::new([SETTINGS, SYMBOL_MAP]),
                serde_json::to_string(symbol_map)?,
            )
            .await?;
        return Ok(());
    }
}

//! Key-value persistence. Keys are hierarchical tuples such as
//! `["trades", "123_456"]`, rendered as `trades:123_456`. Values are JSON
//! strings. Writes are last-write-wins; there are no multi-key transactions.

pub mod memory;
pub mod redis;

use async_trait::async_trait;

pub use self::{memory::MemoryStore, redis::RedisStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    RedisError(#[from] ::redis::RedisError),

    #[error(transparent)]
    PoolError(#[from] r2d2::Error),
}

pub const KEY_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Vec<String>);

impl Key {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        return Self(parts.into_iter().map(Into::into).collect());
    }

    pub fn parts(&self) -> &[String] {
        return &self.0;
    }

    pub fn last(&self) -> Option<&str> {
        return self.0.last().map(String::as_str);
    }

    /// Rebuilds a key listed under `prefix`. Everything after the prefix is
    /// one part, so ids containing the separator survive.
    pub fn child_of(prefix: &Key, rest: &str) -> Self {
        let mut parts = prefix.0.clone();
        parts.push(rest.to_owned());
        return Self(parts);
    }

    pub fn is_under(&self, prefix: &Key) -> bool {
        return self.0.len() > prefix.0.len() && self.0.starts_with(&prefix.0);
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}", self.0.join(&KEY_SEPARATOR.to_string()));
    }
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &Key) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &Key, value: String) -> Result<(), StoreError>;

    /// Entries strictly below `prefix`, ordered by key.
    async fn list(&self, prefix: &Key) -> Result<Vec<(Key, String)>, StoreError>;

    async fn delete(&self, key: &Key) -> Result<(), StoreError>;
}

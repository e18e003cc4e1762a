use anyhow::Context;
use async_trait::async_trait;
use redis::Commands;

use super::{Key, KvStore, StoreError, KEY_SEPARATOR};

pub fn init_redis_pool(redis_url: &str) -> anyhow::Result<r2d2::Pool<redis::Client>> {
    let redis_client = redis::Client::open(redis_url)?;

    return r2d2::Pool::builder()
        .max_size(20)
        .min_idle(Some(2))
        .build(redis_client)
        .context("Creating RedisPool");
}

#[derive(Clone)]
pub struct RedisStore {
    redis_pool: r2d2::Pool<redis::Client>,
}

impl RedisStore {
    pub fn new(redis_pool: r2d2::Pool<redis::Client>) -> Self {
        return Self { redis_pool };
    }
}

fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    return escaped;
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &Key) -> Result<Option<String>, StoreError> {
        let redis_conn = &mut self.redis_pool.get()?;
        let value: Option<String> = redis_conn.get(key.to_string())?;
        return Ok(value);
    }

    async fn set(&self, key: &Key, value: String) -> Result<(), StoreError> {
        let redis_conn = &mut self.redis_pool.get()?;
        let _: () = redis_conn.set(key.to_string(), value)?;
        return Ok(());
    }

    async fn list(&self, prefix: &Key) -> Result<Vec<(Key, String)>, StoreError> {
        let redis_conn = &mut self.redis_pool.get()?;
        let raw_prefix = format!("{prefix}{KEY_SEPARATOR}");
        let pattern = format!("{}*", escape_glob(&raw_prefix));
        let mut raw_keys: Vec<String> = redis_conn.scan_match(pattern)?.collect();
        raw_keys.sort();
        raw_keys.dedup();

        let mut res = Vec::with_capacity(raw_keys.len());
        for raw_key in raw_keys {
            // Deleted between SCAN and GET.
            let Some(value) = redis_conn.get::<_, Option<String>>(&raw_key)? else {
                continue;
            };
            let rest = &raw_key[raw_prefix.len()..];
            res.push((Key::child_of(prefix, rest), value));
        }
        return Ok(res);
    }

    async fn delete(&self, key: &Key) -> Result<(), StoreError> {
        let redis_conn = &mut self.redis_pool.get()?;
        let _: () = redis_conn.del(key.to_string())?;
        return Ok(());
    }
}

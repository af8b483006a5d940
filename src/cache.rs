//! Short-lived storage of pending verification codes.
//!
//! Entries map `verify:<code>` to the normalized email the code was sent to. Writes
//! never overwrite a pending code and reads consume the entry atomically, so a code
//! verifies at most once even under concurrent attempts.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::error::AppError;

const KEY_PREFIX: &str = "verify:";

fn cache_key(code: &str) -> String {
    format!("{}{}", KEY_PREFIX, code)
}

#[async_trait]
pub trait VerificationCache: Send + Sync {
    /// Stores `code -> email` for `ttl` unless `code` is already pending.
    /// Returns `false` when the code was taken.
    async fn set_if_absent(&self, code: &str, email: &str, ttl: Duration)
        -> Result<bool, AppError>;

    /// Returns and removes the email pending under `code`, or `None` if the code is
    /// unknown, expired or already consumed.
    async fn get_and_delete(&self, code: &str) -> Result<Option<String>, AppError>;
}

/// Redis-backed cache using native key expiry. Requires Redis 6.2+ for `GETDEL`.
#[derive(Clone)]
pub struct RedisVerificationCache {
    manager: ConnectionManager,
}

impl RedisVerificationCache {
    /// Connects to `url`; the connection manager reconnects on its own afterwards.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(url)
            .map_err(|e| AppError::Cache(format!("Invalid Redis URL: {}", e)))?;
        let manager = ConnectionManager::new(client).await?;
        log::info!("connected to verification cache");
        Ok(Self { manager })
    }
}

#[async_trait]
impl VerificationCache for RedisVerificationCache {
    async fn set_if_absent(
        &self,
        code: &str,
        email: &str,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let mut conn = self.manager.clone();
        // SET .. NX replies nil when the key already exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(cache_key(code))
            .arg(email)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis().max(1) as u64)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn get_and_delete(&self, code: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.manager.clone();
        let email: Option<String> = redis::cmd("GETDEL")
            .arg(cache_key(code))
            .query_async(&mut conn)
            .await?;
        Ok(email)
    }
}

/// In-process cache. Expired entries are dropped on every write and ignored on read.
#[derive(Default)]
pub struct MemoryVerificationCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryVerificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>>, AppError> {
        self.entries
            .lock()
            .map_err(|_| AppError::Cache("memory cache lock poisoned".into()))
    }
}

#[async_trait]
impl VerificationCache for MemoryVerificationCache {
    async fn set_if_absent(
        &self,
        code: &str,
        email: &str,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);

        let key = cache_key(code);
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(key, (email.to_string(), now + ttl));
        Ok(true)
    }

    async fn get_and_delete(&self, code: &str) -> Result<Option<String>, AppError> {
        let mut entries = self.lock()?;
        Ok(entries
            .remove(&cache_key(code))
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(email, _)| email))
    }
}

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// TTLs per cache-key namespace. Each namespace has exactly one
/// serialization contract (JSON), chosen once.
pub const MATCHES_TTL_SECS: u64 = 3600;
pub const ESSAY_TTL_SECS: u64 = 1800;
pub const PREDICTION_TTL_SECS: u64 = 7200;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),
}

/// Key-value cache facade.
///
/// The engine memoizes results through this interface; implementations
/// own the transport. Callers treat every error as a miss — a cache
/// failure must never fail the originating request.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl_secs: u64)
        -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every key starting with `prefix`, returning how many went
    async fn delete_by_pattern(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Remaining TTL in seconds; None when the key is absent, -1 when the
    /// key has no expiry
    async fn ttl(&self, key: &str) -> Result<Option<i64>, CacheError>;
}

/// Two-tier cache: moka in-process L1 in front of a shared Redis L2.
///
/// L1 expiry is cache-wide and intentionally short; the per-namespace
/// TTLs are authoritative in Redis.
pub struct RedisCache {
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
}

impl RedisCache {
    pub async fn new(redis_url: &str, l1_size: u64, l1_ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(l1_ttl_secs))
            .build();

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            l1_cache,
        })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(Some(bytes));
        }

        let mut conn = self.redis.lock().await;
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        if let Some(bytes) = value {
            tracing::trace!("L2 cache hit: {}", key);
            self.l1_cache.insert(key.to_string(), bytes.clone()).await;
            return Ok(Some(bytes));
        }

        tracing::trace!("Cache miss: {}", key);
        Ok(None)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        self.l1_cache.insert(key.to_string(), value.clone()).await;

        let mut conn = self.redis.lock().await;
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async::<()>(&mut *conn)
            .await?;
        drop(conn);

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        let mut conn = self.redis.lock().await;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut *conn)
            .await?;
        Ok(())
    }

    async fn delete_by_pattern(&self, prefix: &str) -> Result<u64, CacheError> {
        // L1 has no pattern scan; clear it wholesale
        self.l1_cache.invalidate_all();

        let mut conn = self.redis.lock().await;
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{}*", prefix))
            .query_async(&mut *conn)
            .await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: u64 = redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut *conn)
            .await?;

        tracing::debug!("Invalidated {} keys under prefix {}", deleted, prefix);
        Ok(deleted)
    }

    async fn ttl(&self, key: &str) -> Result<Option<i64>, CacheError> {
        let mut conn = self.redis.lock().await;
        let ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut *conn).await?;

        // -2 means the key does not exist, -1 means no expiry
        Ok(if ttl == -2 { None } else { Some(ttl) })
    }
}

/// Single-tier in-process cache for tests and cache-less deployments.
/// Per-entry expiry is tracked alongside the value.
pub struct InMemoryCache {
    entries: moka::future::Cache<String, (Vec<u8>, Instant)>,
}

impl InMemoryCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: moka::future::CacheBuilder::new(capacity).build(),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self.entries.get(key).await {
            Some((bytes, expires_at)) if expires_at > Instant::now() => Ok(Some(bytes)),
            Some(_) => {
                self.entries.invalidate(key).await;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries.insert(key.to_string(), (value, expires_at)).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn delete_by_pattern(&self, prefix: &str) -> Result<u64, CacheError> {
        let matching: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_ref().clone())
            .collect();

        let count = matching.len() as u64;
        for key in matching {
            self.entries.invalidate(&key).await;
        }
        Ok(count)
    }

    async fn ttl(&self, key: &str) -> Result<Option<i64>, CacheError> {
        match self.entries.get(key).await {
            Some((_, expires_at)) => {
                let remaining = expires_at.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    Ok(None)
                } else {
                    Ok(Some(remaining.as_secs() as i64))
                }
            }
            None => Ok(None),
        }
    }
}

/// Cache key builder, one constructor per namespace
pub struct CacheKey;

impl CacheKey {
    /// Memoized match results for a (student, request shape) pair
    pub fn matches(student_id: &str, request_hash: &str) -> String {
        format!("matches:{}:{}", student_id, request_hash)
    }

    /// Essay analysis results keyed by content hash
    pub fn essay(content_hash: &str) -> String {
        format!("essay:{}", content_hash)
    }

    /// Admission prediction for a (student, university) pair
    pub fn prediction(student_id: &str, university_id: &str) -> String {
        format!("prediction:{}:{}", student_id, university_id)
    }

    /// Prefix for invalidating every match entry of one student
    pub fn matches_prefix(student_id: &str) -> String {
        format!("matches:{}:", student_id)
    }
}

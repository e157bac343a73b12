//! Redis cache service for analysis exchanges

use std::env;

use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};

// Environment variable names
const ENV_REDIS_HOST: &str = "SOURCELENS_REDIS_HOST";
const ENV_REDIS_PORT: &str = "SOURCELENS_REDIS_PORT";
const ENV_REDIS_PASSWORD: &str = "SOURCELENS_REDIS_PASSWORD";
const ENV_REDIS_DB: &str = "SOURCELENS_REDIS_DB";
const ENV_CACHE_TTL: &str = "SOURCELENS_CACHE_TTL";

// Default values
const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
const DEFAULT_REDIS_PORT: &str = "6379";
const DEFAULT_REDIS_DB: &str = "0";
const DEFAULT_TTL_SECONDS: u64 = 24 * 60 * 60; // 1 day

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cache miss for key: {0}")]
    Miss(String),
}

// Cache key prefixes
const PREFIX_ANALYSIS: &str = "analysis:";
const PREFIX_COUNTER_NARRATIVE: &str = "narrative:";

/// Redis-based cache for LLM exchanges
#[derive(Clone)]
pub struct AnalysisCache {
    client: Client,
    ttl_seconds: u64,
}

impl AnalysisCache {
    /// Create a new cache instance and verify connection
    ///
    /// Configuration via environment variables:
    /// - `SOURCELENS_REDIS_HOST` - Redis host (default: 127.0.0.1)
    /// - `SOURCELENS_REDIS_PORT` - Redis port (default: 6379)
    /// - `SOURCELENS_REDIS_PASSWORD` - Redis password (default: none)
    /// - `SOURCELENS_REDIS_DB` - Redis database number (default: 0)
    /// - `SOURCELENS_CACHE_TTL` - Cache TTL in seconds (default: 86400)
    pub async fn new() -> Result<Self, CacheError> {
        let host = env::var(ENV_REDIS_HOST).unwrap_or_else(|_| DEFAULT_REDIS_HOST.to_string());
        let port = env::var(ENV_REDIS_PORT).unwrap_or_else(|_| DEFAULT_REDIS_PORT.to_string());
        let password = env::var(ENV_REDIS_PASSWORD).ok();
        let db = env::var(ENV_REDIS_DB).unwrap_or_else(|_| DEFAULT_REDIS_DB.to_string());

        let ttl_seconds = env::var(ENV_CACHE_TTL)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TTL_SECONDS);

        // redis://[password@]host:port/db
        let redis_url = match password {
            Some(pwd) if !pwd.is_empty() => format!("redis://:{}@{}:{}/{}", pwd, host, port, db),
            _ => format!("redis://{}:{}/{}", host, port, db),
        };

        tracing::debug!(host = %host, port = %port, db = %db, "Connecting to Redis");

        let client = Client::open(redis_url)?;

        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        tracing::info!(host = %host, port = %port, "Redis connection established");

        Ok(Self {
            client,
            ttl_seconds,
        })
    }

    /// Get a cached analysis exchange by key hash
    pub async fn get_analysis<T: DeserializeOwned>(&self, key_hash: &str) -> Result<T, CacheError> {
        self.get_with_prefix(PREFIX_ANALYSIS, key_hash).await
    }

    /// Cache an analysis exchange by key hash
    pub async fn set_analysis<T: Serialize>(&self, key_hash: &str, data: &T) -> Result<(), CacheError> {
        self.set_with_prefix(PREFIX_ANALYSIS, key_hash, data).await
    }

    /// Get a cached counter-narrative by key hash
    pub async fn get_counter_narrative<T: DeserializeOwned>(
        &self,
        key_hash: &str,
    ) -> Result<T, CacheError> {
        self.get_with_prefix(PREFIX_COUNTER_NARRATIVE, key_hash).await
    }

    /// Cache a counter-narrative by key hash
    pub async fn set_counter_narrative<T: Serialize>(
        &self,
        key_hash: &str,
        data: &T,
    ) -> Result<(), CacheError> {
        self.set_with_prefix(PREFIX_COUNTER_NARRATIVE, key_hash, data).await
    }

    async fn get_with_prefix<T: DeserializeOwned>(
        &self,
        prefix: &str,
        key: &str,
    ) -> Result<T, CacheError> {
        let full_key = format!("{}{}", prefix, key);
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let data: Option<String> = conn.get(&full_key).await?;

        match data {
            Some(json) => {
                serde_json::from_str(&json).map_err(|e| CacheError::Serialization(e.to_string()))
            }
            None => Err(CacheError::Miss(key.to_string())),
        }
    }

    async fn set_with_prefix<T: Serialize>(
        &self,
        prefix: &str,
        key: &str,
        data: &T,
    ) -> Result<(), CacheError> {
        let full_key = format!("{}{}", prefix, key);
        let json =
            serde_json::to_string(data).map_err(|e| CacheError::Serialization(e.to_string()))?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(&full_key, json, self.ttl_seconds).await?;

        tracing::debug!(key = %full_key, ttl = self.ttl_seconds, "Cached data");
        Ok(())
    }
}

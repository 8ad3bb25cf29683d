use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use crate::cache::keys::summary_keys;
use crate::error::StorageError;

/// 缓存存储接口
///
/// `get` 返回 `None` 表示未命中，`Some(vec![])` 是合法的已缓存空值。
/// `set` 为幂等覆盖写。
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, fingerprint: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn set(&self, fingerprint: &str, value: &[u8], ttl: Duration)
    -> Result<(), StorageError>;
}

/// 基于 Redis 的摘要缓存
#[derive(Clone)]
pub struct RedisCacheStore {
    redis: Arc<RedisClient>,
}

impl RedisCacheStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    /// 从 Redis 获取缓存的摘要
    async fn get(&self, fingerprint: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let key = summary_keys::summary_cache_key(fingerprint);
        let result: Option<Vec<u8>> = conn.get(key).await?;

        Ok(result)
    }

    /// 写入摘要缓存，带过期时间
    async fn set(
        &self,
        fingerprint: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), StorageError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let key = summary_keys::summary_cache_key(fingerprint);
        // SETEX 不接受 0 秒
        let ttl = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value.to_vec(), ttl).await?;

        Ok(())
    }
}

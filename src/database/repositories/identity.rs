use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::models::identity::IdentityRecord;
use crate::error::StorageError;
use crate::utils::key_suffix;

/// 一次额度消耗的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    /// 已计数，返回计数后的值
    Accepted { requests_made: i64 },
    /// 当前窗口已用尽，计数未变
    Exhausted { requests_made: i64 },
    NotFound,
}

/// 身份记录存储
///
/// 所有修改都必须是存储端的原子操作，网关不在进程内缓存任何计数。
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn lookup(&self, key: &str) -> Result<Option<IdentityRecord>, StorageError>;

    /// `last_reset` 早于 `window_start` 时将计数清零并把 `last_reset` 设为 `now`，
    /// 返回操作之后的记录
    async fn reset_if_elapsed(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<IdentityRecord>, StorageError>;

    /// 计数加一，返回新值
    async fn increment(&self, key: &str) -> Result<Option<i64>, StorageError>;

    /// 窗口重置、上限比较和计数加一合并为一次条件更新
    async fn consume(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
        max_requests: i64,
    ) -> Result<Consumption, StorageError>;
}

/// Postgres 实现
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn lookup(&self, key: &str) -> Result<Option<IdentityRecord>, StorageError> {
        let record = sqlx::query_as::<_, IdentityRecord>(
            r#"
            SELECT key, pricing_plan, requests_made, last_reset
            FROM api_keys
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn reset_if_elapsed(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<IdentityRecord>, StorageError> {
        // 条件写入保证并发时只有一个请求完成重置
        let reset = sqlx::query_as::<_, IdentityRecord>(
            r#"
            UPDATE api_keys
            SET requests_made = 0, last_reset = $3
            WHERE key = $1 AND last_reset < $2
            RETURNING key, pricing_plan, requests_made, last_reset
            "#,
        )
        .bind(key)
        .bind(window_start)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match reset {
            Some(record) => {
                tracing::info!("Quota window reset for key ending in {}", key_suffix(key));
                Ok(Some(record))
            }
            None => self.lookup(key).await,
        }
    }

    async fn increment(&self, key: &str) -> Result<Option<i64>, StorageError> {
        let requests_made = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE api_keys
            SET requests_made = requests_made + 1
            WHERE key = $1
            RETURNING requests_made
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(requests_made)
    }

    async fn consume(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
        max_requests: i64,
    ) -> Result<Consumption, StorageError> {
        // 行锁下重新求值 WHERE，并发请求不会丢失计数
        let accepted = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE api_keys
            SET requests_made = CASE WHEN last_reset < $2 THEN 1 ELSE requests_made + 1 END,
                last_reset = CASE WHEN last_reset < $2 THEN $3 ELSE last_reset END
            WHERE key = $1
              AND $4 > 0
              AND (last_reset < $2 OR requests_made < $4)
            RETURNING requests_made
            "#,
        )
        .bind(key)
        .bind(window_start)
        .bind(now)
        .bind(max_requests)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(requests_made) = accepted {
            return Ok(Consumption::Accepted { requests_made });
        }

        match self.lookup(key).await? {
            Some(record) => Ok(Consumption::Exhausted {
                requests_made: record.requests_made,
            }),
            None => Ok(Consumption::NotFound),
        }
    }
}

//! 额度跟踪
//!
//! 每个 API Key 一个计数器，窗口从上一次重置的时刻起算，固定长度滑动，
//! 不按日历对齐。超过窗口长度后计数清零。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::database::{Consumption, IdentityRecord, IdentityStore};
use crate::error::{QuotaError, StorageError};
use crate::plan::PlanLimits;

const DEFAULT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn IdentityStore>,
    window: chrono::Duration,
    storage_timeout: Duration,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn IdentityStore>, window: Duration) -> Self {
        let window = chrono::Duration::from_std(window).unwrap_or_else(|_| {
            tracing::warn!("Quota window out of range, falling back to 24h");
            chrono::Duration::hours(24)
        });
        Self {
            store,
            window,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    pub fn with_default_window(store: Arc<dyn IdentityStore>) -> Self {
        Self::new(store, DEFAULT_WINDOW)
    }

    pub fn with_storage_timeout(mut self, storage_timeout: Duration) -> Self {
        self.storage_timeout = storage_timeout;
        self
    }

    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    async fn timed<T>(
        &self,
        op: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        tokio::time::timeout(self.storage_timeout, op)
            .await
            .map_err(|_| StorageError::Timeout)?
    }

    pub async fn lookup(&self, key: &str) -> Result<IdentityRecord, QuotaError> {
        self.timed(self.store.lookup(key))
            .await?
            .ok_or(QuotaError::IdentityNotFound)
    }

    /// 读取当前计数；窗口已过期时先原子地清零并返回 0
    pub async fn check_and_reset(&self, key: &str) -> Result<i64, QuotaError> {
        let now = Utc::now();
        let record = self
            .timed(self.store.reset_if_elapsed(key, self.window_start(now), now))
            .await?
            .ok_or(QuotaError::IdentityNotFound)?;
        Ok(record.requests_made)
    }

    /// 计数加一
    pub async fn increment(&self, key: &str) -> Result<i64, QuotaError> {
        self.timed(self.store.increment(key))
            .await?
            .ok_or(QuotaError::IdentityNotFound)
    }

    /// 检查窗口、比较上限并计数，整体在存储端原子执行
    ///
    /// 计数严格小于 `max_requests` 时才会被接受，所以每个窗口恰好允许
    /// `max_requests` 次请求。
    pub async fn try_acquire(
        &self,
        key: &str,
        limits: &PlanLimits,
    ) -> Result<Consumption, StorageError> {
        let now = Utc::now();
        let outcome = self
            .timed(
                self.store
                    .consume(key, self.window_start(now), now, limits.max_requests),
            )
            .await?;

        if let Consumption::Exhausted { requests_made } = outcome {
            tracing::debug!(
                "Quota exhausted: {} of {} requests used",
                requests_made,
                limits.max_requests
            );
        }
        Ok(outcome)
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::identity::{Consumption, IdentityStore};
use crate::database::models::identity::IdentityRecord;
use crate::error::StorageError;

/// 进程内身份存储，用于本地运行和测试
///
/// 每个操作都在同一把锁内完成，语义与 Postgres 实现一致。
#[derive(Default)]
pub struct MemoryIdentityStore {
    records: Mutex<HashMap<String, IdentityRecord>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = IdentityRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.key.clone(), record))
            .collect();
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn lookup(&self, key: &str) -> Result<Option<IdentityRecord>, StorageError> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn reset_if_elapsed(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<IdentityRecord>, StorageError> {
        let mut records = self.records.lock().await;
        let Some(record) = records.get_mut(key) else {
            return Ok(None);
        };
        if record.window_elapsed(window_start) {
            record.requests_made = 0;
            record.last_reset = now;
        }
        Ok(Some(record.clone()))
    }

    async fn increment(&self, key: &str) -> Result<Option<i64>, StorageError> {
        let mut records = self.records.lock().await;
        Ok(records.get_mut(key).map(|record| {
            record.requests_made += 1;
            record.requests_made
        }))
    }

    async fn consume(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
        max_requests: i64,
    ) -> Result<Consumption, StorageError> {
        let mut records = self.records.lock().await;
        let Some(record) = records.get_mut(key) else {
            return Ok(Consumption::NotFound);
        };

        let elapsed = record.window_elapsed(window_start);
        let current = if elapsed { 0 } else { record.requests_made };
        if current >= max_requests {
            return Ok(Consumption::Exhausted {
                requests_made: record.requests_made,
            });
        }

        if elapsed {
            record.last_reset = now;
        }
        record.requests_made = current + 1;
        Ok(Consumption::Accepted {
            requests_made: record.requests_made,
        })
    }
}

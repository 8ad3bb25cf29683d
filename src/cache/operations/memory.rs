use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::summary::CacheStore;
use crate::error::StorageError;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// 进程内缓存，用于测试和本地运行
///
/// 读取时清除该键的过期条目，写入时清扫全部过期条目。
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut entries = self.entries.lock().await;
        match entries.get(fingerprint) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(fingerprint);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        fingerprint: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), StorageError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            fingerprint.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }
}

//! 摘要缓存层
//!
//! 已放行的请求先按指纹查缓存，命中则跳过生成；未命中时同一指纹只发起一次
//! 生成调用，成功结果写回缓存。失败的生成结果不会进入缓存。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStore, SingleFlight, Summary, fingerprint};
use crate::error::{GenerationError, StorageError, SummaryError};
use crate::summarizer::{Summarizer, SummaryInput, SummaryOptions, SummarySource};

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// 结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Generated,
    /// 等待了同一指纹上正在进行的生成
    Coalesced,
}

#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub fingerprint: String,
    pub summary: Summary,
    /// 缓存中保存的序列化内容
    pub payload: Vec<u8>,
    pub origin: Origin,
}

pub struct SummaryService {
    cache: Arc<dyn CacheStore>,
    summarizer: Arc<dyn Summarizer>,
    in_flight: SingleFlight<Summary, GenerationError>,
    cache_ttl: Duration,
    generation_timeout: Duration,
    storage_timeout: Duration,
}

impl SummaryService {
    pub fn new(cache: Arc<dyn CacheStore>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            cache,
            summarizer,
            in_flight: SingleFlight::new(),
            cache_ttl: DEFAULT_CACHE_TTL,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn with_generation_timeout(mut self, generation_timeout: Duration) -> Self {
        self.generation_timeout = generation_timeout;
        self
    }

    pub fn with_storage_timeout(mut self, storage_timeout: Duration) -> Self {
        self.storage_timeout = storage_timeout;
        self
    }

    /// 只查缓存，不触发生成
    pub async fn cached(
        &self,
        source: &SummarySource,
        options: &SummaryOptions,
    ) -> Option<SummaryOutcome> {
        self.lookup(&fingerprint(source, options)).await
    }

    pub async fn summarize(
        &self,
        source: &SummarySource,
        input: SummaryInput,
    ) -> Result<SummaryOutcome, SummaryError> {
        let fingerprint = fingerprint(source, &input.options);

        if let Some(outcome) = self.lookup(&fingerprint).await {
            return Ok(outcome);
        }
        tracing::debug!("Summary cache miss for {}", &fingerprint[..12]);

        let summarizer = self.summarizer.clone();
        let cache = self.cache.clone();
        let key = fingerprint.clone();
        let cache_ttl = self.cache_ttl;
        let generation_timeout = self.generation_timeout;
        let storage_timeout = self.storage_timeout;

        let (result, leader) = self
            .in_flight
            .run(&fingerprint, move || async move {
                let summary = tokio::time::timeout(generation_timeout, summarizer.summarize(&input))
                    .await
                    .map_err(|_| GenerationError::Timeout)??;
                store(cache.as_ref(), &key, &summary, cache_ttl, storage_timeout).await;
                Ok(summary)
            })
            .await;

        let summary = result.map_err(|e| {
            tracing::warn!("Summary generation failed: {}", e);
            e
        })?;
        let payload = summary.to_bytes().map_err(StorageError::from)?;

        Ok(SummaryOutcome {
            fingerprint,
            summary,
            payload,
            origin: if leader {
                Origin::Generated
            } else {
                Origin::Coalesced
            },
        })
    }

    /// 读缓存失败或内容无法解析时按未命中处理
    async fn lookup(&self, fingerprint: &str) -> Option<SummaryOutcome> {
        let cached = match timed(self.storage_timeout, self.cache.get(fingerprint)).await {
            Ok(cached) => cached?,
            Err(e) => {
                tracing::warn!("Summary cache read failed, treating as miss: {}", e);
                return None;
            }
        };

        match Summary::from_bytes(&cached) {
            Ok(summary) => {
                tracing::debug!("Summary cache hit for {}", &fingerprint[..12]);
                Some(SummaryOutcome {
                    fingerprint: fingerprint.to_string(),
                    summary,
                    payload: cached,
                    origin: Origin::Cache,
                })
            }
            Err(e) => {
                tracing::warn!("Discarding undecodable cache entry: {}", e);
                None
            }
        }
    }
}

// 写缓存失败只记录日志，不影响已生成的结果
async fn store(
    cache: &dyn CacheStore,
    fingerprint: &str,
    summary: &Summary,
    ttl: Duration,
    storage_timeout: Duration,
) {
    let payload = match summary.to_bytes() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Failed to serialize summary for cache: {}", e);
            return;
        }
    };
    if let Err(e) = timed(storage_timeout, cache.set(fingerprint, &payload, ttl)).await {
        tracing::error!("Failed to write summary cache: {}", e);
    }
}

async fn timed<T>(
    limit: Duration,
    op: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, StorageError> {
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| StorageError::Timeout)?
}

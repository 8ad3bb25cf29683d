// 缓存模块
// 包含摘要缓存键、缓存数据结构、缓存存储以及并发去重

pub mod keys;
pub mod models;
pub mod operations;
pub mod singleflight;

// 重新导出常用类型和函数，方便其他模块使用
pub use keys::{fingerprint, summary_cache_key};
pub use models::Summary;
pub use operations::{CacheStore, MemoryCacheStore, RedisCacheStore};
pub use singleflight::SingleFlight;

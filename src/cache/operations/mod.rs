/// 缓存操作
/// 提供缓存存储的功能实现

// 摘要缓存存储
pub mod summary;

// 进程内缓存存储
pub mod memory;

// 重新导出常用操作
pub use memory::MemoryCacheStore;
pub use summary::{CacheStore, RedisCacheStore};

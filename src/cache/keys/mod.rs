/// 缓存键模块
/// 提供请求指纹和缓存键生成函数

// 摘要缓存键模块
pub mod summary_keys;

// 重新导出常用的键生成函数
pub use summary_keys::{fingerprint, summary_cache_key};

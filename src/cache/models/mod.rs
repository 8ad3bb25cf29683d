/// 缓存数据模型
/// 定义缓存数据的结构体

// 摘要缓存模型
pub mod summary;

// 重新导出常用类型
pub use summary::Summary;

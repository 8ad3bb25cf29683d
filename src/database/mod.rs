// 数据库模块
// 包含 API Key 身份记录及其存储实现

pub mod models; // 数据库实体定义
pub mod repositories; // 存储实现

// 重新导出常用类型，方便其他模块使用
pub use models::identity::IdentityRecord;
pub use repositories::{Consumption, IdentityStore, MemoryIdentityStore, PgIdentityStore};

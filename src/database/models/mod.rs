/// 数据库实体
pub mod identity;

pub use identity::IdentityRecord;

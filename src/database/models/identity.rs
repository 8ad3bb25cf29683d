use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::plan::Plan;

/// API Key 身份记录，对应 `api_keys` 表的一行
///
/// `requests_made` 始终等于自 `last_reset` 以来被接受的请求数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IdentityRecord {
    pub key: String,
    #[sqlx(rename = "pricing_plan")]
    pub plan: Plan,
    pub requests_made: i64,
    pub last_reset: DateTime<Utc>,
}

impl IdentityRecord {
    pub fn new(key: impl Into<String>, plan: Plan, last_reset: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            plan,
            requests_made: 0,
            last_reset,
        }
    }

    /// 窗口起点之前的重置记录视为过期
    pub fn window_elapsed(&self, window_start: DateTime<Utc>) -> bool {
        self.last_reset < window_start
    }
}

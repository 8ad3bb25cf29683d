//! 套餐额度表
//!
//! 每个套餐对应一组固定上限：窗口内请求数、单文件页数、单文件字符数。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 套餐等级，数据库中以小写文本存储
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

/// 套餐上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    /// 每个窗口内允许的请求数
    pub max_requests: i64,
    /// 单个文件的最大页数
    pub max_pages: u32,
    /// 单个文件的最大字符数
    pub max_chars: u64,
}

const FREE_LIMITS: PlanLimits = PlanLimits {
    max_requests: 50,
    max_pages: 25,
    max_chars: 125_000,
};

const PRO_LIMITS: PlanLimits = PlanLimits {
    max_requests: 500,
    max_pages: 50,
    max_chars: 250_000,
};

impl Plan {
    pub const fn limits(self) -> PlanLimits {
        match self {
            Plan::Free => FREE_LIMITS,
            Plan::Pro => PRO_LIMITS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 从提取结果中得到的文件规模
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileMetrics {
    pub pages: u32,
    pub chars: u64,
}

impl PlanLimits {
    /// 文件是否超出页数或字符数上限
    pub fn exceeded_by(&self, file: &FileMetrics) -> bool {
        file.pages > self.max_pages || file.chars > self.max_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_and_pro_limits() {
        assert_eq!(Plan::Free.limits().max_requests, 50);
        assert_eq!(Plan::Free.limits().max_pages, 25);
        assert_eq!(Plan::Free.limits().max_chars, 125_000);
        assert_eq!(Plan::Pro.limits().max_requests, 500);
        assert_eq!(Plan::Pro.limits().max_pages, 50);
        assert_eq!(Plan::Pro.limits().max_chars, 250_000);
    }

    #[test]
    fn plan_serializes_as_lowercase_name() {
        assert_eq!(Plan::Pro.to_string(), "pro");
        assert_eq!(serde_json::to_string(&Plan::Free).unwrap(), "\"free\"");
        assert!(serde_json::from_str::<Plan>("\"Pro\"").is_err());
    }

    #[test]
    fn file_at_the_limit_is_allowed() {
        let limits = Plan::Free.limits();
        let at_limit = FileMetrics { pages: 25, chars: 125_000 };
        assert!(!limits.exceeded_by(&at_limit));
        assert!(limits.exceeded_by(&FileMetrics { pages: 26, chars: 10 }));
        assert!(limits.exceeded_by(&FileMetrics { pages: 1, chars: 125_001 }));
    }
}

use serde::{Deserialize, Serialize};

use crate::utils::word_count;

/// 摘要缓存数据模型，序列化后的 JSON 即缓存值
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Summary {
    pub summary: String,
    pub original_length: usize,
    pub summary_length: usize,
}

impl Summary {
    pub fn new(summary: String, original_text: &str) -> Self {
        Self {
            summary_length: word_count(&summary),
            original_length: word_count(original_text),
            summary,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

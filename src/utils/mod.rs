use axum::Json;
use serde::Serialize;

use crate::result::ApiResult;

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResult<T>> {
    Json(ApiResult::success(data))
}

/// 按空白分词计数
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 日志中只输出 key 的末四位
pub fn key_suffix(key: &str) -> &str {
    let start = key
        .char_indices()
        .rev()
        .nth(3)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &key[start..]
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const RATE_LIMIT: i32 = 1005;
    pub const SIZE_LIMIT: i32 = 1006;
    pub const FETCH_FAILED: i32 = 5002;
    pub const GENERATION_FAILED: i32 = 5001;
    pub const INTERNAL_ERROR: i32 = 5000;
}

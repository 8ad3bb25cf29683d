use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::result::ApiResult;
use crate::utils::error_codes;

/// 身份存储或缓存后端错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage operation timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("identity not found")]
    IdentityNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 生成步骤错误，需要 Clone 以便分发给所有等待同一指纹的调用方
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation timed out")]
    Timeout,
    #[error("upstream generation failed: {0}")]
    Upstream(String),
    #[error("malformed generation output: {0}")]
    Malformed(String),
    #[error("generation returned an empty result")]
    Empty,
    #[error("generation task aborted: {0}")]
    Aborted(String),
}

impl From<tokio::task::JoinError> for GenerationError {
    fn from(err: tokio::task::JoinError) -> Self {
        GenerationError::Aborted(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// HTTP 层错误
#[derive(Debug)]
pub enum AppError {
    MissingApiKey,
    InvalidApiKey,
    QuotaExceeded,
    SizeExceeded,
    Validation(String),
    FetchFailed,
    GenerationFailed,
    InternalServerError,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::MissingApiKey => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "API Key required.".to_string(),
            ),
            AppError::InvalidApiKey => (
                StatusCode::FORBIDDEN,
                error_codes::PERMISSION_DENIED,
                "Invalid API key.".to_string(),
            ),
            AppError::QuotaExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                error_codes::RATE_LIMIT,
                "Request limit exceeded.".to_string(),
            ),
            AppError::SizeExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                error_codes::SIZE_LIMIT,
                "File exceeds the page or character limit of your plan.".to_string(),
            ),
            AppError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                message,
            ),
            AppError::FetchFailed => (
                StatusCode::BAD_GATEWAY,
                error_codes::FETCH_FAILED,
                "Failed to fetch the URL.".to_string(),
            ),
            AppError::GenerationFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::GENERATION_FAILED,
                "Failed to generate summary.".to_string(),
            ),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "Something went wrong... try again later.".to_string(),
            ),
        };

        let body = Json(ApiResult::<()>::error(code, &error_message));

        (status, body).into_response()
    }
}

impl From<SummaryError> for AppError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::Generation(_) => AppError::GenerationFailed,
            SummaryError::Storage(_) => AppError::InternalServerError,
        }
    }
}

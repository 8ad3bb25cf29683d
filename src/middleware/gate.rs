use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::database::Consumption;
use crate::error::{AppError, QuotaError};
use crate::plan::{FileMetrics, Plan, PlanLimits};
use crate::quota::QuotaTracker;
use crate::utils::key_suffix;

pub const API_KEY_HEADER: &str = "x-api-key";

/// 放行后附加到请求上的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub key: String,
    pub plan: Plan,
    /// 计入本次请求后的计数
    pub requests_made: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admitted(Admission),
    MissingIdentity,
    UnknownIdentity,
    QuotaExceeded { limit: i64 },
    /// 本次请求已计入额度
    SizeExceeded { limits: PlanLimits, file: FileMetrics },
    StorageFailure,
}

impl AdmissionDecision {
    pub fn status(&self) -> StatusCode {
        match self {
            AdmissionDecision::Admitted(_) => StatusCode::OK,
            AdmissionDecision::MissingIdentity => StatusCode::UNAUTHORIZED,
            AdmissionDecision::UnknownIdentity => StatusCode::FORBIDDEN,
            AdmissionDecision::QuotaExceeded { .. } | AdmissionDecision::SizeExceeded { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AdmissionDecision::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_result(self) -> Result<Admission, AppError> {
        match self {
            AdmissionDecision::Admitted(admission) => Ok(admission),
            AdmissionDecision::MissingIdentity => Err(AppError::MissingApiKey),
            AdmissionDecision::UnknownIdentity => Err(AppError::InvalidApiKey),
            AdmissionDecision::QuotaExceeded { .. } => Err(AppError::QuotaExceeded),
            AdmissionDecision::SizeExceeded { .. } => Err(AppError::SizeExceeded),
            AdmissionDecision::StorageFailure => Err(AppError::InternalServerError),
        }
    }
}

/// 请求准入：识别身份、检查并计数额度、检查文件规模
///
/// 顺序固定。计数发生在文件规模检查之前，超出页数或字符数的文件同样消耗
/// 一次额度。存储出错时拒绝请求。
pub struct RequestGate {
    quota: QuotaTracker,
}

impl RequestGate {
    pub fn new(quota: QuotaTracker) -> Self {
        Self { quota }
    }

    pub async fn admit(
        &self,
        identity_key: Option<&str>,
        file: Option<FileMetrics>,
    ) -> AdmissionDecision {
        let Some(key) = identity_key.map(str::trim).filter(|k| !k.is_empty()) else {
            return AdmissionDecision::MissingIdentity;
        };

        let record = match self.quota.lookup(key).await {
            Ok(record) => record,
            Err(QuotaError::IdentityNotFound) => {
                tracing::info!("Rejected unknown API key ending in {}", key_suffix(key));
                return AdmissionDecision::UnknownIdentity;
            }
            Err(QuotaError::Storage(e)) => {
                tracing::error!("Identity lookup failed: {}", e);
                return AdmissionDecision::StorageFailure;
            }
        };

        let limits = record.plan.limits();
        let requests_made = match self.quota.try_acquire(key, &limits).await {
            Ok(Consumption::Accepted { requests_made }) => requests_made,
            Ok(Consumption::Exhausted { .. }) => {
                tracing::info!(
                    "Request limit reached for {} key ending in {}",
                    record.plan,
                    key_suffix(key)
                );
                return AdmissionDecision::QuotaExceeded {
                    limit: limits.max_requests,
                };
            }
            Ok(Consumption::NotFound) => return AdmissionDecision::UnknownIdentity,
            Err(e) => {
                tracing::error!("Failed updating request counter: {}", e);
                return AdmissionDecision::StorageFailure;
            }
        };

        if let Some(file) = file {
            if limits.exceeded_by(&file) {
                tracing::info!(
                    "File of {} pages / {} chars exceeds {} plan limits",
                    file.pages,
                    file.chars,
                    record.plan
                );
                return AdmissionDecision::SizeExceeded { limits, file };
            }
        }

        AdmissionDecision::Admitted(Admission {
            key: key.to_string(),
            plan: record.plan,
            requests_made,
        })
    }
}

/// 从 `x-api-key` 读取身份并执行准入，放行的请求带上 [`Admission`] 扩展
pub async fn api_key_gate(
    State(gate): State<Arc<RequestGate>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let admission = gate.admit(key.as_deref(), None).await.into_result()?;
    req.extensions_mut().insert(admission);

    Ok(next.run(req).await)
}

use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use url::Url;

use crate::{
    AppState,
    error::AppError,
    middleware::Admission,
    service::{Origin, SummaryOutcome},
    summarizer::{SummaryInput, SummaryOptions, SummarySource, canonicalize_url, normalize_text},
    utils::success_to_api_response,
};

use super::model::{
    SummarizeTextRequest, SummarizeUrlRequest, TextSummaryResponse, UrlSummaryResponse,
};

/// 页面正文少于该字符数时不做摘要
const MIN_PAGE_CHARS: usize = 200;

/// 标记结果是否来自缓存，响应体保持与首次生成时一致
pub const CACHE_STATUS_HEADER: &str = "x-cache";

fn cache_status(origin: Origin) -> [(&'static str, &'static str); 1] {
    match origin {
        Origin::Cache => [(CACHE_STATUS_HEADER, "hit")],
        Origin::Generated | Origin::Coalesced => [(CACHE_STATUS_HEADER, "miss")],
    }
}

#[axum::debug_handler]
pub async fn summarize_text(
    Extension(admission): Extension<Admission>,
    State(state): State<AppState>,
    Json(req): Json<SummarizeTextRequest>,
) -> Result<impl IntoResponse, AppError> {
    let text = normalize_text(&req.text);
    if text.is_empty() {
        return Err(AppError::Validation("Text is required.".to_string()));
    }

    tracing::debug!(
        "Summarizing text for {} plan ({} requests in window)",
        admission.plan,
        admission.requests_made
    );

    let source = SummarySource::Text(text.clone());
    let input = SummaryInput {
        text,
        options: req.options,
    };
    let outcome = state.summaries.summarize(&source, input).await?;

    Ok((
        StatusCode::OK,
        cache_status(outcome.origin),
        success_to_api_response(TextSummaryResponse {
            summary: outcome.summary.summary,
            original_length: outcome.summary.original_length,
            summary_length: outcome.summary.summary_length,
        }),
    ))
}

#[axum::debug_handler]
pub async fn summarize_url(
    Extension(admission): Extension<Admission>,
    State(state): State<AppState>,
    Json(req): Json<SummarizeUrlRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.url.trim().is_empty() {
        return Err(AppError::Validation("URL is required.".to_string()));
    }
    let url = Url::parse(req.url.trim())
        .map_err(|_| AppError::Validation("URL is invalid.".to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation(
            "Only http and https URLs are supported.".to_string(),
        ));
    }

    let url = canonicalize_url(url);
    let source = SummarySource::Url(url.clone());

    tracing::debug!(
        "Summarizing {} for {} plan ({} requests in window)",
        url,
        admission.plan,
        admission.requests_made
    );

    // 缓存命中时不再抓取页面
    if let Some(outcome) = state.summaries.cached(&source, &req.options).await {
        return Ok((
            StatusCode::OK,
            cache_status(outcome.origin),
            success_to_api_response(url_response(outcome, &url, &req.options)),
        ));
    }

    let page = state.pages.fetch(&url).await.map_err(|e| {
        tracing::warn!("Fetching {} failed: {}", url, e);
        AppError::FetchFailed
    })?;
    let text = page.trim();
    if text.chars().count() < MIN_PAGE_CHARS {
        return Err(AppError::Validation(
            "Extracted text is too short for summarization.".to_string(),
        ));
    }

    let input = SummaryInput {
        text: text.to_string(),
        options: req.options.clone(),
    };
    let outcome = state.summaries.summarize(&source, input).await?;

    Ok((
        StatusCode::OK,
        cache_status(outcome.origin),
        success_to_api_response(url_response(outcome, &url, &req.options)),
    ))
}

fn url_response(outcome: SummaryOutcome, url: &Url, options: &SummaryOptions) -> UrlSummaryResponse {
    UrlSummaryResponse {
        summary: outcome.summary.summary,
        url: url.to_string(),
        language: options.language.clone(),
        length: options.length,
        summary_length: outcome.summary.summary_length,
    }
}

use serde::{Deserialize, Serialize};

use crate::summarizer::{SummaryLength, SummaryOptions};

#[derive(Debug, Deserialize)]
pub struct SummarizeTextRequest {
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub options: SummaryOptions,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeUrlRequest {
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub options: SummaryOptions,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextSummaryResponse {
    pub summary: String,
    pub original_length: usize,
    pub summary_length: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UrlSummaryResponse {
    pub summary: String,
    pub url: String,
    pub language: String,
    pub length: SummaryLength,
    pub summary_length: usize,
}

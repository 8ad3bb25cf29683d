//! 摘要生成步骤
//!
//! 生成是昂贵且受上游限流的外部调用，网关只通过 [`Summarizer`] 接口使用它。

mod gemini;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::models::Summary;
use crate::error::GenerationError;

pub use gemini::GeminiSummarizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    #[default]
    Short,
    Medium,
    Long,
}

impl SummaryLength {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryLength::Short => "short",
            SummaryLength::Medium => "medium",
            SummaryLength::Long => "long",
        }
    }
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 摘要选项，字段顺序即指纹中的序列化顺序
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SummaryOptions {
    #[serde(default)]
    pub length: SummaryLength,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub bullet_points: bool,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_style() -> String {
    "neutral".to_string()
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            length: SummaryLength::default(),
            language: default_language(),
            style: default_style(),
            bullet_points: false,
        }
    }
}

/// 待摘要的内容来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummarySource {
    Text(String),
    Url(Url),
    File(Vec<u8>),
}

/// 统一换行符并去掉首尾空白
pub fn normalize_text(raw: &str) -> String {
    raw.replace("\r\n", "\n").trim().to_string()
}

/// 规范化 URL：去掉片段，主机名由解析器转为小写
pub fn canonicalize_url(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

impl SummarySource {
    pub fn text(raw: &str) -> Self {
        SummarySource::Text(normalize_text(raw))
    }

    pub fn url(url: Url) -> Self {
        SummarySource::Url(canonicalize_url(url))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SummarySource::Text(_) => "text",
            SummarySource::Url(_) => "url",
            SummarySource::File(_) => "file",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SummarySource::Text(text) => text.as_bytes(),
            SummarySource::Url(url) => url.as_str().as_bytes(),
            SummarySource::File(bytes) => bytes,
        }
    }
}

/// 交给生成步骤的输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryInput {
    /// 已提取的正文
    pub text: String,
    pub options: SummaryOptions,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, input: &SummaryInput) -> Result<Summary, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_matches_request_defaults() {
        let parsed: SummaryOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, SummaryOptions::default());
        assert_eq!(parsed.length, SummaryLength::Short);
        assert_eq!(parsed.language, "en");
    }

    #[test]
    fn text_source_is_normalized() {
        assert_eq!(
            SummarySource::text("  line one\r\nline two \n"),
            SummarySource::Text("line one\nline two".to_string())
        );
    }

    #[test]
    fn url_source_drops_fragment_and_lowercases_host() {
        let url = Url::parse("https://Example.COM/article?id=7#comments").unwrap();
        let source = SummarySource::url(url);
        assert_eq!(source.as_bytes(), b"https://example.com/article?id=7");
    }
}

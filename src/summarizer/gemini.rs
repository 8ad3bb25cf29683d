use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SummaryInput, Summarizer};
use crate::cache::models::Summary;
use crate::error::GenerationError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini generateContent 客户端
pub struct GeminiSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ModelSummary {
    summary: String,
}

impl GeminiSummarizer {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

fn build_prompt(input: &SummaryInput) -> String {
    let options = &input.options;
    let format = if options.bullet_points {
        "a list of bullet points joined by newlines, each starting with \"- \""
    } else {
        "continuous prose"
    };
    format!(
        r#"Summarize the text below.
Length: {length} (short: 50-100 words, medium: 150-250 words, long: 300-450 words).
Language of the summary: {language}.
Style: {style}.
Format: {format}.
Do not add opinions or information that is not in the text.
Return only a JSON object of the form {{"summary": "<generated summary>"}}.

Text:
{text}"#,
        length = options.length,
        language = options.language,
        style = options.style,
        text = input.text,
    )
}

/// 去掉模型常带的 ```json 代码块标记后解析摘要
fn parse_model_output(raw: &str, original_text: &str) -> Result<Summary, GenerationError> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(GenerationError::Empty);
    }

    let parsed: ModelSummary = serde_json::from_str(cleaned)
        .map_err(|e| GenerationError::Malformed(e.to_string()))?;
    if parsed.summary.trim().is_empty() {
        return Err(GenerationError::Empty);
    }

    Ok(Summary::new(parsed.summary, original_text))
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, input: &SummaryInput) -> Result<Summary, GenerationError> {
        let prompt = build_prompt(input);
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: &prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Gemini returned status {}", status);
            return Err(GenerationError::Upstream(format!("status {}", status)));
        }

        let response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .unwrap_or_default();

        parse_model_output(&text, &input.text)
    }
}

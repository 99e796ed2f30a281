//! Gemini API連携
//!
//! Stage A: 画像 + 視覚分析プロンプト（build_visual_prompt）
//! Stage B: 同定プロンプト（build_identification_prompt）+ Google検索ツール

use super::provider::{ProviderReply, StampProvider};
use crate::config::Config;
use crate::error::{StampAiError, Result};
use crate::ingest::ImagePayload;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use stamp_ai_common::{build_identification_prompt, build_visual_prompt, Citation};
use std::time::Duration;
use tracing::{debug, warn};

/// 戦争などを題材にした歴史的切手がブロックされないよう全カテゴリを BLOCK_NONE にする
const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini APIリクエスト
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

/// Gemini APIレスポンス
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<ResponseContent>,
    grounding_metadata: Option<GroundingMetadata>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GroundingMetadata {
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiResponse {
    /// 先頭候補のテキストパートを連結
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn citations(&self) -> Vec<Citation> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|meta| {
                meta.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .map(|web| Citation {
                        uri: web.uri.clone(),
                        title: web.title.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 空レスポンスの理由（ログ用）
    fn empty_reason(&self) -> Option<String> {
        if let Some(reason) = self.prompt_feedback.as_ref().and_then(|f| f.block_reason.clone()) {
            return Some(format!("blockReason={}", reason));
        }
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.clone())
            .map(|reason| format!("finishReason={}", reason))
    }
}

fn safety_settings() -> Vec<SafetySetting> {
    HARM_CATEGORIES
        .iter()
        .map(|&category| SafetySetting {
            category,
            threshold: "BLOCK_NONE",
        })
        .collect()
}

/// Gemini REST クライアント
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    vision_model: String,
    search_model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: &str,
        vision_model: impl Into<String>,
        search_model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| StampAiError::Config(format!("APIキーが不正です: {}", e)))?,
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StampAiError::ApiCall(format!("HTTPクライアント生成エラー: {}", e)))?;

        Ok(Self {
            client,
            base_url: crate::config::DEFAULT_ENDPOINT.to_string(),
            vision_model: vision_model.into(),
            search_model: search_model.into(),
        })
    }

    /// 設定からクライアントを生成（APIキー必須）
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.get_api_key()?;
        let timeout = (config.timeout_seconds > 0).then(|| Duration::from_secs(config.timeout_seconds));
        Ok(Self::new(&api_key, &config.vision_model, &config.search_model, timeout)?
            .with_base_url(config.endpoint()))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn generate(&self, model: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!(model, "Gemini API呼び出し");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| StampAiError::ApiCall(format!("HTTPリクエスト失敗: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StampAiError::ApiCall(format!("Gemini API error {}: {}", status, body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| StampAiError::ApiCall(format!("レスポンス読み込み失敗: {}", e)))?;
        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| StampAiError::ApiParse(format!("Geminiレスポンス: {}", e)))?;

        if parsed.text().trim().is_empty() {
            warn!(model, reason = ?parsed.empty_reason(), "Geminiのレスポンス本文が空");
        }

        Ok(parsed)
    }
}

#[async_trait]
impl StampProvider for GeminiClient {
    async fn describe_image(&self, payload: &ImagePayload) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: payload.mime_type.clone(),
                            data: payload.data.clone(),
                        },
                    },
                    Part::Text { text: build_visual_prompt() },
                ],
            }],
            tools: Vec::new(),
            safety_settings: safety_settings(),
        };

        let response = self.generate(&self.vision_model, &request).await?;
        Ok(response.text())
    }

    async fn identify_and_value(&self, description: &str) -> Result<ProviderReply> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part::Text { text: build_identification_prompt(description) }],
            }],
            tools: vec![Tool { google_search: GoogleSearch {} }],
            safety_settings: safety_settings(),
        };

        let response = self.generate(&self.search_model, &request).await?;
        Ok(ProviderReply {
            text: response.text(),
            citations: response.citations(),
        })
    }
}

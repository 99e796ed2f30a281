//! 切手認識パイプライン
//!
//! 2段階解析処理:
//! - Stage A (Vision): 画像から説明文を抽出
//! - Stage B (Search): 説明文 + Web検索で同定・評価し、構造化レコードを得る
//!
//! Stage BはStage Aの出力に依存するため必ず逐次実行。リトライはしない。

mod gemini;
mod provider;

pub use gemini::GeminiClient;
pub use provider::{ProviderReply, StampProvider};

use crate::error::{StampAiError, Result};
use crate::ingest::ImagePayload;
use stamp_ai_common::{extract_source_urls, parse_identification, Error as ParseError, StampRecord};
use tracing::{debug, info};

/// パイプラインの段階（進捗表示用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    VisualAnalysis,
    CatalogSearch,
}

/// Stage A: 視覚分析
pub async fn describe_stamp<P>(provider: &P, payload: &ImagePayload) -> Result<String>
where
    P: StampProvider + ?Sized,
{
    info!(mime_type = %payload.mime_type, "視覚分析を開始");

    let description = provider
        .describe_image(payload)
        .await
        .map_err(|e| StampAiError::VisualAnalysis(e.to_string()))?;

    let description = description.trim();
    if description.is_empty() {
        return Err(StampAiError::VisualAnalysis(
            "空のレスポンス（画像が不鮮明、またはブロックされた可能性）".into(),
        ));
    }

    debug!(chars = description.chars().count(), "視覚分析完了");
    Ok(description.to_string())
}

/// Stage B: 同定・評価
pub async fn identify_stamp<P>(provider: &P, description: &str) -> Result<StampRecord>
where
    P: StampProvider + ?Sized,
{
    info!("カタログ照合を開始");

    let reply = provider
        .identify_and_value(description)
        .await
        .map_err(|e| StampAiError::Identification(e.to_string()))?;

    if reply.text.trim().is_empty() {
        return Err(StampAiError::Identification("空のレスポンス".into()));
    }

    let record = parse_identification(&reply.text).into_result().map_err(|e| {
        debug!(raw = %reply.text, "同定レスポンスのパース失敗");
        let ParseError::Parse(reason) = e;
        StampAiError::ApiParse(reason)
    })?;

    let sources = extract_source_urls(&reply.citations);
    debug!(sources = sources.len(), title = %record.title, "カタログ照合完了");
    Ok(record.with_sources(sources))
}

/// 2段階解析を実行
///
/// `on_stage` は各段階の開始時に呼ばれる。
pub async fn recognize_stamp<P>(
    provider: &P,
    payload: &ImagePayload,
    mut on_stage: impl FnMut(Stage),
) -> Result<StampRecord>
where
    P: StampProvider + ?Sized,
{
    on_stage(Stage::VisualAnalysis);
    let description = describe_stamp(provider, payload).await?;

    on_stage(Stage::CatalogSearch);
    identify_stamp(provider, &description).await
}

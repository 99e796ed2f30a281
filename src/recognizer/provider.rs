//! AIプロバイダ境界
//!
//! パイプラインがプロバイダに求めるのは2つの論理操作だけ:
//! 画像の説明文生成と、検索グラウンディング付きの同定・評価。

use crate::error::Result;
use crate::ingest::ImagePayload;
use async_trait::async_trait;
use stamp_ai_common::Citation;

/// Stage Bの生レスポンス
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderReply {
    /// JSONを含むことが期待される本文
    pub text: String,
    /// グラウンディング出典
    pub citations: Vec<Citation>,
}

#[async_trait]
pub trait StampProvider: Send + Sync {
    /// Stage A: 画像から説明文を得る（空文字は呼び出し側で失敗扱い）
    async fn describe_image(&self, payload: &ImagePayload) -> Result<String>;

    /// Stage B: 説明文から同定・評価を得る
    async fn identify_and_value(&self, description: &str) -> Result<ProviderReply>;
}

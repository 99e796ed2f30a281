//! 切手データの型定義
//!
//! CLIと解析パイプラインで共有される型:
//! - StampRecord: Stage B（同定・評価）の最終出力
//! - CollectedStamp: コレクションに保存された StampRecord
//! - Citation: 検索グラウンディングの出典

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 歴史説明の最大文字数
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// 画像MIMEタイプが記録されていない旧データの既定値
pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

/// 希少度（AIの判定結果、ローカルでは計算しない）
///
/// 保存形式はトルコ語ラベル（"Nadir" / "Az Bulunur" / "Yaygın"）。
/// 読み込み時は英語名も受け付け、未知のラベルは Common に倒す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rarity {
    Rare,
    Scarce,
    #[default]
    Common,
}

impl Rarity {
    pub fn label(&self) -> &'static str {
        match self {
            Rarity::Rare => "Nadir",
            Rarity::Scarce => "Az Bulunur",
            Rarity::Common => "Yaygın",
        }
    }

    /// ラベル文字列から希少度を判定（大文字小文字・前後空白を無視）
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "nadir" | "rare" => Some(Rarity::Rare),
            "az bulunur" | "scarce" => Some(Rarity::Scarce),
            "yaygın" | "yaygin" | "common" => Some(Rarity::Common),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Rarity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Rarity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label
            .as_deref()
            .and_then(Rarity::from_label)
            .unwrap_or_default())
    }
}

/// AIが導出した切手情報
///
/// `Default` は全フィールドがフォールバック値のレコード。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampRecord {
    pub title: String,
    pub country: String,
    pub year: String,
    #[serde(default)]
    pub rarity: Rarity,
    pub value_usd: String,
    pub description: String,
    pub catalog_ref: String,

    /// 状態が価値に与える影響
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_note: Option<String>,

    /// 特別な希少理由（エラー印刷、発行中止など）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity_reason: Option<String>,

    /// 出典URL（重複なし、初出順）
    #[serde(default)]
    pub grounding_urls: Vec<String>,
}

impl StampRecord {
    pub const FALLBACK_TITLE: &'static str = "Bilinmeyen Pul";
    pub const FALLBACK_COUNTRY: &'static str = "Bilinmiyor";
    pub const FALLBACK_YEAR: &'static str = "????";
    pub const FALLBACK_VALUE: &'static str = "N/A";
    pub const FALLBACK_DESCRIPTION: &'static str = "Açıklama bulunamadı.";
    pub const FALLBACK_CATALOG_REF: &'static str = "Katalog bilgisi yok";

    /// 出典URLを差し替えた新しいレコードを返す
    pub fn with_sources(mut self, urls: Vec<String>) -> Self {
        self.grounding_urls = urls;
        self
    }
}

impl Default for StampRecord {
    fn default() -> Self {
        Self {
            title: Self::FALLBACK_TITLE.into(),
            country: Self::FALLBACK_COUNTRY.into(),
            year: Self::FALLBACK_YEAR.into(),
            rarity: Rarity::Common,
            value_usd: Self::FALLBACK_VALUE.into(),
            description: Self::FALLBACK_DESCRIPTION.into(),
            catalog_ref: Self::FALLBACK_CATALOG_REF.into(),
            condition_note: None,
            rarity_reason: None,
            grounding_urls: Vec::new(),
        }
    }
}

/// 説明文を最大文字数に収める（文字境界で切り、末尾に…）
pub fn clamp_description(text: &str) -> String {
    if text.chars().count() <= MAX_DESCRIPTION_CHARS {
        return text.to_string();
    }
    let mut clamped: String = text.chars().take(MAX_DESCRIPTION_CHARS - 1).collect();
    clamped.push('…');
    clamped
}

/// コレクションに保存された切手
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedStamp {
    #[serde(flatten)]
    pub record: StampRecord,

    pub id: String,

    /// 追加日時（UNIXエポックからのミリ秒）
    pub date_added: i64,

    /// 保存時点の画像（Base64）
    pub image_base64: String,

    #[serde(default = "default_image_mime_type")]
    pub image_mime_type: String,
}

fn default_image_mime_type() -> String {
    DEFAULT_IMAGE_MIME_TYPE.to_string()
}

/// グラウンディング出典（Web URIを持たない場合もある）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Citation {
    pub fn web(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            title: None,
        }
    }
}

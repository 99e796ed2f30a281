//! プロンプト生成モジュール
//!
//! - build_visual_prompt: Stage A（画像の視覚分析）用プロンプト
//! - build_identification_prompt: Stage B（検索グラウンディング付き同定・評価）用プロンプト

use crate::types::Rarity;

/// 相互参照させるカタログ
pub const CATALOG_SOURCES: &[&str] = &[
    "Scott",
    "Michel",
    "Stanley Gibbons",
    "Yvert et Tellier",
    "Colnect",
];

/// Stage Aプロンプト（画像と一緒に送る）
pub fn build_visual_prompt() -> String {
    r#"Act as a professional expert philatelist. Examine this stamp image in extreme detail.
Describe the following visual elements precisely:
1. Country of origin (look for text on the stamp).
2. Denomination/Value.
3. Central subject (person, event, symbol).
4. Color(s).
5. Perforation condition (imperforate vs perforated).
6. Cancellation marks (used vs mint appearance).
7. Any overprints or surcharges.

Return a single detailed paragraph description."#
        .to_string()
}

/// Stage Bプロンプト生成
///
/// # Arguments
/// * `visual_description` - Stage Aが返した説明文
///
/// # Returns
/// 同定・評価用のプロンプト文字列（出力言語はトルコ語）
pub fn build_identification_prompt(visual_description: &str) -> String {
    let catalogs = CATALOG_SOURCES.join(", ");
    let rarities = [Rarity::Rare, Rarity::Scarce, Rarity::Common]
        .iter()
        .map(|r| format!("\"{}\"", r.label()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"I have a stamp with the following visual description:
"{visual_description}"

Act as the "GlobalStamp Collector AI". Identify this stamp, value it, and provide historical context.

**Sources:** You MUST cross-reference data from reputable authorities like {catalogs} via Google Search. Do not rely on marketplace listings for identification, only for rough market sentiment if catalogs are unavailable.

**Output Language:** Turkish (Türkçe).

**Required fields in JSON format:**
{{
  "title": "Name of the stamp",
  "country": "Country name (in Turkish)",
  "year": "Year of issue",
  "rarity": one of [{rarities}],
  "valueUsd": "Estimated price range in USD, e.g. $10 - $50",
  "description": "Origin, depicted figure/event and significance, maximum 4 sentences",
  "catalogRef": "Likely catalog number, e.g. Scott #123",
  "conditionNote": "How condition (mint/used) affects this stamp's value",
  "rarityReason": "Special reason for rarity, e.g. \"Geri çekildi\", \"Tedavüle çıkmadı\", \"Hatalı Basım\", \"Sürşarj Hatası\"; null for a standard stamp"
}}

Output ONLY raw JSON."#
    )
}

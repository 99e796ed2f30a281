//! APIレスポンスパーサー
//!
//! Stage B（同定・評価）のレスポンスは整形済みJSONとは限らないため、
//! 次の順でStampRecordの復元を試みる:
//! 1. Markdownコードフェンスを除去して直接パース
//! 2. 本文中の最初の対応の取れた `{...}` を探してパース
//! 3. どちらも失敗したら `ParseOutcome::Failed`
//!
//! 欠けたフィールドは必ずフォールバック値で埋める。

use crate::error::{Error, Result};
use crate::types::{clamp_description, Citation, Rarity, StampRecord};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```(?:[A-Za-z]+)?\s*(.*?)\s*```").expect("invalid fence regex");
}

/// パース結果（成功時はフォールバック適用済みのレコード）
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(StampRecord),
    Failed(String),
}

impl ParseOutcome {
    pub fn into_result(self) -> Result<StampRecord> {
        match self {
            ParseOutcome::Parsed(record) => Ok(record),
            ParseOutcome::Failed(reason) => Err(Error::Parse(reason)),
        }
    }
}

/// Markdownコードフェンスを除去
///
/// フェンスブロックがあればその中身を、なければ残ったフェンス記号を
/// 取り除いた全文を返す。
///
/// # Examples
/// ```
/// use stamp_ai_common::strip_code_fence;
///
/// let text = "```json\n{\"title\": \"A\"}\n```";
/// assert_eq!(strip_code_fence(text), "{\"title\": \"A\"}");
/// ```
pub fn strip_code_fence(text: &str) -> String {
    if let Some(caps) = FENCED_BLOCK.captures(text) {
        if let Some(inner) = caps.get(1) {
            return inner.as_str().trim().to_string();
        }
    }
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// 最初の対応の取れた `{...}` 部分文字列を探す
///
/// 文字列リテラル内の括弧とエスケープは数えない。
pub fn find_balanced_object(text: &str) -> Option<&str> {
    balanced_objects(text).next()
}

fn balanced_objects(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(move |(start, _)| balanced_from(text, start))
}

fn balanced_from(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// JSONとして読めればオブジェクトを返す（配列なら最初のオブジェクト）
fn parse_object(json_str: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(json_str.trim()).ok()? {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.into_iter().find_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        }),
        _ => None,
    }
}

/// Stage Bレスポンスを StampRecord に変換
///
/// 出典URLはレスポンス本文ではなくメタデータ由来のため、ここでは空のまま。
pub fn parse_identification(response: &str) -> ParseOutcome {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return ParseOutcome::Failed("空のレスポンス".into());
    }

    let cleaned = strip_code_fence(trimmed);
    if let Some(map) = parse_object(&cleaned) {
        return ParseOutcome::Parsed(record_from_object(&map));
    }

    if let Some(map) = balanced_objects(trimmed).find_map(parse_object) {
        return ParseOutcome::Parsed(record_from_object(&map));
    }

    ParseOutcome::Failed("レスポンスにJSONオブジェクトが見つかりません".into())
}

/// JSONオブジェクトからレコードを構築（欠損はフォールバック値）
pub fn record_from_object(map: &Map<String, Value>) -> StampRecord {
    let fallback = StampRecord::default();

    StampRecord {
        title: get_text(map, &["title"]).unwrap_or(fallback.title),
        country: get_text(map, &["country"]).unwrap_or(fallback.country),
        year: get_text(map, &["year"]).unwrap_or(fallback.year),
        rarity: get_text(map, &["rarity"])
            .and_then(|label| Rarity::from_label(&label))
            .unwrap_or(fallback.rarity),
        value_usd: get_text(map, &["valueUsd", "value_usd"]).unwrap_or(fallback.value_usd),
        description: get_text(map, &["description"])
            .map(|d| clamp_description(&d))
            .unwrap_or(fallback.description),
        catalog_ref: get_text(map, &["catalogRef", "catalog_ref"]).unwrap_or(fallback.catalog_ref),
        condition_note: get_text(map, &["conditionNote", "condition_note"]),
        rarity_reason: get_text(map, &["rarityReason", "rarity_reason"]),
        grounding_urls: Vec::new(),
    }
}

/// キー候補を順に探し、空でない文字列を返す（数値などは文字列化）
fn get_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let text = match map.get(*key)? {
            Value::Null => return None,
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        (!text.is_empty()).then_some(text)
    })
}

/// URLの重複を除去（初出順を維持）
pub fn dedup_urls<I>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// グラウンディング出典からWeb URIを抽出（重複除去済み）
pub fn extract_source_urls(citations: &[Citation]) -> Vec<String> {
    dedup_urls(
        citations
            .iter()
            .filter_map(|c| c.uri.as_deref())
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
            .map(str::to_string),
    )
}

//! 端末向けの表示整形（結果カード・コレクション一覧・進捗文言）

use crate::session::AnalysisStatus;
use chrono::{DateTime, Local};
use stamp_ai_common::{CollectedStamp, Rarity, StampRecord};

/// 進捗表示の見出しと説明
pub fn status_message(status: AnalysisStatus) -> Option<(&'static str, &'static str)> {
    match status {
        AnalysisStatus::AnalyzingImage => Some((
            "Görsel Detaylar İnceleniyor...",
            "Yapay zeka, perfore, damga ve tasarım detaylarını analiz ediyor.",
        )),
        AnalysisStatus::SearchingCatalogs => Some((
            "Kataloglar Taranıyor...",
            "Scott, Michel ve Stanley Gibbons veritabanları kontrol ediliyor.",
        )),
        _ => None,
    }
}

fn rarity_badge(rarity: Rarity) -> String {
    let mark = match rarity {
        Rarity::Rare => "★★★",
        Rarity::Scarce => "★★",
        Rarity::Common => "★",
    };
    format!("{} {}", mark, rarity.label())
}

/// 結果カード
pub fn stamp_card(record: &StampRecord) -> String {
    let mut lines = vec![
        format!("🏷  {}", record.title),
        format!("   {} · {} · {}", record.country, record.year, rarity_badge(record.rarity)),
        String::new(),
        format!("   Tahmini Değer : {}", record.value_usd),
        format!("   Katalog       : {}", record.catalog_ref),
    ];

    if let Some(reason) = &record.rarity_reason {
        lines.push(format!("   Nadirlik Nedeni: {}", reason));
    }
    if let Some(note) = &record.condition_note {
        lines.push(format!("   Durum Notu    : {}", note));
    }

    lines.push(String::new());
    lines.push(format!("   {}", record.description));

    if !record.grounding_urls.is_empty() {
        lines.push(String::new());
        lines.push("   Kaynaklar:".to_string());
        lines.extend(record.grounding_urls.iter().map(|url| format!("   - {}", url)));
    }

    lines.join("\n")
}

/// 追加日時（ローカル時刻）
pub fn format_date_added(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&Local).format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|| "?".to_string())
}

/// コレクション一覧の1行
pub fn collection_row(stamp: &CollectedStamp) -> String {
    format!(
        "{}  {}  [{}]  {} · {}  ({})",
        stamp.id,
        format_date_added(stamp.date_added),
        stamp.record.rarity.label(),
        stamp.record.title,
        stamp.record.value_usd,
        stamp.record.country,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_card_optional_sections() {
        let record = StampRecord {
            title: "Cape of Good Hope 1c".to_string(),
            rarity: Rarity::Rare,
            rarity_reason: Some("Hatalı Basım".to_string()),
            grounding_urls: vec!["https://colnect.com/a".to_string()],
            ..Default::default()
        };

        let card = stamp_card(&record);
        assert!(card.contains("Cape of Good Hope 1c"));
        assert!(card.contains("★★★ Nadir"));
        assert!(card.contains("Nadirlik Nedeni: Hatalı Basım"));
        assert!(!card.contains("Durum Notu"));
        assert!(card.contains("- https://colnect.com/a"));
    }

    #[test]
    fn test_stamp_card_fallback_record() {
        let card = stamp_card(&StampRecord::default());
        assert!(card.contains("Bilinmeyen Pul"));
        assert!(!card.contains("Kaynaklar"));
    }

    #[test]
    fn test_status_message() {
        assert!(status_message(AnalysisStatus::AnalyzingImage).is_some());
        assert!(status_message(AnalysisStatus::SearchingCatalogs).is_some());
        assert!(status_message(AnalysisStatus::Complete).is_none());
    }

    #[test]
    fn test_format_date_added_out_of_range() {
        assert_eq!(format_date_added(i64::MAX), "?");
        assert!(!format_date_added(1_700_000_000_000).is_empty());
    }
}

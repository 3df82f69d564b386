//! チャンネル名の正規化
//!
//! ボイスチャンネルの表示名は空白の揺れを含むことがあるため、
//! 比較用・テキストチャンネル命名用の正規形をここで一元的に作る。
//! いずれも決定的な純関数で、空入力は空出力になる。

use crate::types::DateKey;
use regex_lite::Regex;
use std::sync::OnceLock;

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("正規表現のコンパイルに失敗"))
}

fn hyphen_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-+").expect("正規表現のコンパイルに失敗"))
}

/// ボイスチャンネル名を比較用に正規化（空白保持形）
///
/// 連続する空白を半角スペース1つに畳み、前後の空白を除去する。
pub fn normalize_voice_channel_name(name: &str) -> String {
    whitespace_run().replace_all(name, " ").trim().to_string()
}

/// テキストチャンネル名用に正規化（ハイフン形）
///
/// 連続する空白をハイフン1つに畳み、連続するハイフンも1つに畳んだうえで
/// 前後のハイフンを除去する。
///
/// # Examples
///
/// ```
/// # use vc_mirror::normalize::normalize_text_channel_name;
/// assert_eq!(normalize_text_channel_name("Foo   Bar"), "Foo-Bar");
/// assert_eq!(normalize_text_channel_name("  --Foo--  "), "Foo");
/// ```
pub fn normalize_text_channel_name(name: &str) -> String {
    let hyphenated = whitespace_run().replace_all(name.trim(), "-").to_string();
    let collapsed = hyphen_run().replace_all(&hyphenated, "-").to_string();
    collapsed.trim_matches('-').to_string()
}

/// 転記先テキストチャンネルの名前を組み立てる
///
/// `"<YYYYMMDD>_<正規化済みボイスチャンネル名>"` 形式。
/// 既存チャンネルの採用（アダプション）が成立するためには
/// この形式がビット単位で一致している必要がある。
pub fn destination_channel_name(date_key: &DateKey, voice_channel_name: &str) -> String {
    format!(
        "{}_{}",
        date_key,
        normalize_text_channel_name(voice_channel_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_name_collapses_whitespace() {
        assert_eq!(normalize_voice_channel_name("Lounge  A"), "Lounge A");
        assert_eq!(normalize_voice_channel_name("  作業部屋   1  "), "作業部屋 1");
    }

    #[test]
    fn test_text_name_hyphen_form() {
        assert_eq!(normalize_text_channel_name("Foo   Bar"), "Foo-Bar");
        assert_eq!(normalize_text_channel_name("  --Foo--  "), "Foo");
        assert_eq!(normalize_text_channel_name("A - B"), "A-B");
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert_eq!(normalize_voice_channel_name(""), "");
        assert_eq!(normalize_text_channel_name(""), "");
    }

    #[test]
    fn test_destination_channel_name_format() {
        let date_key = "20250615".to_string();
        assert_eq!(
            destination_channel_name(&date_key, "Lounge  A"),
            "20250615_Lounge-A"
        );
    }

    #[test]
    fn test_destination_channel_name_is_deterministic() {
        let date_key = "20250615".to_string();
        let first = destination_channel_name(&date_key, "雑談  部屋");
        let second = destination_channel_name(&date_key, "雑談  部屋");
        assert_eq!(first, second);
        assert_eq!(first, "20250615_雑談-部屋");
    }
}

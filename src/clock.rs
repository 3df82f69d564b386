use crate::types::DateKey;
use chrono::{DateTime, FixedOffset, Utc};

/// 基準タイムゾーンのオフセット秒数（JST, UTC+9）
///
/// DST のない固定オフセット。日付キーの算出と
/// ログ・埋め込みのタイムスタンプ表示に使う。
const JST_OFFSET_SECS: i32 = 9 * 3600;

/// JST の固定オフセットを返す
pub fn jst() -> FixedOffset {
    // +9h は常に有効なオフセット
    FixedOffset::east_opt(JST_OFFSET_SECS).expect("JST オフセットの生成に失敗")
}

/// 現在時刻の供給源
///
/// 日付ロールオーバーのテストで時刻を差し替えられるようにトレイトで切る。
/// 本番では `SystemClock` を使う。
pub trait Clock: Send + Sync {
    /// JST での現在時刻
    fn now(&self) -> DateTime<FixedOffset>;
}

/// システム時計
///
/// `Utc::now()` を JST に変換して返す。
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&jst())
    }
}

/// 当日の日付キー（JST の `YYYYMMDD`）を算出
pub fn date_key(clock: &dyn Clock) -> DateKey {
    clock.now().format("%Y%m%d").to_string()
}

/// ログ・フッター用のタイムスタンプ（`YYYY-MM-DD HH:MM:SS`）
pub fn footer_timestamp(clock: &dyn Clock) -> String {
    clock.now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// メッセージ転記の作成者行用タイムスタンプ（`YYYY/MM/DD HH:MM:SS`）
///
/// 転記元メッセージの作成時刻（UTC）を JST に変換して整形する。
pub fn message_timestamp(sent_at: DateTime<Utc>) -> String {
    sent_at
        .with_timezone(&jst())
        .format("%Y/%m/%d %H:%M:%S")
        .to_string()
}


#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_key_format() {
        let clock = ManualClock::at("2025-06-15 23:30:00");
        assert_eq!(date_key(&clock), "20250615");
    }

    #[test]
    fn test_date_key_rollover() {
        let clock = ManualClock::at("2025-06-15 23:59:59");
        assert_eq!(date_key(&clock), "20250615");
        clock.advance_days(1);
        assert_eq!(date_key(&clock), "20250616");
    }

    #[test]
    fn test_footer_timestamp_format() {
        let clock = ManualClock::at("2025-06-15 09:05:00");
        assert_eq!(footer_timestamp(&clock), "2025-06-15 09:05:00");
    }

    #[test]
    fn test_message_timestamp_converts_to_jst() {
        // UTC 15:30 は JST では翌日になる手前の 00:30
        let sent_at = Utc.with_ymd_and_hms(2025, 6, 15, 15, 30, 0).unwrap();
        assert_eq!(message_timestamp(sent_at), "2025/06/16 00:30:00");
    }

    #[test]
    fn test_system_clock_is_jst() {
        let clock = SystemClock;
        assert_eq!(clock.now().offset().local_minus_utc(), 9 * 3600);
    }
}

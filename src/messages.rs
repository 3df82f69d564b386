//! 移動完了メッセージ
//!
//! 「おやんも」コマンドで移動が完了したときにランダムで 1 つ選んで表示する。

use rand::seq::IndexedRandom;

/// 完了メッセージのテンプレート（`{username}` を表示名で置換する）
const COMPLETION_MESSAGES: [&str; 4] = [
    "✅ いやぁー限界だったねぇ🥰おやんも🌙 {username} ",
    "✅ {username} すやぴしたの❔きゃわじゃん🥰また明日ね👋🏻",
    "✅ すーぐ寝るじゃん😪 {username} いい夢みろよ😘",
    "✅ え!? {username} どゆことぉ？寝たん？ねぇねぇ。",
];

/// 移動完了メッセージをランダムで取得
pub fn random_completion_message(username: &str) -> String {
    let mut rng = rand::rng();
    COMPLETION_MESSAGES
        .choose(&mut rng)
        .unwrap_or(&COMPLETION_MESSAGES[0])
        .replace("{username}", username)
}

/// ギルド（サーバー）ID
///
/// プラットフォーム側が採番する不透明な整数ID。
pub type GuildId = u64;

/// チャンネルID
///
/// ボイスチャンネル・テキストチャンネル・カテゴリ共通の整数ID。
pub type ChannelId = u64;

/// ユーザーID
pub type UserId = u64;

/// メッセージID
pub type MessageId = u64;

/// 日付キー
///
/// 基準タイムゾーン（JST, UTC+9）での暦日を `YYYYMMDD` 形式で表した文字列。
/// キャッシュの有効性判定と転記先チャンネル名のプレフィックスの両方に使う。
pub type DateKey = String;

/// チャンネルへの参照
///
/// ID と表示名のペア。実体はプラットフォーム側が所有し、
/// このシステムは参照するだけ。
///
/// # Examples
///
/// ```
/// # use vc_mirror::types::ChannelRef;
/// let vc = ChannelRef {
///     id: 42,
///     name: "Lounge A".to_string(),
/// };
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub name: String,
}

/// カテゴリへの参照
///
/// チャンネルをまとめるプラットフォーム上のグルーピングコンテナ。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryRef {
    pub id: ChannelId,
    pub name: String,
}

/// マッピングキャッシュのエントリ
///
/// ボイスチャンネル ID から当日分の転記先テキストチャンネルへの対応。
///
/// `date_key` はエントリを作成した日（JST）。転記先チャンネル名には日付が
/// 埋め込まれているため、日付が変わったエントリは「存在していても誤り」であり、
/// 参照時に破棄される。
#[derive(Clone, Debug)]
pub struct MappingEntry {
    /// 転記元ボイスチャンネルの ID
    pub source_id: ChannelId,

    /// 転記先テキストチャンネル
    pub destination: ChannelRef,

    /// エントリ作成日（JST の `YYYYMMDD`）
    pub date_key: DateKey,
}

/// テキストチャンネルの一覧情報
///
/// 大喜利の投下先候補やアーカイブ削除の対象選定に使う。
/// 並び順の安定化のためカテゴリと自身の position を持つ。
#[derive(Clone, Debug)]
pub struct TextChannelInfo {
    pub id: ChannelId,
    pub name: String,
    /// 所属カテゴリの ID（未所属なら None）
    pub parent_id: Option<ChannelId>,
    /// カテゴリ内での表示位置
    pub position: u16,
    /// 所属カテゴリの表示位置（未所属なら None）
    pub category_position: Option<u16>,
}

/// ボイスチャンネル参加中のメンバー
#[derive(Clone, Debug)]
pub struct MemberRef {
    pub user_id: UserId,
    pub display_name: String,
    /// 参加中のボイスチャンネル（未参加なら None）
    pub voice_channel: Option<ChannelId>,
}

/// 埋め込みメッセージのペイロード
///
/// プラットフォーム SDK に依存しない埋め込みの中間表現。
/// 実際の描画はゲートウェイアダプタが SDK のビルダーに変換して行う。
#[derive(Clone, Debug, Default)]
pub struct EmbedPayload {
    pub title: Option<String>,
    pub description: String,
    /// RGB カラーコード（例: 0x2ECC71）
    pub color: u32,
    pub author_name: Option<String>,
    pub author_icon_url: Option<String>,
    pub footer: Option<String>,
    pub image_url: Option<String>,
}

/// 入室ログの埋め込みカラー（緑）
pub const COLOR_JOIN: u32 = 0x2ECC71;

/// 退出ログの埋め込みカラー（赤）
pub const COLOR_LEAVE: u32 = 0xE74C3C;

/// メッセージ転記の埋め込みカラー（水色）
pub const COLOR_MIRROR: u32 = 0x82CDED;

/// コマンド実行中表示のカラー（Discord Blurple）
pub const COLOR_COMMAND: u32 = 0x5865F2;

/// 移動完了表示のカラー（黄緑）
pub const COLOR_SUCCESS: u32 = 0x32CD32;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub relocate: RelocateConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

/// Bot 全体の設定
///
/// # デフォルト値
///
/// - `category_name`: "インチャテキスト" (転記先チャンネルを置くカテゴリ)
/// - `log_level`: "info"
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    #[serde(default = "default_category_name")]
    pub category_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// マッピングキャッシュの設定
///
/// # デフォルト値
///
/// - `max_size`: 10 件
/// - `cleanup_interval_secs`: 3600 秒 (定期スイープの間隔)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// メッセージ・入退室転記の設定
///
/// # デフォルト値
///
/// - `excluded_category_ids`: 空 (転記対象外とするカテゴリなし)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorConfig {
    /// 転記対象外とするカテゴリ（ID で指定）
    #[serde(default)]
    pub excluded_category_ids: Vec<u64>,
}

/// 「おやんも」(メンバー移動) コマンドの設定
///
/// # デフォルト値
///
/// - `target_voice_channel_id`: 0 (未設定。設定されるまでコマンドは失敗する)
/// - `countdown_seconds`: 10 秒
/// - `stop_button_only_command_user`: false (誰でも STOP 可能)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelocateConfig {
    /// 移動先（寝落ち部屋）のボイスチャンネル ID
    #[serde(default)]
    pub target_voice_channel_id: u64,
    #[serde(default = "default_countdown_seconds")]
    pub countdown_seconds: u32,
    /// STOP 操作をコマンド実行者に限定するか
    #[serde(default)]
    pub stop_button_only_command_user: bool,
}

/// 大喜利（お題一括投下）の設定
///
/// # デフォルト値
///
/// - `allowed_dest_channel_ids`: 空 (ホワイトリストなし = 全テキストチャンネルが候補)
/// - `post_title`: "お題"
/// - `footer_prefix`: "出題者："
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BroadcastConfig {
    /// 投下先候補のホワイトリスト（空なら制限なし）
    #[serde(default)]
    pub allowed_dest_channel_ids: Vec<u64>,
    #[serde(default = "default_post_title")]
    pub post_title: String,
    #[serde(default = "default_footer_prefix")]
    pub footer_prefix: String,
}

// Default functions
fn default_category_name() -> String {
    "インチャテキスト".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_size() -> usize {
    10
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

fn default_countdown_seconds() -> u32 {
    10
}

fn default_post_title() -> String {
    "お題".to_string()
}

fn default_footer_prefix() -> String {
    "出題者：".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            cache: CacheConfig::default(),
            mirror: MirrorConfig::default(),
            relocate: RelocateConfig::default(),
            broadcast: BroadcastConfig::default(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            category_name: default_category_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            excluded_category_ids: Vec::new(),
        }
    }
}

impl Default for RelocateConfig {
    fn default() -> Self {
        Self {
            target_voice_channel_id: 0,
            countdown_seconds: default_countdown_seconds(),
            stop_button_only_command_user: false,
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            allowed_dest_channel_ids: Vec::new(),
            post_title: default_post_title(),
            footer_prefix: default_footer_prefix(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use vc_mirror::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// デフォルト値を持つ設定ファイルを生成する。
    /// 既存のファイルは上書きされる。
    ///
    /// # Errors
    ///
    /// ファイルの書き込みに失敗した場合にエラーを返す。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    /// ファイルが存在しない場合はエラーにならず、デフォルト設定を返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use vc_mirror::config::Config;
    /// let config = Config::load_or_default("config.toml").unwrap();
    /// ```
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }
}

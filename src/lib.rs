//! vc-mirror - ボイスチャンネル連動の転記 Bot
//!
//! このクレートは、Discord のボイスチャンネルの入退室・チャット投稿を
//! 日付毎の専用テキストチャンネルへ転記する Bot を提供します。
//!
//! # 主な機能
//!
//! - **入退室ログ**: ボイスチャンネルへの入室・退出を埋め込みで記録
//! - **チャット転記**: ボイスチャンネル内蔵チャットの投稿を転記（画像対応）
//! - **日付別チャンネル**: 転記先は JST の日付 + チャンネル名で自動作成
//! - **マッピングキャッシュ**: 転記先の解決結果を上限付きで保持し、定期的に整合を取る
//! - **おやんも**: カウントダウン付きでメンバーを寝落ち部屋へ移動
//! - **お題投下 / アーカイブ削除**: 複数チャンネルへの一括投稿と古いチャンネルの整理
//!
//! # アーキテクチャ
//!
//! ```text
//! [Discord Gateway] → [Handler] → [EventDispatch]
//!                                       ↓
//!                              [ChannelResolver] ←→ [MappingCache]
//!                                       ↓                  ↑
//!                              [ChannelDirectory]   [ReconciliationScheduler]
//!                                       ↓
//!                               [Discord REST API]
//! ```
//!
//! コアのロジックは `ChannelDirectory` トレイト越しにのみ Discord に触れるため、
//! テストではモックに差し替えて検証できます。
//!
//! # 使用例
//!
//! ```no_run
//! use vc_mirror::config::Config;
//!
//! // 設定ファイルを読み込み
//! let config = Config::load_or_default("config.toml").unwrap();
//!
//! // またはデフォルト設定を生成
//! Config::write_default("config.toml").unwrap();
//! ```

pub mod archive;
pub mod broadcast;
pub mod cache;
pub mod clock;
pub mod config;
pub mod directory;
pub mod discord;
pub mod events;
pub mod messages;
pub mod normalize;
pub mod reconcile;
pub mod relocate;
pub mod resolver;
pub mod types;

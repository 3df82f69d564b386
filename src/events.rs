use crate::clock::{footer_timestamp, message_timestamp, Clock};
use crate::directory::ChannelDirectory;
use crate::resolver::ChannelResolver;
use crate::types::{
    ChannelId, ChannelRef, EmbedPayload, GuildId, UserId, COLOR_JOIN, COLOR_LEAVE, COLOR_MIRROR,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// ボイスステート変化イベント（SDK 非依存の中間表現）
#[derive(Clone, Debug)]
pub struct VoiceEvent {
    pub guild: GuildId,
    pub member_id: UserId,
    pub member_name: String,
    pub avatar_url: Option<String>,
    /// 変化前のチャンネルとその所属カテゴリ
    pub before: Option<ChannelRef>,
    pub before_category: Option<ChannelId>,
    /// 変化後のチャンネルとその所属カテゴリ
    pub after: Option<ChannelRef>,
    pub after_category: Option<ChannelId>,
}

/// メッセージ投稿イベント（SDK 非依存の中間表現）
#[derive(Clone, Debug)]
pub struct MessageEvent {
    pub guild: GuildId,
    pub channel: ChannelRef,
    /// 投稿先がボイスチャンネル内蔵のテキストチャットか
    pub is_voice_channel: bool,
    pub category_id: Option<ChannelId>,
    pub author_name: String,
    pub author_is_bot: bool,
    pub avatar_url: Option<String>,
    pub content: String,
    pub attachment_urls: Vec<String>,
    pub sent_at: DateTime<Utc>,
}

/// プラットフォームイベントの受け口
///
/// ゲートウェイアダプタから中間表現のイベントを受け取り、
/// 転記先チャンネルを解決して埋め込みを投稿する。
///
/// 受動的な転記には通知すべきコマンド実行者がいないため、
/// 解決や送信の失敗はログに残すだけで上位へは伝播させない。
/// 1 イベントの失敗が他のチャンネルのキャッシュやスイープに
/// 影響することはない。
pub struct EventDispatch {
    resolver: Arc<ChannelResolver>,
    directory: Arc<dyn ChannelDirectory>,
    clock: Arc<dyn Clock>,
    excluded_category_ids: Vec<ChannelId>,
}

impl EventDispatch {
    pub fn new(
        resolver: Arc<ChannelResolver>,
        directory: Arc<dyn ChannelDirectory>,
        clock: Arc<dyn Clock>,
        excluded_category_ids: Vec<ChannelId>,
    ) -> Self {
        Self {
            resolver,
            directory,
            clock,
            excluded_category_ids,
        }
    }

    fn is_excluded(&self, category: Option<ChannelId>) -> bool {
        category.is_some_and(|id| self.excluded_category_ids.contains(&id))
    }

    /// ボイスチャンネルの入室・退出ログを専用テキストチャンネルに書き込む
    pub async fn on_voice_state(&self, event: &VoiceEvent) {
        let now = footer_timestamp(&*self.clock);
        log::debug!(
            "{} - on_voice_state: {} ({})",
            now,
            event.member_name,
            event.member_id
        );

        // 入室時（チャンネル間の移動も新しいチャンネルへの入室として扱う）
        if let Some(after) = &event.after {
            if event.before.as_ref().map(|c| c.id) != Some(after.id) {
                if self.is_excluded(event.after_category) {
                    log::debug!("[VOICE] {} は転記対象外カテゴリのため無視", after.name);
                    return;
                }
                let embed = EmbedPayload {
                    description: format!(
                        "**{}**（ID: `{}`）が **{}** に入室しました。",
                        event.member_name, event.member_id, after.name
                    ),
                    color: COLOR_JOIN,
                    author_name: Some(format!("{} さんの入室", event.member_name)),
                    author_icon_url: event.avatar_url.clone(),
                    footer: Some(now),
                    ..Default::default()
                };
                self.post_transcript(event.guild, after, embed).await;
            }
            return;
        }

        // 退出時
        if let Some(before) = &event.before {
            if self.is_excluded(event.before_category) {
                log::debug!("[VOICE] {} は転記対象外カテゴリのため無視", before.name);
                return;
            }
            let embed = EmbedPayload {
                description: format!(
                    "**{}**（ID: `{}`）が **{}** から退出しました。",
                    event.member_name, event.member_id, before.name
                ),
                color: COLOR_LEAVE,
                author_name: Some(format!("{} さんの退出", event.member_name)),
                author_icon_url: event.avatar_url.clone(),
                footer: Some(now),
                ..Default::default()
            };
            self.post_transcript(event.guild, before, embed).await;
        }
    }

    /// ボイスチャンネルのテキストチャットのメッセージのみ転記
    pub async fn on_message(&self, event: &MessageEvent) {
        if event.author_is_bot {
            log::debug!("{} のメッセージはBOTのため無視", event.author_name);
            return;
        }
        if !event.is_voice_channel {
            log::debug!("{} はボイスチャンネルではないため無視", event.channel.name);
            return;
        }
        if self.is_excluded(event.category_id) {
            log::debug!(
                "[MESSAGE] {} は転記対象外カテゴリのため無視",
                event.channel.name
            );
            return;
        }

        let target = match self
            .resolver
            .resolve_or_create(event.guild, &event.channel)
            .await
        {
            Ok(target) => target,
            Err(e) => {
                log::error!("転記先チャンネルの解決に失敗: {}", e);
                return;
            }
        };

        let author_line = format!(
            "{}   {}",
            event.author_name,
            message_timestamp(event.sent_at)
        );

        // 本文と 1 枚目の画像は同じ埋め込みにまとめる
        let embed = EmbedPayload {
            description: event.content.clone(),
            color: COLOR_MIRROR,
            author_name: Some(author_line.clone()),
            author_icon_url: event.avatar_url.clone(),
            image_url: event.attachment_urls.first().cloned(),
            ..Default::default()
        };
        if let Err(e) = self.directory.send_embed(target.id, &embed).await {
            log::error!("メッセージの転記に失敗: {}", e);
            return;
        }

        // 2 枚目以降の画像は画像のみの埋め込みで追記
        for image_url in event.attachment_urls.iter().skip(1) {
            let image_embed = EmbedPayload {
                color: COLOR_MIRROR,
                author_name: Some(author_line.clone()),
                author_icon_url: event.avatar_url.clone(),
                image_url: Some(image_url.clone()),
                ..Default::default()
            };
            if let Err(e) = self.directory.send_embed(target.id, &image_embed).await {
                log::error!("追加画像の転記に失敗: {}", e);
            }
        }
    }

    async fn post_transcript(&self, guild: GuildId, source: &ChannelRef, embed: EmbedPayload) {
        let target = match self.resolver.resolve_or_create(guild, source).await {
            Ok(target) => target,
            Err(e) => {
                log::error!("転記先チャンネルの解決に失敗: {}", e);
                return;
            }
        };
        if let Err(e) = self.directory.send_embed(target.id, &embed).await {
            log::error!("入退室ログの投稿に失敗: {}", e);
        }
    }
}

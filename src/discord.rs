//! Discord ゲートウェイアダプタ
//!
//! serenity のイベント・REST API とコア（SDK 非依存）との橋渡し。
//! コアの `ChannelDirectory` トレイトをここで実装し、
//! ゲートウェイイベントを中間表現へ変換してディスパッチへ渡す。

use crate::archive::ArchivePruner;
use crate::broadcast::Broadcaster;
use crate::cache::MappingCache;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::directory::{ChannelDirectory, DirectoryError, DirectoryResult};
use crate::events::{EventDispatch, MessageEvent, VoiceEvent};
use crate::reconcile::ReconciliationScheduler;
use crate::relocate::Relocator;
use crate::resolver::ChannelResolver;
use crate::types::{
    CategoryRef, ChannelRef, EmbedPayload, MemberRef, TextChannelInfo,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{
    ChannelType, Colour, Context, CreateChannel, CreateEmbed, CreateEmbedAuthor,
    CreateEmbedFooter, CreateMessage, EditMessage, EventHandler, Message, Ready, VoiceState,
};
use serenity::http::{Http, HttpError};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;

/// serenity の REST API / キャッシュを使った `ChannelDirectory` 実装
pub struct SerenityDirectory {
    http: Arc<Http>,
    cache: Arc<serenity::cache::Cache>,
}

impl SerenityDirectory {
    pub fn new(http: Arc<Http>, cache: Arc<serenity::cache::Cache>) -> Self {
        Self { http, cache }
    }

    async fn guild_channels(
        &self,
        guild: u64,
    ) -> DirectoryResult<HashMap<serenity::all::ChannelId, serenity::all::GuildChannel>> {
        serenity::all::GuildId::new(guild)
            .channels(&*self.http)
            .await
            .map_err(|e| map_err("チャンネル一覧の取得", e))
    }
}

fn map_err(context: &str, e: serenity::Error) -> DirectoryError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) = &e {
        if resp.status_code.as_u16() == 403 {
            return DirectoryError::PermissionDenied(format!("{}: {}", context, e));
        }
    }
    DirectoryError::Unavailable(format!("{}: {}", context, e))
}

/// 中間表現の埋め込みを serenity のビルダーへ変換
fn build_embed(payload: &EmbedPayload) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .description(payload.description.clone())
        .colour(Colour::new(payload.color));
    if let Some(title) = &payload.title {
        embed = embed.title(title.clone());
    }
    if let Some(author_name) = &payload.author_name {
        let mut author = CreateEmbedAuthor::new(author_name.clone());
        if let Some(icon_url) = &payload.author_icon_url {
            author = author.icon_url(icon_url.clone());
        }
        embed = embed.author(author);
    }
    if let Some(footer) = &payload.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer.clone()));
    }
    if let Some(image_url) = &payload.image_url {
        embed = embed.image(image_url.clone());
    }
    embed
}

#[async_trait]
impl ChannelDirectory for SerenityDirectory {
    async fn find_category(
        &self,
        guild: u64,
        name: &str,
    ) -> DirectoryResult<Option<CategoryRef>> {
        let channels = self.guild_channels(guild).await?;
        Ok(channels
            .values()
            .find(|ch| ch.kind == ChannelType::Category && ch.name == name)
            .map(|ch| CategoryRef {
                id: ch.id.get(),
                name: ch.name.clone(),
            }))
    }

    async fn create_category(&self, guild: u64, name: &str) -> DirectoryResult<CategoryRef> {
        let created = serenity::all::GuildId::new(guild)
            .create_channel(
                &*self.http,
                CreateChannel::new(name).kind(ChannelType::Category),
            )
            .await
            .map_err(|e| map_err("カテゴリの作成", e))?;
        Ok(CategoryRef {
            id: created.id.get(),
            name: created.name,
        })
    }

    async fn find_text_channel(
        &self,
        guild: u64,
        category: u64,
        name: &str,
    ) -> DirectoryResult<Option<ChannelRef>> {
        let channels = self.guild_channels(guild).await?;
        Ok(channels
            .values()
            .find(|ch| {
                ch.kind == ChannelType::Text
                    && ch.parent_id.map(|p| p.get()) == Some(category)
                    && ch.name == name
            })
            .map(|ch| ChannelRef {
                id: ch.id.get(),
                name: ch.name.clone(),
            }))
    }

    async fn create_text_channel(
        &self,
        guild: u64,
        category: u64,
        name: &str,
    ) -> DirectoryResult<ChannelRef> {
        let created = serenity::all::GuildId::new(guild)
            .create_channel(
                &*self.http,
                CreateChannel::new(name)
                    .kind(ChannelType::Text)
                    .category(serenity::all::ChannelId::new(category)),
            )
            .await
            .map_err(|e| map_err("テキストチャンネルの作成", e))?;
        Ok(ChannelRef {
            id: created.id.get(),
            name: created.name,
        })
    }

    async fn send_message(&self, channel: u64, text: &str) -> DirectoryResult<u64> {
        let message = serenity::all::ChannelId::new(channel)
            .say(&*self.http, text)
            .await
            .map_err(|e| map_err("メッセージの送信", e))?;
        Ok(message.id.get())
    }

    async fn send_embed(&self, channel: u64, embed: &EmbedPayload) -> DirectoryResult<u64> {
        let message = serenity::all::ChannelId::new(channel)
            .send_message(&*self.http, CreateMessage::new().embed(build_embed(embed)))
            .await
            .map_err(|e| map_err("埋め込みの送信", e))?;
        Ok(message.id.get())
    }

    async fn edit_embed(
        &self,
        channel: u64,
        message: u64,
        embed: &EmbedPayload,
    ) -> DirectoryResult<()> {
        serenity::all::ChannelId::new(channel)
            .edit_message(
                &*self.http,
                serenity::all::MessageId::new(message),
                EditMessage::new().embed(build_embed(embed)),
            )
            .await
            .map_err(|e| map_err("埋め込みの編集", e))?;
        Ok(())
    }

    async fn delete_channel(&self, channel: u64) -> DirectoryResult<()> {
        serenity::all::ChannelId::new(channel)
            .delete(&*self.http)
            .await
            .map_err(|e| map_err("チャンネルの削除", e))?;
        Ok(())
    }

    async fn move_member(
        &self,
        guild: u64,
        user: u64,
        voice_channel: u64,
    ) -> DirectoryResult<()> {
        serenity::all::GuildId::new(guild)
            .move_member(
                &*self.http,
                serenity::all::UserId::new(user),
                serenity::all::ChannelId::new(voice_channel),
            )
            .await
            .map_err(|e| map_err("メンバーの移動", e))?;
        Ok(())
    }

    async fn list_guilds(&self) -> DirectoryResult<Vec<u64>> {
        Ok(self.cache.guilds().iter().map(|g| g.get()).collect())
    }

    async fn list_voice_channels(&self, guild: u64) -> DirectoryResult<Vec<ChannelRef>> {
        let channels = self.guild_channels(guild).await?;
        Ok(channels
            .values()
            .filter(|ch| ch.kind == ChannelType::Voice)
            .map(|ch| ChannelRef {
                id: ch.id.get(),
                name: ch.name.clone(),
            })
            .collect())
    }

    async fn list_text_channels(
        &self,
        guild: u64,
        category: Option<u64>,
    ) -> DirectoryResult<Vec<TextChannelInfo>> {
        let channels = self.guild_channels(guild).await?;

        // カテゴリの表示位置を引けるようにしておく
        let category_positions: HashMap<u64, u16> = channels
            .values()
            .filter(|ch| ch.kind == ChannelType::Category)
            .map(|ch| (ch.id.get(), ch.position))
            .collect();

        Ok(channels
            .values()
            .filter(|ch| ch.kind == ChannelType::Text)
            .filter(|ch| match category {
                Some(cat) => ch.parent_id.map(|p| p.get()) == Some(cat),
                None => true,
            })
            .map(|ch| {
                let parent_id = ch.parent_id.map(|p| p.get());
                TextChannelInfo {
                    id: ch.id.get(),
                    name: ch.name.clone(),
                    parent_id,
                    position: ch.position,
                    category_position: parent_id
                        .and_then(|p| category_positions.get(&p).copied()),
                }
            })
            .collect())
    }

    async fn find_voice_member(
        &self,
        guild: u64,
        display_name: &str,
    ) -> DirectoryResult<Option<MemberRef>> {
        let guild_ref = match self.cache.guild(serenity::all::GuildId::new(guild)) {
            Some(guild_ref) => guild_ref,
            None => return Ok(None),
        };
        for (user_id, voice) in guild_ref.voice_states.iter() {
            if voice.channel_id.is_none() {
                continue;
            }
            if let Some(member) = guild_ref.members.get(user_id) {
                if member.display_name() == display_name {
                    return Ok(Some(MemberRef {
                        user_id: user_id.get(),
                        display_name: display_name.to_string(),
                        voice_channel: voice.channel_id.map(|c| c.get()),
                    }));
                }
            }
        }
        Ok(None)
    }
}

/// Bot の長寿命コンポーネント一式
///
/// プロセス起動時に一度だけ構築し、イベントハンドラとシャットダウン処理で
/// 共有する。モジュールグローバルな可変状態は持たない。
pub struct BotState {
    pub dispatch: EventDispatch,
    pub relocator: Arc<Relocator>,
    pub broadcaster: Broadcaster,
    pub pruner: ArchivePruner,
    scheduler: Mutex<ReconciliationScheduler>,
}

impl BotState {
    pub fn new(
        http: Arc<Http>,
        cache: Arc<serenity::cache::Cache>,
        config: &Config,
    ) -> Self {
        let directory: Arc<dyn ChannelDirectory> =
            Arc::new(SerenityDirectory::new(http, cache));
        let clock = Arc::new(SystemClock);
        let mapping_cache = Arc::new(Mutex::new(MappingCache::new(config.cache.max_size)));

        let resolver = Arc::new(ChannelResolver::new(
            directory.clone(),
            clock.clone(),
            mapping_cache.clone(),
            config.bot.category_name.clone(),
        ));
        let dispatch = EventDispatch::new(
            resolver,
            directory.clone(),
            clock,
            config.mirror.excluded_category_ids.clone(),
        );
        let relocator = Arc::new(Relocator::new(directory.clone(), config.relocate.clone()));
        let broadcaster = Broadcaster::new(directory.clone(), config.broadcast.clone());
        let pruner = ArchivePruner::new(directory.clone(), config.bot.category_name.clone());
        let scheduler = Mutex::new(ReconciliationScheduler::new(
            directory,
            mapping_cache,
            Duration::from_secs(config.cache.cleanup_interval_secs),
        ));

        Self {
            dispatch,
            relocator,
            broadcaster,
            pruner,
            scheduler,
        }
    }

    /// 定期スイープを開始（プロセス起動時に一度だけ呼ぶ）
    pub async fn start_reconciliation(&self) {
        self.scheduler.lock().await.start();
    }

    /// 定期スイープを停止（シャットダウン時）
    pub async fn stop_reconciliation(&self) {
        self.scheduler.lock().await.stop().await;
    }
}

/// ゲートウェイイベントの受け口
///
/// `BotState` はクライアント構築後に `OnceLock` へ格納されるため、
/// 格納前に届いたイベントは読み捨てる。
pub struct Handler {
    state: Arc<OnceLock<Arc<BotState>>>,
}

impl Handler {
    pub fn new(state: Arc<OnceLock<Arc<BotState>>>) -> Self {
        Self { state }
    }

    fn state(&self) -> Option<&Arc<BotState>> {
        self.state.get()
    }
}

/// キャッシュからチャンネル名と所属カテゴリを写し取る
///
/// キャッシュ未投入のチャンネルは None（イベントは読み捨てる）。
fn channel_snapshot(
    ctx: &Context,
    guild: serenity::all::GuildId,
    channel: serenity::all::ChannelId,
) -> Option<(ChannelRef, Option<u64>)> {
    let guild_ref = ctx.cache.guild(guild)?;
    let ch = guild_ref.channels.get(&channel)?;
    Some((
        ChannelRef {
            id: channel.get(),
            name: ch.name.clone(),
        },
        ch.parent_id.map(|p| p.get()),
    ))
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        log::info!("✅ {} がログインしました！", ready.user.name);
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(state) = self.state() else { return };
        let Some(guild_id) = new.guild_id else { return };

        let member = match new.member.as_ref() {
            Some(member) => member,
            None => {
                log::debug!("[VOICE] メンバー情報なしのイベントを無視");
                return;
            }
        };

        let before = old
            .as_ref()
            .and_then(|o| o.channel_id)
            .and_then(|id| channel_snapshot(&ctx, guild_id, id));
        let after = new
            .channel_id
            .and_then(|id| channel_snapshot(&ctx, guild_id, id));

        let event = VoiceEvent {
            guild: guild_id.get(),
            member_id: new.user_id.get(),
            member_name: member.display_name().to_string(),
            avatar_url: Some(member.face()),
            before: before.as_ref().map(|(ch, _)| ch.clone()),
            before_category: before.as_ref().and_then(|(_, cat)| *cat),
            after: after.as_ref().map(|(ch, _)| ch.clone()),
            after_category: after.as_ref().and_then(|(_, cat)| *cat),
        };
        state.dispatch.on_voice_state(&event).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let Some(state) = self.state() else { return };
        let Some(guild_id) = msg.guild_id else { return };

        let snapshot = channel_snapshot(&ctx, guild_id, msg.channel_id);
        let Some((channel, category_id)) = snapshot else { return };

        let is_voice_channel = {
            match ctx.cache.guild(guild_id) {
                Some(guild_ref) => guild_ref
                    .channels
                    .get(&msg.channel_id)
                    .map(|ch| ch.kind == ChannelType::Voice)
                    .unwrap_or(false),
                None => false,
            }
        };

        let author_name = msg
            .member
            .as_ref()
            .and_then(|m| m.nick.clone())
            .or_else(|| msg.author.global_name.clone())
            .unwrap_or_else(|| msg.author.name.clone());

        let event = MessageEvent {
            guild: guild_id.get(),
            channel,
            is_voice_channel,
            category_id,
            author_name,
            author_is_bot: msg.author.bot,
            avatar_url: Some(msg.author.face()),
            content: msg.content.clone(),
            attachment_urls: msg.attachments.iter().map(|a| a.url.clone()).collect(),
            sent_at: DateTime::from_timestamp(msg.timestamp.unix_timestamp(), 0)
                .unwrap_or_else(Utc::now),
        };
        state.dispatch.on_message(&event).await;
    }
}

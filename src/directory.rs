use crate::types::{
    CategoryRef, ChannelId, ChannelRef, EmbedPayload, GuildId, MemberRef, MessageId,
    TextChannelInfo, UserId,
};
use async_trait::async_trait;
use thiserror::Error;

/// チャンネルディレクトリ操作のエラー
///
/// リトライはここでは行わず、呼び出し側（イベントディスパッチ層）の
/// 方針に委ねる。
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// ネットワーク断や API の一時障害
    #[error("チャンネルディレクトリAPIに到達できません: {0}")]
    Unavailable(String),

    /// カテゴリ・チャンネルの作成やメッセージ送信の権限不足
    #[error("操作の権限がありません: {0}")]
    PermissionDenied(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// プラットフォームのチャンネルディレクトリへの共通トレイト
///
/// 実体は Discord ゲートウェイアダプタ（`discord` モジュール）が提供する。
/// コアはこのトレイト越しにのみ外部 API に触れるため、
/// テストではモックに差し替えられる。
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// カテゴリを名前で検索
    async fn find_category(
        &self,
        guild: GuildId,
        name: &str,
    ) -> DirectoryResult<Option<CategoryRef>>;

    /// カテゴリを作成
    async fn create_category(&self, guild: GuildId, name: &str) -> DirectoryResult<CategoryRef>;

    /// カテゴリ内のテキストチャンネルを名前完全一致で検索
    async fn find_text_channel(
        &self,
        guild: GuildId,
        category: ChannelId,
        name: &str,
    ) -> DirectoryResult<Option<ChannelRef>>;

    /// カテゴリ内にテキストチャンネルを作成
    async fn create_text_channel(
        &self,
        guild: GuildId,
        category: ChannelId,
        name: &str,
    ) -> DirectoryResult<ChannelRef>;

    /// プレーンテキストのメッセージを送信
    async fn send_message(&self, channel: ChannelId, text: &str) -> DirectoryResult<MessageId>;

    /// 埋め込みメッセージを送信
    async fn send_embed(
        &self,
        channel: ChannelId,
        embed: &EmbedPayload,
    ) -> DirectoryResult<MessageId>;

    /// 既存メッセージの埋め込みを差し替え（カウントダウン表示の更新用）
    async fn edit_embed(
        &self,
        channel: ChannelId,
        message: MessageId,
        embed: &EmbedPayload,
    ) -> DirectoryResult<()>;

    /// チャンネルを削除
    async fn delete_channel(&self, channel: ChannelId) -> DirectoryResult<()>;

    /// メンバーを指定のボイスチャンネルへ移動
    async fn move_member(
        &self,
        guild: GuildId,
        user: UserId,
        voice_channel: ChannelId,
    ) -> DirectoryResult<()>;

    /// 参加中の全ギルドを列挙
    async fn list_guilds(&self) -> DirectoryResult<Vec<GuildId>>;

    /// ギルド内のボイスチャンネルを列挙
    async fn list_voice_channels(&self, guild: GuildId) -> DirectoryResult<Vec<ChannelRef>>;

    /// ギルド内のテキストチャンネルを列挙
    ///
    /// `category` を指定した場合はそのカテゴリ配下のみ。
    async fn list_text_channels(
        &self,
        guild: GuildId,
        category: Option<ChannelId>,
    ) -> DirectoryResult<Vec<TextChannelInfo>>;

    /// ボイスチャンネル参加中のメンバーを表示名で検索
    async fn find_voice_member(
        &self,
        guild: GuildId,
        display_name: &str,
    ) -> DirectoryResult<Option<MemberRef>>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// テスト用の記録付きモックディレクトリ
    ///
    /// すべての副作用を記録し、検索系・作成系の呼び出し回数を数える。
    /// `fail_with` を設定すると以後の操作はそのエラーを返す。
    #[derive(Default)]
    pub struct MockDirectory {
        pub state: Mutex<MockState>,
    }

    #[derive(Default)]
    pub struct MockState {
        pub categories: Vec<CategoryRef>,
        /// (所属カテゴリID, チャンネル)
        pub text_channels: Vec<(ChannelId, ChannelRef)>,
        pub text_infos: HashMap<GuildId, Vec<TextChannelInfo>>,
        pub voice_channels: HashMap<GuildId, Vec<ChannelRef>>,
        pub voice_members: Vec<(GuildId, MemberRef)>,
        pub guilds: Vec<GuildId>,

        pub sent_messages: Vec<(ChannelId, String)>,
        pub sent_embeds: Vec<(ChannelId, EmbedPayload)>,
        pub edited_embeds: Vec<(ChannelId, MessageId, EmbedPayload)>,
        pub deleted_channels: Vec<ChannelId>,
        pub moved_members: Vec<(GuildId, UserId, ChannelId)>,

        /// 検索・作成・列挙などディレクトリ API 呼び出しの総数
        pub directory_calls: usize,
        pub created_categories: usize,
        pub created_channels: usize,

        pub fail_with: Option<DirectoryError>,
        next_id: ChannelId,
    }

    impl MockState {
        fn check_failure(&mut self) -> DirectoryResult<()> {
            self.directory_calls += 1;
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }

        fn allocate_id(&mut self) -> ChannelId {
            self.next_id += 1;
            self.next_id + 1000
        }
    }

    impl MockDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        /// ギルドとボイスチャンネルを事前登録
        pub fn with_voice_channels(self, guild: GuildId, channels: Vec<ChannelRef>) -> Self {
            {
                let mut state = self.state.lock().unwrap();
                if !state.guilds.contains(&guild) {
                    state.guilds.push(guild);
                }
                state.voice_channels.insert(guild, channels);
            }
            self
        }

        pub fn directory_calls(&self) -> usize {
            self.state.lock().unwrap().directory_calls
        }
    }

    #[async_trait]
    impl ChannelDirectory for MockDirectory {
        async fn find_category(
            &self,
            _guild: GuildId,
            name: &str,
        ) -> DirectoryResult<Option<CategoryRef>> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            Ok(state.categories.iter().find(|c| c.name == name).cloned())
        }

        async fn create_category(
            &self,
            _guild: GuildId,
            name: &str,
        ) -> DirectoryResult<CategoryRef> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            let category = CategoryRef {
                id: state.allocate_id(),
                name: name.to_string(),
            };
            state.categories.push(category.clone());
            state.created_categories += 1;
            Ok(category)
        }

        async fn find_text_channel(
            &self,
            _guild: GuildId,
            category: ChannelId,
            name: &str,
        ) -> DirectoryResult<Option<ChannelRef>> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            Ok(state
                .text_channels
                .iter()
                .find(|(cat, ch)| *cat == category && ch.name == name)
                .map(|(_, ch)| ch.clone()))
        }

        async fn create_text_channel(
            &self,
            _guild: GuildId,
            category: ChannelId,
            name: &str,
        ) -> DirectoryResult<ChannelRef> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            let channel = ChannelRef {
                id: state.allocate_id(),
                name: name.to_string(),
            };
            state.text_channels.push((category, channel.clone()));
            state.created_channels += 1;
            Ok(channel)
        }

        async fn send_message(
            &self,
            channel: ChannelId,
            text: &str,
        ) -> DirectoryResult<MessageId> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            state.sent_messages.push((channel, text.to_string()));
            Ok(state.sent_messages.len() as MessageId)
        }

        async fn send_embed(
            &self,
            channel: ChannelId,
            embed: &EmbedPayload,
        ) -> DirectoryResult<MessageId> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            state.sent_embeds.push((channel, embed.clone()));
            Ok(state.sent_embeds.len() as MessageId)
        }

        async fn edit_embed(
            &self,
            channel: ChannelId,
            message: MessageId,
            embed: &EmbedPayload,
        ) -> DirectoryResult<()> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            state.edited_embeds.push((channel, message, embed.clone()));
            Ok(())
        }

        async fn delete_channel(&self, channel: ChannelId) -> DirectoryResult<()> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            state.deleted_channels.push(channel);
            Ok(())
        }

        async fn move_member(
            &self,
            guild: GuildId,
            user: UserId,
            voice_channel: ChannelId,
        ) -> DirectoryResult<()> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            state.moved_members.push((guild, user, voice_channel));
            Ok(())
        }

        async fn list_guilds(&self) -> DirectoryResult<Vec<GuildId>> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            Ok(state.guilds.clone())
        }

        async fn list_voice_channels(&self, guild: GuildId) -> DirectoryResult<Vec<ChannelRef>> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            Ok(state.voice_channels.get(&guild).cloned().unwrap_or_default())
        }

        async fn list_text_channels(
            &self,
            guild: GuildId,
            category: Option<ChannelId>,
        ) -> DirectoryResult<Vec<TextChannelInfo>> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            let infos = state.text_infos.get(&guild).cloned().unwrap_or_default();
            Ok(match category {
                Some(cat) => infos
                    .into_iter()
                    .filter(|info| info.parent_id == Some(cat))
                    .collect(),
                None => infos,
            })
        }

        async fn find_voice_member(
            &self,
            guild: GuildId,
            display_name: &str,
        ) -> DirectoryResult<Option<MemberRef>> {
            let mut state = self.state.lock().unwrap();
            state.check_failure()?;
            Ok(state
                .voice_members
                .iter()
                .find(|(g, m)| *g == guild && m.display_name == display_name)
                .map(|(_, m)| m.clone()))
        }
    }
}

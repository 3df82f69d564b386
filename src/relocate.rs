use crate::config::RelocateConfig;
use crate::directory::{ChannelDirectory, DirectoryResult};
use crate::messages::random_completion_message;
use crate::types::{
    ChannelId, EmbedPayload, GuildId, MemberRef, MessageId, UserId, COLOR_COMMAND, COLOR_SUCCESS,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// 「おやんも」コマンドの実行結果
///
/// `Rejected` は対象がボイスチャンネルにいない等の業務的な失敗で、
/// 返信テキストをそのままコマンド実行者に見せる。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelocateOutcome {
    /// 移動完了（表示済みの完了メッセージ）
    Moved(String),
    /// カウントダウンが停止された
    Stopped,
    /// 実行不可（ユーザー向けの理由テキスト）
    Rejected(String),
}

struct CountdownState {
    running: bool,
    command_user: UserId,
}

enum CountdownEnd {
    Completed,
    Stopped,
}

/// 指定メンバーを寝落ち部屋へ移動させるコマンドの本体
///
/// カウントダウン表示はステータスチャンネルに投稿した埋め込みを
/// 毎秒編集して行い、STOP 操作は対象ユーザー単位のフラグで伝える。
/// フラグの管理はロック越しに行い、カウントダウン中のタスクと
/// STOP を押したタスクが別でも競合しない。
pub struct Relocator {
    directory: Arc<dyn ChannelDirectory>,
    config: RelocateConfig,
    /// カウントダウンの刻み。本番は 1 秒、テストでは短縮する
    tick: Duration,
    active: Mutex<HashMap<UserId, CountdownState>>,
}

impl Relocator {
    pub fn new(directory: Arc<dyn ChannelDirectory>, config: RelocateConfig) -> Self {
        Self::with_tick(directory, config, Duration::from_secs(1))
    }

    pub fn with_tick(
        directory: Arc<dyn ChannelDirectory>,
        config: RelocateConfig,
        tick: Duration,
    ) -> Self {
        Self {
            directory,
            config,
            tick,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// STOP 操作
    ///
    /// `stop_button_only_command_user` が有効な場合、コマンド実行者以外の
    /// 操作は拒否してユーザー向けの理由テキストを返す。
    pub async fn request_stop(&self, target: UserId, requested_by: UserId) -> Result<(), String> {
        let mut active = self.active.lock().await;
        match active.get_mut(&target) {
            Some(state) => {
                if self.config.stop_button_only_command_user
                    && requested_by != state.command_user
                {
                    return Err(
                        "❌ あなたにはこのカウントダウンを停止する権限がありません！".to_string()
                    );
                }
                state.running = false;
                log::debug!("[COUNTDOWN] {} のカウントダウンを停止", target);
                Ok(())
            }
            None => Ok(()), // カウントダウン中でなければ何もしない
        }
    }

    /// 表示名で指定されたメンバーを移動させる
    ///
    /// 経過表示の埋め込みは `status_channel` に投稿する。
    ///
    /// # Errors
    ///
    /// ディレクトリ API の失敗は `DirectoryError` として伝播する。
    /// コマンドの呼び出し層はこれをユーザーへの失敗返信に変換する。
    pub async fn relocate(
        &self,
        guild: GuildId,
        display_name: &str,
        command_user: UserId,
        with_countdown: bool,
        status_channel: u64,
    ) -> DirectoryResult<RelocateOutcome> {
        if self.config.target_voice_channel_id == 0 {
            return Ok(RelocateOutcome::Rejected(format!(
                "❌ `{}`: 指定されたボイスチャンネルが見つかりません。",
                display_name
            )));
        }

        let member = match self.directory.find_voice_member(guild, display_name).await? {
            Some(member) if member.voice_channel.is_some() => member,
            _ => {
                return Ok(RelocateOutcome::Rejected(format!(
                    "❌ `{}` はボイスチャンネルにいません。",
                    display_name
                )));
            }
        };

        let mut embed = EmbedPayload {
            title: Some("おやんも コマンド実行".to_string()),
            description: format!("`{}` を寝落ち部屋へ移動させます。", member.display_name),
            color: COLOR_COMMAND,
            ..Default::default()
        };
        let message = self.directory.send_embed(status_channel, &embed).await?;

        if with_countdown {
            self.active.lock().await.insert(
                member.user_id,
                CountdownState {
                    running: true,
                    command_user,
                },
            );

            let countdown = self
                .run_countdown(&member, status_channel, message, &mut embed)
                .await;
            // 成功・停止・エラーのいずれでもエントリは必ず消す。
            // 残すと次回の STOP 判定が死んだカウントダウンの実行者を参照する
            self.active.lock().await.remove(&member.user_id);

            if let CountdownEnd::Stopped = countdown? {
                return Ok(RelocateOutcome::Stopped);
            }
        }

        self.directory
            .move_member(guild, member.user_id, self.config.target_voice_channel_id)
            .await?;

        let completion = random_completion_message(&member.display_name);
        embed.description = completion.clone();
        embed.color = COLOR_SUCCESS;
        self.directory
            .edit_embed(status_channel, message, &embed)
            .await?;

        log::info!(
            "[RELOCATE] {} を <#{}> に移動しました",
            member.display_name,
            self.config.target_voice_channel_id
        );
        Ok(RelocateOutcome::Moved(completion))
    }

    /// カウントダウンの表示更新ループ本体
    ///
    /// 呼び出し側が `active` へのエントリ登録と削除を担う。
    async fn run_countdown(
        &self,
        member: &MemberRef,
        status_channel: ChannelId,
        message: MessageId,
        embed: &mut EmbedPayload,
    ) -> DirectoryResult<CountdownEnd> {
        for i in (0..=self.config.countdown_seconds).rev() {
            if !self.is_running(member.user_id).await {
                embed.description = format!("⏹ `{}` の移動を中止しました！", member.display_name);
                self.directory
                    .edit_embed(status_channel, message, embed)
                    .await?;
                return Ok(CountdownEnd::Stopped);
            }

            embed.description = format!("⏳ `{}` を移動させます: `{}`", member.display_name, i);
            self.directory
                .edit_embed(status_channel, message, embed)
                .await?;
            tokio::time::sleep(self.tick).await;
        }

        // スリープ中に停止された場合の最終確認
        if !self.is_running(member.user_id).await {
            embed.description = format!("⏹ `{}` の移動を中止しました！", member.display_name);
            self.directory
                .edit_embed(status_channel, message, embed)
                .await?;
            return Ok(CountdownEnd::Stopped);
        }
        Ok(CountdownEnd::Completed)
    }

    async fn is_running(&self, target: UserId) -> bool {
        self.active
            .lock()
            .await
            .get(&target)
            .map(|s| s.running)
            .unwrap_or(false)
    }
}

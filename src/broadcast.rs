use crate::config::BroadcastConfig;
use crate::directory::{ChannelDirectory, DirectoryResult};
use crate::types::{ChannelId, EmbedPayload, GuildId, TextChannelInfo};
use std::sync::Arc;

/// お題投下の結果
#[derive(Clone, Debug, Default)]
pub struct BroadcastReport {
    pub sent: Vec<ChannelId>,
    pub failed: Vec<ChannelId>,
}

impl BroadcastReport {
    /// コマンド実行者への報告テキスト
    pub fn summary(&self) -> String {
        let mut summary = format!("✅ 投下完了：{}件", self.sent.len());
        if !self.failed.is_empty() {
            let failed = self
                .failed
                .iter()
                .map(|id| format!("<#{}>", id))
                .collect::<Vec<_>>()
                .join(", ");
            summary.push_str(&format!("\n⚠ 失敗: {}", failed));
        }
        summary
    }
}

/// 大喜利のお題を複数チャンネルへ一括投下する
///
/// 宛先候補の収集と埋め込みの組み立て・送信までを担い、
/// 候補の選択 UI はプラットフォーム側の部品に委ねる。
pub struct Broadcaster {
    directory: Arc<dyn ChannelDirectory>,
    config: BroadcastConfig,
}

impl Broadcaster {
    pub fn new(directory: Arc<dyn ChannelDirectory>, config: BroadcastConfig) -> Self {
        Self { directory, config }
    }

    /// 投下先候補のテキストチャンネルを収集
    ///
    /// ホワイトリストが設定されていればそれで絞り込み、
    /// 表示順をカテゴリ→position で安定化する。
    pub async fn candidate_channels(
        &self,
        guild: GuildId,
    ) -> DirectoryResult<Vec<TextChannelInfo>> {
        let mut channels = self.directory.list_text_channels(guild, None).await?;

        if !self.config.allowed_dest_channel_ids.is_empty() {
            channels.retain(|ch| self.config.allowed_dest_channel_ids.contains(&ch.id));
        }

        channels.sort_by_key(|ch| {
            (
                ch.category_position.map(i32::from).unwrap_or(-1),
                ch.position,
            )
        });
        Ok(channels)
    }

    /// お題を指定の宛先すべてへ投下
    ///
    /// 個別チャンネルへの送信失敗は記録して続行し、結果レポートに含める。
    pub async fn post(
        &self,
        author: &str,
        content: &str,
        destinations: &[ChannelId],
    ) -> BroadcastReport {
        let embed = EmbedPayload {
            title: Some(self.config.post_title.clone()),
            description: content.to_string(),
            footer: Some(format!("{}{}", self.config.footer_prefix, author)),
            ..Default::default()
        };

        let mut report = BroadcastReport::default();
        for &channel in destinations {
            match self.directory.send_embed(channel, &embed).await {
                Ok(_) => report.sent.push(channel),
                Err(e) => {
                    log::warn!("[BROADCAST] <#{}> への投下に失敗: {}", channel, e);
                    report.failed.push(channel);
                }
            }
        }
        report
    }
}

use crate::directory::{ChannelDirectory, DirectoryResult};
use crate::types::{GuildId, TextChannelInfo};
use chrono::NaiveDate;
use regex_lite::Regex;
use std::sync::Arc;
use std::sync::OnceLock;

fn archive_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{8})_").expect("正規表現のコンパイルに失敗"))
}

/// 削除対象の選定結果
#[derive(Clone, Debug)]
pub enum ArchivePlan {
    /// カテゴリ自体が見つからない（ユーザー向け理由テキスト）
    NoCategory(String),
    /// 対象なし
    Empty,
    /// 削除候補
    Channels(Vec<TextChannelInfo>),
}

/// 削除実行の結果
#[derive(Clone, Debug, Default)]
pub struct ArchiveReport {
    pub deleted: usize,
    /// (チャンネル名, 失敗理由)
    pub failed: Vec<(String, String)>,
}

impl ArchiveReport {
    pub fn summary(&self) -> String {
        format!("✅ `{}` 件のアーカイブチャンネルを削除しました。", self.deleted)
    }
}

/// 古いアーカイブチャンネルの削除（`/manage_comment` コマンドの本体）
///
/// 転記先カテゴリ配下の `YYYYMMDD_` で始まるチャンネルのうち、
/// しきい値以前の日付のものを選んで削除する。
/// コマンド実行者が管理者かどうかの確認と削除前の確認 UI は
/// プラットフォーム側の責務とし、ここでは選定と実行だけを行う。
pub struct ArchivePruner {
    directory: Arc<dyn ChannelDirectory>,
    category_name: String,
}

impl ArchivePruner {
    pub fn new(directory: Arc<dyn ChannelDirectory>, category_name: impl Into<String>) -> Self {
        Self {
            directory,
            category_name: category_name.into(),
        }
    }

    /// `yyyymmdd` 形式のしきい値をパース
    ///
    /// 形式不正・存在しない日付はユーザー向けの理由テキストで返す。
    pub fn parse_threshold(date: &str) -> Result<NaiveDate, String> {
        if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
            return Err(
                "❌ 無効な日付フォーマットです。`yyyymmdd` 形式で指定してください。".to_string(),
            );
        }
        NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| {
            "❌ 無効な日付です。正しい `yyyymmdd` 形式で指定してください。".to_string()
        })
    }

    /// 削除対象のチャンネルを選定
    pub async fn plan(&self, guild: GuildId, threshold: NaiveDate) -> DirectoryResult<ArchivePlan> {
        let category = match self
            .directory
            .find_category(guild, &self.category_name)
            .await?
        {
            Some(category) => category,
            None => {
                return Ok(ArchivePlan::NoCategory(format!(
                    "⚠ `{}` カテゴリーが見つかりません。",
                    self.category_name
                )));
            }
        };

        let channels = self
            .directory
            .list_text_channels(guild, Some(category.id))
            .await?;

        let targets: Vec<TextChannelInfo> = channels
            .into_iter()
            .filter(|ch| {
                channel_date(&ch.name)
                    .map(|date| date <= threshold)
                    .unwrap_or(false)
            })
            .collect();

        if targets.is_empty() {
            Ok(ArchivePlan::Empty)
        } else {
            Ok(ArchivePlan::Channels(targets))
        }
    }

    /// 選定済みのチャンネルを削除
    ///
    /// 個別の削除失敗は記録して続行する。
    pub async fn execute(&self, targets: &[TextChannelInfo]) -> ArchiveReport {
        let mut report = ArchiveReport::default();
        for channel in targets {
            match self.directory.delete_channel(channel.id).await {
                Ok(()) => {
                    log::info!("[ARCHIVE DELETED] {} を削除しました。", channel.name);
                    report.deleted += 1;
                }
                Err(e) => {
                    log::warn!("⚠ {} の削除に失敗: {}", channel.name, e);
                    report.failed.push((channel.name.clone(), e.to_string()));
                }
            }
        }
        report
    }
}

/// チャンネル名の `YYYYMMDD_` プレフィックスから日付を取り出す
fn channel_date(name: &str) -> Option<NaiveDate> {
    let captures = archive_name_pattern().captures(name)?;
    NaiveDate::parse_from_str(&captures[1], "%Y%m%d").ok()
}

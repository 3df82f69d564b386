use crate::cache::MappingCache;
use crate::clock::{date_key, Clock};
use crate::directory::{ChannelDirectory, DirectoryResult};
use crate::normalize::destination_channel_name;
use crate::types::{ChannelRef, GuildId};
use std::sync::Arc;
use tokio::sync::Mutex;

/// ボイスチャンネルから当日分テキストチャンネルへの解決器
///
/// キャッシュ参照 → カテゴリの get-or-create → チャンネル名完全一致での
/// 検索または新規作成、という get-or-create セマンティクスをまとめる。
///
/// キャッシュのロックは参照・挿入の前後でのみ保持し、ディレクトリ API の
/// ネットワーク往復をまたいでは握らない。このため同一チャンネルへの
/// ほぼ同時のイベントが双方とも miss して二重作成に至るレースは残るが、
/// カテゴリ内の名前検索が先行作成を拾うのが通常系であり、
/// ディレクトリ側の名前一意性に委ねる設計とする。
pub struct ChannelResolver {
    directory: Arc<dyn ChannelDirectory>,
    clock: Arc<dyn Clock>,
    cache: Arc<Mutex<MappingCache>>,
    category_name: String,
}

impl ChannelResolver {
    pub fn new(
        directory: Arc<dyn ChannelDirectory>,
        clock: Arc<dyn Clock>,
        cache: Arc<Mutex<MappingCache>>,
        category_name: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            clock,
            cache,
            category_name: category_name.into(),
        }
    }

    /// 転記先テキストチャンネルを解決（なければ作成）
    ///
    /// キャッシュヒット時はネットワーク往復なしで即座に返す。
    /// 新規作成時のみ、紐づけを知らせるメッセージを 1 回だけ投稿する
    /// （既存チャンネルの採用時には投稿しない）。
    ///
    /// # Errors
    ///
    /// ディレクトリ API の到達不能または権限不足をそのまま伝播する。
    /// 内部でのリトライは行わない。
    pub async fn resolve_or_create(
        &self,
        guild: GuildId,
        source: &ChannelRef,
    ) -> DirectoryResult<ChannelRef> {
        let today = date_key(&*self.clock);

        if let Some(hit) = self.cache.lock().await.lookup(source.id, &today) {
            log::debug!(
                "[GET_CHANNEL] キャッシュヒット: {} -> {}",
                source.name,
                hit.name
            );
            return Ok(hit);
        }

        let expected_name = destination_channel_name(&today, &source.name);
        log::debug!("[GET_CHANNEL] 期待するテキストチャンネル名: `{}`", expected_name);

        let category = match self
            .directory
            .find_category(guild, &self.category_name)
            .await?
        {
            Some(category) => category,
            None => {
                log::info!(
                    "[CREATE_CATEGORY] `{}` カテゴリが存在しないため新規作成",
                    self.category_name
                );
                self.directory
                    .create_category(guild, &self.category_name)
                    .await?
            }
        };

        let destination = match self
            .directory
            .find_text_channel(guild, category.id, &expected_name)
            .await?
        {
            Some(existing) => {
                log::debug!(
                    "[EXISTING_CHANNEL] 既存のテキストチャンネル `{}` を使用",
                    expected_name
                );
                existing
            }
            None => {
                log::info!(
                    "[NEW_CHANNEL] テキストチャンネル `{}` を新規作成",
                    expected_name
                );
                let created = self
                    .directory
                    .create_text_channel(guild, category.id, &expected_name)
                    .await?;
                self.directory
                    .send_message(
                        created.id,
                        &format!(
                            "このテキストチャンネルは <#{}> に紐づいています。",
                            source.id
                        ),
                    )
                    .await?;
                created
            }
        };

        self.cache
            .lock()
            .await
            .insert(source.id, destination.clone(), today);

        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::directory::testing::MockDirectory;
    use crate::directory::DirectoryError;

    fn lounge() -> ChannelRef {
        ChannelRef {
            id: 42,
            name: "Lounge  A".to_string(),
        }
    }

    fn build_resolver(
        directory: Arc<MockDirectory>,
        clock: Arc<ManualClock>,
    ) -> ChannelResolver {
        let cache = Arc::new(Mutex::new(MappingCache::new(10)));
        ChannelResolver::new(directory, clock, cache, "インチャテキスト")
    }

    #[tokio::test]
    async fn test_first_resolution_creates_channel_and_links() {
        let directory = Arc::new(MockDirectory::new());
        let clock = Arc::new(ManualClock::at("2025-06-15 12:00:00"));
        let resolver = build_resolver(directory.clone(), clock);

        let dest = resolver.resolve_or_create(1, &lounge()).await.unwrap();

        // 名前はビット単位でこの形式になる
        assert_eq!(dest.name, "20250615_Lounge-A");

        let state = directory.state.lock().unwrap();
        assert_eq!(state.created_categories, 1);
        assert_eq!(state.created_channels, 1);
        // 紐づけメッセージは作成時に 1 回だけ
        assert_eq!(state.sent_messages.len(), 1);
        assert_eq!(
            state.sent_messages[0].1,
            "このテキストチャンネルは <#42> に紐づいています。"
        );
    }

    #[tokio::test]
    async fn test_repeated_resolution_is_idempotent() {
        let directory = Arc::new(MockDirectory::new());
        let clock = Arc::new(ManualClock::at("2025-06-15 12:00:00"));
        let resolver = build_resolver(directory.clone(), clock);

        let first = resolver.resolve_or_create(1, &lounge()).await.unwrap();
        let calls_after_first = directory.directory_calls();

        for _ in 0..4 {
            let again = resolver.resolve_or_create(1, &lounge()).await.unwrap();
            assert_eq!(again, first);
        }

        let state = directory.state.lock().unwrap();
        // 作成系の副作用は最初の 1 回のみ
        assert_eq!(state.created_channels, 1);
        assert_eq!(state.sent_messages.len(), 1);
        // 2 回目以降はキャッシュで返すためディレクトリ呼び出しは増えない
        assert_eq!(state.directory_calls, calls_after_first);
    }

    #[tokio::test]
    async fn test_adopts_existing_channel_without_link_message() {
        let directory = Arc::new(MockDirectory::new());
        {
            let mut state = directory.state.lock().unwrap();
            state.categories.push(crate::types::CategoryRef {
                id: 500,
                name: "インチャテキスト".to_string(),
            });
            state.text_channels.push((
                500,
                ChannelRef {
                    id: 900,
                    name: "20250615_Lounge-A".to_string(),
                },
            ));
        }
        let clock = Arc::new(ManualClock::at("2025-06-15 12:00:00"));
        let resolver = build_resolver(directory.clone(), clock);

        let dest = resolver.resolve_or_create(1, &lounge()).await.unwrap();
        assert_eq!(dest.id, 900);

        let state = directory.state.lock().unwrap();
        assert_eq!(state.created_channels, 0);
        // 採用時は紐づけメッセージを送らない
        assert!(state.sent_messages.is_empty());
    }

    #[tokio::test]
    async fn test_day_rollover_creates_fresh_channel() {
        let directory = Arc::new(MockDirectory::new());
        let clock = Arc::new(ManualClock::at("2025-06-15 23:50:00"));
        let resolver = build_resolver(directory.clone(), clock.clone());

        let first = resolver.resolve_or_create(1, &lounge()).await.unwrap();
        assert_eq!(first.name, "20250615_Lounge-A");

        clock.advance_days(1);

        // 日付が変わるとキャッシュは無効になり、当日の名前で作り直す
        let second = resolver.resolve_or_create(1, &lounge()).await.unwrap();
        assert_eq!(second.name, "20250616_Lounge-A");
        assert_ne!(first.id, second.id);

        let state = directory.state.lock().unwrap();
        assert_eq!(state.created_channels, 2);
    }

    #[tokio::test]
    async fn test_directory_failure_propagates() {
        let directory = Arc::new(MockDirectory::new());
        directory.state.lock().unwrap().fail_with =
            Some(DirectoryError::Unavailable("接続失敗".to_string()));
        let clock = Arc::new(ManualClock::at("2025-06-15 12:00:00"));
        let cache = Arc::new(Mutex::new(MappingCache::new(10)));
        let resolver = ChannelResolver::new(
            directory.clone(),
            clock,
            cache.clone(),
            "インチャテキスト",
        );

        let result = resolver.resolve_or_create(1, &lounge()).await;
        assert!(matches!(result, Err(DirectoryError::Unavailable(_))));

        // 失敗時はキャッシュに入れない
        assert!(cache.lock().await.is_empty());
    }
}

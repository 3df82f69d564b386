use crate::cache::MappingCache;
use crate::directory::{ChannelDirectory, DirectoryResult};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// キャッシュの定期リコンサイルタスク
///
/// 一定間隔でライブなボイスチャンネル集合をディレクトリから取得し、
/// もう存在しないソースを参照しているキャッシュエントリを削除したうえで
/// サイズ上限を適用し直す。日付ロールオーバーによる失効は `lookup` 側の
/// 遅延無効化が受け持つため、ここでは扱わない。
///
/// 停止シグナルはスリープ中なら即座に効く。スイープ実行中に届いた場合は
/// そのスイープの完了を待ってから停止する。
pub struct ReconciliationScheduler {
    directory: Arc<dyn ChannelDirectory>,
    cache: Arc<Mutex<MappingCache>>,
    interval: Duration,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl ReconciliationScheduler {
    pub fn new(
        directory: Arc<dyn ChannelDirectory>,
        cache: Arc<Mutex<MappingCache>>,
        interval: Duration,
    ) -> Self {
        Self {
            directory,
            cache,
            interval,
            stop_tx: None,
            task: None,
        }
    }

    /// バックグラウンドタスクを開始（多重起動は no-op）
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let directory = self.directory.clone();
        let cache = self.cache.clone();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            log::info!(
                "[RECONCILE] 定期スイープを開始 (間隔: {} 秒)",
                interval.as_secs()
            );
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => {
                        // スリープ中の停止: 最後のスイープは行わず即終了
                        log::debug!("[RECONCILE] 停止シグナルを受信、タスクを終了します");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = sweep_once(&directory, &cache).await {
                            // スイープの失敗でタスクは止めない
                            log::warn!("[RECONCILE] スイープに失敗: {}", e);
                        }
                    }
                }
            }
        });

        self.stop_tx = Some(stop_tx);
        self.task = Some(task);
    }

    /// タスクを停止して完了を待つ（未起動なら no-op）
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
            log::debug!("[RECONCILE] タスクが正常に停止しました");
        }
    }
}

/// 1 回分のスイープ
///
/// 全ギルドのライブなボイスチャンネル ID を集め、そこに含まれない
/// キャッシュキーを削除し、最後にサイズ上限を再適用する。
pub async fn sweep_once(
    directory: &Arc<dyn ChannelDirectory>,
    cache: &Arc<Mutex<MappingCache>>,
) -> DirectoryResult<()> {
    let mut live: HashSet<u64> = HashSet::new();
    for guild in directory.list_guilds().await? {
        for channel in directory.list_voice_channels(guild).await? {
            live.insert(channel.id);
        }
    }

    let mut cache = cache.lock().await;
    let mut removed = 0;
    for source_id in cache.keys() {
        if !live.contains(&source_id) {
            cache.remove(source_id);
            removed += 1;
        }
    }
    if removed > 0 {
        log::info!("[RECONCILE] {} 件の古いキャッシュを削除しました", removed);
    }

    let evicted = cache.enforce_size_bound();
    if evicted > 0 {
        log::info!(
            "[RECONCILE] キャッシュサイズが上限を超えたため {} 件を削除しました",
            evicted
        );
    }

    Ok(())
}

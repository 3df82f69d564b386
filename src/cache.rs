use crate::types::{ChannelId, ChannelRef, DateKey, MappingEntry};
use std::collections::VecDeque;

/// ボイスチャンネル → 転記先テキストチャンネルのマッピングキャッシュ
///
/// 挿入順を保持する有界ストア。上限超過時は「最も古く挿入された」
/// エントリから追い出す（アクセス順ではなく挿入順の FIFO）。
///
/// 正しさの要は日付キー: 転記先チャンネル名には日付が埋め込まれるため、
/// 昨日のマッピングは今日では誤りになる。`lookup` は参照のたびに
/// 日付キーを照合し、期限切れエントリをその場で破棄する（遅延無効化）。
/// ソースチャンネルの消滅は別途 `ReconciliationScheduler` の
/// 定期スイープが拾う。二重の仕組みは意図的で、片方に畳まない。
///
/// エントリ数は高々 `max_size`（既定 10）なので線形走査で足りる。
pub struct MappingCache {
    max_size: usize,
    entries: VecDeque<MappingEntry>,
}

impl MappingCache {
    /// 上限サイズを指定して生成
    ///
    /// 0 を渡された場合は 1 に切り上げる（挿入直後のエントリが
    /// 即座に追い出されることはない、という不変条件を守るため）。
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            entries: VecDeque::new(),
        }
    }

    /// キャッシュ参照
    ///
    /// エントリが存在し、かつ `date_key` が当日と一致する場合のみヒット。
    /// 日付の変わったエントリは見つけた時点で削除して miss を返す。
    pub fn lookup(&mut self, source_id: ChannelId, today: &DateKey) -> Option<ChannelRef> {
        let pos = self.entries.iter().position(|e| e.source_id == source_id)?;

        if &self.entries[pos].date_key == today {
            Some(self.entries[pos].destination.clone())
        } else {
            let stale = self.entries.remove(pos);
            if let Some(stale) = stale {
                log::debug!(
                    "[CACHE] 日付が変わったためエントリを破棄: source={} ({} -> {})",
                    stale.source_id,
                    stale.date_key,
                    today
                );
            }
            None
        }
    }

    /// エントリの挿入または置き換え
    ///
    /// 置き換えの場合も古いエントリを削除して末尾に入れ直す
    /// （更新ではなく削除と再作成、というライフサイクルに合わせる）。
    /// 挿入後にサイズ上限を適用するため、入れたばかりのエントリが
    /// 追い出されることはない。
    pub fn insert(&mut self, source_id: ChannelId, destination: ChannelRef, today: DateKey) {
        self.remove(source_id);
        self.entries.push_back(MappingEntry {
            source_id,
            destination,
            date_key: today,
        });
        self.enforce_size_bound();
    }

    /// エントリの削除（冪等）
    ///
    /// 存在しないキーの削除はエラーにせず何もしない。
    pub fn remove(&mut self, source_id: ChannelId) {
        if let Some(pos) = self.entries.iter().position(|e| e.source_id == source_id) {
            self.entries.remove(pos);
        }
    }

    /// キャッシュ中のソースチャンネル ID を列挙（スイープ用のスナップショット）
    pub fn keys(&self) -> Vec<ChannelId> {
        self.entries.iter().map(|e| e.source_id).collect()
    }

    /// サイズ上限の適用
    ///
    /// 上限を超えている間、最古（先頭）のエントリを追い出す。
    /// スイープ後の再適用にも使う。
    pub fn enforce_size_bound(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.max_size {
            if let Some(oldest) = self.entries.pop_front() {
                log::debug!(
                    "[CACHE] サイズ上限超過のため追い出し: source={}",
                    oldest.source_id
                );
                evicted += 1;
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

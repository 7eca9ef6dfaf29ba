//! 乱序事件暂存
//!
//! 广播不保证不同事件类型之间的顺序，删除或编辑可能先于创建到达。
//! 暂存按 ID 记录，有容量上限且按时间过期。

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// 暂存保留时长
pub(crate) const ORPHAN_EVENT_TTL: Duration = Duration::from_secs(300);
/// 每类暂存的容量
pub(crate) const ORPHAN_EVENT_CAPACITY: usize = 512;

pub(crate) struct ExpiringMap<V> {
    entries: HashMap<String, (V, Instant)>,
    ttl: Duration,
    capacity: usize,
}

impl<V> ExpiringMap<V> {
    pub(crate) fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// 写入并刷新过期时间；满时淘汰最早过期的一项
    pub(crate) fn insert(&mut self, id: String, value: V) {
        let now = Instant::now();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);

        if !self.entries.contains_key(&id) && self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (_, expires_at))| *expires_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(id, (value, now + self.ttl));
    }

    pub(crate) fn get(&self, id: &str) -> Option<&V> {
        let now = Instant::now();
        self.entries
            .get(id)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value)
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn take(&mut self, id: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .remove(id)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let mut map = ExpiringMap::new(Duration::from_secs(10), 8);
        map.insert("m1".to_string(), ());
        assert!(map.contains("m1"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!map.contains("m1"));
        assert_eq!(map.take("m1"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest() {
        let mut map = ExpiringMap::new(Duration::from_secs(60), 2);
        map.insert("m1".to_string(), 1);
        tokio::time::advance(Duration::from_secs(1)).await;
        map.insert("m2".to_string(), 2);
        tokio::time::advance(Duration::from_secs(1)).await;
        map.insert("m3".to_string(), 3);

        assert!(!map.contains("m1"));
        assert_eq!(map.get("m2"), Some(&2));
        assert_eq!(map.take("m3"), Some(3));
        assert!(!map.contains("m3"));
    }
}

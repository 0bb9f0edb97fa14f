/// cache.rs — Strategy Cache (§4.E)
///
/// A small, concurrently-read, infrequently-written registry holding the
/// admitted pair set and the clock/bar-index of the last recalculation.
/// Refresh is atomic from the reader's point of view: a reader always sees
/// either the previous snapshot or the new one in full, never a partial
/// update, and never blocks behind a writer mid-computation — only the
/// instant of the pointer swap takes the lock.
use crate::pair_finder::PairInfo;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub admitted_pairs: Vec<PairInfo>,
    pub last_recalc: i64,
}

pub struct StrategyCache {
    inner: RwLock<Arc<CacheSnapshot>>,
}

impl StrategyCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Arc::new(CacheSnapshot { admitted_pairs: Vec::new(), last_recalc: i64::MIN })),
        }
    }

    /// Returns a cheap clone of the current snapshot handle. Never blocks a
    /// concurrent writer for longer than the swap itself.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.inner.read().unwrap().clone()
    }

    /// Atomically replaces the admitted pair set and recalculation marker.
    pub fn refresh(&self, admitted_pairs: Vec<PairInfo>, recalc_marker: i64) {
        let new_snapshot = Arc::new(CacheSnapshot { admitted_pairs, last_recalc: recalc_marker });
        *self.inner.write().unwrap() = new_snapshot;
    }

    /// True when `now - last_recalc >= recalc_interval`, i.e. the cache is
    /// due for a refresh. `now`/`recalc_interval` are driver-supplied units
    /// (wall-clock seconds for the live driver, bar index for the backtest
    /// driver) — the cache itself has no notion of time, only ordering.
    pub fn is_stale(&self, now: i64, recalc_interval: i64) -> bool {
        let snap = self.snapshot();
        now - snap.last_recalc >= recalc_interval
    }
}

impl Default for StrategyCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_pair(s1: &str) -> PairInfo {
        PairInfo { s1: s1.into(), s2: "Z".into(), half_life: 10.0, alpha: 0.0, beta: 1.0 }
    }

    #[test]
    fn first_read_is_stale() {
        let cache = StrategyCache::new();
        assert!(cache.is_stale(0, 100));
    }

    #[test]
    fn refresh_replaces_snapshot_wholesale() {
        let cache = StrategyCache::new();
        cache.refresh(vec![dummy_pair("A")], 100);
        let snap = cache.snapshot();
        assert_eq!(snap.admitted_pairs.len(), 1);
        assert_eq!(snap.last_recalc, 100);

        cache.refresh(vec![dummy_pair("B"), dummy_pair("C")], 200);
        let snap2 = cache.snapshot();
        assert_eq!(snap2.admitted_pairs.len(), 2);
        // the handle obtained before the second refresh is unaffected (still length 1)
        assert_eq!(snap.admitted_pairs.len(), 1);
    }

    #[test]
    fn staleness_tracks_recalc_marker() {
        let cache = StrategyCache::new();
        cache.refresh(vec![], 100);
        assert!(!cache.is_stale(150, 100));
        assert!(cache.is_stale(200, 100));
    }
}

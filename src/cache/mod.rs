//! Construction bookkeeping: which origins have an attribute load
//! outstanding, which have already landed in the `World`, and which
//! failed to load at all. `request` is the single dedup point so the
//! same origin is never queried twice, however many ports declare a
//! dependency on it.

use std::collections::HashSet;

use crate::core::Origin;

#[derive(Debug, Default)]
pub struct Cache {
    pending: HashSet<Origin>,
    ready: HashSet<Origin>,
    negative: HashSet<Origin>,
}

impl Cache {
    pub fn new() -> Self {
        Cache::default()
    }

    /// Records a construction request for `origin`. Returns `true` only
    /// the first time — callers should dispatch an attribute load on
    /// `true` and do nothing on `false`.
    pub fn request(&mut self, origin: &Origin) -> bool {
        if self.pending.contains(origin) || self.ready.contains(origin) || self.negative.contains(origin) {
            return false;
        }
        self.pending.insert(origin.clone());
        true
    }

    pub fn mark_ready(&mut self, origin: &Origin) {
        self.pending.remove(origin);
        self.ready.insert(origin.clone());
    }

    pub fn mark_negative(&mut self, origin: &Origin) {
        self.pending.remove(origin);
        self.negative.insert(origin.clone());
    }

    pub fn is_negative(&self, origin: &Origin) -> bool {
        self.negative.contains(origin)
    }

    /// True once every requested origin has either landed or failed —
    /// the construction phase's quiescence condition, at which point the
    /// link phase (building `DependHandler`s) may proceed.
    pub fn is_quiescent(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_dedupes_a_pending_origin() {
        let mut cache = Cache::new();
        let a = Origin::new("www/a");
        assert!(cache.request(&a));
        assert!(!cache.request(&a));
    }

    #[test]
    fn a_ready_origin_is_never_requested_again() {
        let mut cache = Cache::new();
        let a = Origin::new("www/a");
        cache.request(&a);
        cache.mark_ready(&a);
        assert!(!cache.request(&a));
        assert!(cache.is_quiescent());
    }

    #[test]
    fn a_negative_origin_is_never_requested_again() {
        let mut cache = Cache::new();
        let a = Origin::new("www/a");
        cache.request(&a);
        cache.mark_negative(&a);
        assert!(!cache.request(&a));
        assert!(cache.is_negative(&a));
    }
}

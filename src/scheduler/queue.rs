//! One bounded queue per stage (plus `clean`), per §4.7.
//!
//! Each queue tracks three disjoint sets of origins: `active` (in-flight
//! in the subprocess runner), `queue` (ready to run, waiting only on a
//! free slot), and `stalled` (waiting on dependency resolution). An
//! origin is in at most one of the three at any time.

use std::collections::VecDeque;

use indexmap::IndexSet;

use crate::core::Origin;

#[derive(Debug)]
pub struct StageQueue {
    cap: usize,
    queue: VecDeque<Origin>,
    stalled: IndexSet<Origin>,
    active: IndexSet<Origin>,
}

impl StageQueue {
    pub fn new(cap: usize) -> Self {
        StageQueue {
            cap: cap.max(1),
            queue: VecDeque::new(),
            stalled: IndexSet::new(),
            active: IndexSet::new(),
        }
    }

    fn known(&self, origin: &Origin) -> bool {
        self.active.contains(origin) || self.stalled.contains(origin) || self.queue.contains(origin)
    }

    /// Registers `origin` as wanting this stage, as ready-to-run. A
    /// no-op if it's already tracked anywhere in this queue.
    pub fn submit_ready(&mut self, origin: Origin) {
        if !self.known(&origin) {
            self.queue.push_back(origin);
        }
    }

    /// Registers `origin` as wanting this stage but not yet resolvable.
    pub fn submit_stalled(&mut self, origin: Origin) {
        if !self.known(&origin) {
            self.stalled.insert(origin);
        }
    }

    /// Moves every stalled origin back into the ready queue so the
    /// scheduler can re-test each one's admission predicate. Called on
    /// any dependency `status_changed` event.
    pub fn wake_stalled(&mut self) {
        for origin in self.stalled.drain(..) {
            self.queue.push_back(origin);
        }
    }

    pub fn has_headroom(&self) -> bool {
        self.active.len() < self.cap
    }

    /// Pops the next ready origin without yet admitting it — the caller
    /// re-checks the dependency predicate before committing via
    /// `admit`/`defer`.
    pub fn pop_ready(&mut self) -> Option<Origin> {
        if self.has_headroom() {
            self.queue.pop_front()
        } else {
            None
        }
    }

    pub fn admit(&mut self, origin: Origin) {
        self.active.insert(origin);
    }

    /// Puts a popped-but-not-yet-admissible origin back, in `stalled` so
    /// it doesn't spin the ready queue until something actually changes.
    pub fn defer(&mut self, origin: Origin) {
        self.stalled.insert(origin);
    }

    pub fn finish(&mut self, origin: &Origin) {
        self.active.shift_remove(origin);
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.stalled.is_empty() && self.active.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn contains_active(&self, origin: &Origin) -> bool {
        self.active.contains(origin)
    }

    /// Whether `origin` is tracked by this queue but not yet admitted —
    /// ready-to-run or stalled on a dependency. Used only for monitor
    /// rendering (§6); the admission loop never needs this distinction.
    pub fn is_waiting(&self, origin: &Origin) -> bool {
        self.stalled.contains(origin) || self.queue.contains(origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(s: &str) -> Origin {
        Origin::new(s)
    }

    #[test]
    fn pop_ready_respects_the_cap() {
        let mut q = StageQueue::new(1);
        q.submit_ready(origin("a"));
        q.submit_ready(origin("b"));
        let first = q.pop_ready().unwrap();
        q.admit(first);
        assert_eq!(q.pop_ready(), None);
    }

    #[test]
    fn waking_stalled_origins_moves_them_back_to_ready() {
        let mut q = StageQueue::new(4);
        q.submit_stalled(origin("a"));
        assert_eq!(q.pop_ready(), None);
        q.wake_stalled();
        assert_eq!(q.pop_ready(), Some(origin("a")));
    }

    #[test]
    fn submit_is_idempotent_across_all_three_sets() {
        let mut q = StageQueue::new(4);
        q.submit_ready(origin("a"));
        q.submit_stalled(origin("a"));
        assert_eq!(q.queue.len() + q.stalled.len(), 1);
    }
}

use std::collections::BTreeSet;
use std::fmt::Debug;

/// What a single completion did to the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierEvent {
    /// Still waiting on this many items.
    Pending(usize),
    /// The last outstanding item arrived. Reported exactly once.
    Opened,
    /// The barrier had already opened.
    AlreadyOpen,
    /// The key was unknown or already completed.
    Ignored,
}

/// Join point over a fixed set of asynchronous loads.
///
/// Opens when every key has completed, in any order. A barrier over an empty
/// set is open from the start and never reports [`BarrierEvent::Opened`].
#[derive(Debug, Clone)]
pub struct LoadBarrier<K> {
    pending: BTreeSet<K>,
    open: bool,
}

impl<K: Ord + Debug> LoadBarrier<K> {
    pub fn new(keys: impl IntoIterator<Item = K>) -> Self {
        let pending: BTreeSet<K> = keys.into_iter().collect();
        Self {
            open: pending.is_empty(),
            pending,
        }
    }

    pub fn complete(&mut self, key: &K) -> BarrierEvent {
        if self.open {
            return BarrierEvent::AlreadyOpen;
        }
        if !self.pending.remove(key) {
            tracing::warn!(?key, "completion for unknown or finished load");
            return BarrierEvent::Ignored;
        }
        if self.pending.is_empty() {
            self.open = true;
            BarrierEvent::Opened
        } else {
            BarrierEvent::Pending(self.pending.len())
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

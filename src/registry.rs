//! Ordered, de-duplicating collection of pending side-effect descriptors.

use crate::effects::Mergeable;

/// Pending descriptors in registration order.
///
/// Two live entries share a dedup key only if the merge policy declined to
/// combine them.
#[derive(Debug, Clone)]
pub struct MergeRegistry<T> {
    entries: Vec<T>,
}

impl<T: Mergeable> MergeRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `item`, letting it absorb every pending entry with the same
    /// key whose merge succeeds. The surviving descriptor goes to the back.
    pub fn register(&mut self, mut item: T) {
        let mut kept = Vec::with_capacity(self.entries.len() + 1);
        for existing in self.entries.drain(..) {
            if existing.dedup_key() == item.dedup_key() {
                if let Some(merged) = item.merge(&existing) {
                    item = merged;
                    continue;
                }
            }
            kept.push(existing);
        }
        kept.push(item);
        self.entries = kept;
    }

    /// Drop every entry matching `predicate`; returns how many were removed.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !predicate(entry));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    /// Take all pending entries, leaving the registry empty.
    pub fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.entries)
    }
}

impl<T: Mergeable> Default for MergeRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

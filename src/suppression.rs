//! Tag-scoped suppression of sub-actions.

use std::collections::{HashMap, HashSet};

use nova_common::SuppressionTag;

use crate::action::ActionKey;

/// Maps an action identity to the tags currently suppressing it.
///
/// An action is suppressed while at least one tag is held for it. Entries
/// whose tag set becomes empty are removed, so the map never holds an empty
/// set.
#[derive(Debug, Default, Clone)]
pub struct SuppressionRegistry {
    suppressed: HashMap<ActionKey, HashSet<SuppressionTag>>,
}

impl SuppressionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suppress(&mut self, action: ActionKey, tag: SuppressionTag) {
        self.suppressed.entry(action).or_default().insert(tag);
    }

    pub fn unsuppress(&mut self, action: ActionKey, tag: SuppressionTag) {
        if let Some(tags) = self.suppressed.get_mut(&action) {
            tags.remove(&tag);
            if tags.is_empty() {
                self.suppressed.remove(&action);
            }
        }
    }

    pub fn is_suppressed(&self, action: &ActionKey) -> bool {
        self.suppressed.contains_key(action)
    }

    /// Number of actions currently suppressed.
    pub fn len(&self) -> usize {
        self.suppressed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suppressed.is_empty()
    }
}

//! Tracking of in-flight backend operations per item.

use std::collections::HashSet;
use std::hash::Hash;

/// Ids with an operation in flight.
///
/// Starting an operation for an id that is already pending is a no-op, so a
/// repeated trigger never issues a second concurrent call for the same item.
#[derive(Debug, Clone)]
pub struct PendingSet<K> {
    ids: HashSet<K>,
}

impl<K> Default for PendingSet<K> {
    fn default() -> Self {
        Self {
            ids: HashSet::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> PendingSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `ids` pending and returns those that were not pending already,
    /// in input order.
    pub fn begin<I>(&mut self, ids: I) -> Vec<K>
    where
        I: IntoIterator<Item = K>,
    {
        ids.into_iter()
            .filter(|id| self.ids.insert(id.clone()))
            .collect()
    }

    /// Clears `ids`, whether the operation resolved or rejected.
    pub fn finish<'a, I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        for id in ids {
            self.ids.remove(id);
        }
    }

    pub fn contains(&self, id: &K) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

use dashmap::DashSet;

use crate::fetcher::Identifier;

/// Identifiers already dispatched for fetching during one crawl.
#[derive(Debug)]
pub struct VisitedSet<Id: Identifier> {
    ids: DashSet<Id>,
}

impl<Id: Identifier> Default for VisitedSet<Id> {
    fn default() -> Self {
        Self {
            ids: DashSet::new(),
        }
    }
}

impl<Id: Identifier> VisitedSet<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as visited, returns `true` only for the caller that marked it.
    ///
    /// Check and insert happen under the same shard lock.
    pub fn try_mark(&self, id: &Id) -> bool {
        self.ids.insert(id.clone())
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

use std::collections::HashSet;

use helpdesk_core::types::DbId;

/// Ids with a local write that the store has not yet echoed back.
#[derive(Debug, Default, Clone)]
pub struct PendingWrites {
    ids: HashSet<DbId>,
}

impl PendingWrites {
    pub fn mark(&mut self, id: DbId) {
        self.ids.insert(id);
    }

    /// Clear the mark for `id`, returning whether one was set.
    pub fn settle(&mut self, id: DbId) -> bool {
        self.ids.remove(&id)
    }

    pub fn contains(&self, id: DbId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

//! Diff-merge of a cached collection against a freshly fetched one.

use crate::types::{EntityId, Theme, Word};
use std::collections::{HashMap, HashSet};

/// A cached record keyed by a stable id
pub trait Entity: Clone {
    fn id(&self) -> EntityId;

    /// Compare only the fields a user can see and edit
    fn same_fields(&self, other: &Self) -> bool;

    /// Created locally and not yet echoed by a fetch
    fn is_local_only(&self) -> bool {
        false
    }

    fn set_local_only(&mut self, _local_only: bool) {}
}

impl Entity for Theme {
    fn id(&self) -> EntityId {
        self.id
    }

    fn same_fields(&self, other: &Self) -> bool {
        self.name == other.name && self.theme_type == other.theme_type
    }

    fn is_local_only(&self) -> bool {
        self.local_only
    }

    fn set_local_only(&mut self, local_only: bool) {
        self.local_only = local_only;
    }
}

impl Entity for Word {
    fn id(&self) -> EntityId {
        self.id
    }

    fn same_fields(&self, other: &Self) -> bool {
        self.word == other.word
    }

    fn is_local_only(&self) -> bool {
        self.local_only
    }

    fn set_local_only(&mut self, local_only: bool) {
        self.local_only = local_only;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation<T> {
    /// New collection, sorted by id
    pub merged: Vec<T>,
    pub added: Vec<EntityId>,
    pub updated: Vec<EntityId>,
    pub removed: Vec<EntityId>,
    /// Local-only entries now echoed by the server
    pub confirmed: Vec<EntityId>,
    /// Local-only entries kept for one more pass although the server lacks them
    pub pending: Vec<EntityId>,
}

impl<T> Reconciliation<T> {
    /// False means the cached collection can be left as it is
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty()
            || !self.updated.is_empty()
            || !self.removed.is_empty()
            || !self.confirmed.is_empty()
            || !self.pending.is_empty()
    }
}

/// Pure function of its inputs, so overlapping syncs are harmless
pub fn reconcile<T: Entity>(local: &[T], remote: &[T]) -> Reconciliation<T> {
    let local_ids: HashSet<EntityId> = local.iter().map(Entity::id).collect();
    let remote_by_id: HashMap<EntityId, &T> = remote.iter().map(|e| (e.id(), e)).collect();

    let mut merged = Vec::with_capacity(remote.len().max(local.len()));
    let mut updated = Vec::new();
    let mut removed = Vec::new();
    let mut confirmed = Vec::new();
    let mut pending = Vec::new();

    for entry in local {
        match remote_by_id.get(&entry.id()) {
            Some(remote_entry) => {
                if !entry.same_fields(remote_entry) {
                    updated.push(entry.id());
                    merged.push((*remote_entry).clone());
                } else if entry.is_local_only() {
                    confirmed.push(entry.id());
                    merged.push((*remote_entry).clone());
                } else {
                    merged.push(entry.clone());
                }
            }
            None if entry.is_local_only() => {
                // Survives this pass only; absent again next time means gone
                let mut kept = entry.clone();
                kept.set_local_only(false);
                pending.push(entry.id());
                merged.push(kept);
            }
            None => removed.push(entry.id()),
        }
    }

    let mut added = Vec::new();
    for entry in remote {
        if !local_ids.contains(&entry.id()) {
            added.push(entry.id());
            merged.push(entry.clone());
        }
    }

    merged.sort_by_key(Entity::id);
    merged.dedup_by_key(|e| e.id());

    Reconciliation {
        merged,
        added,
        updated,
        removed,
        confirmed,
        pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme(id: EntityId, name: &str) -> Theme {
        Theme {
            id,
            name: name.to_string(),
            theme_type: "words".to_string(),
            local_only: false,
        }
    }

    fn word(id: EntityId, text: &str) -> Word {
        Word {
            id,
            theme_id: 1,
            word: text.to_string(),
            local_only: false,
        }
    }

    #[test]
    fn test_update_and_add() {
        let local = vec![theme(1, "A")];
        let remote = vec![theme(1, "B"), theme(2, "C")];

        let result = reconcile(&local, &remote);
        assert_eq!(result.merged, vec![theme(1, "B"), theme(2, "C")]);
        assert_eq!(result.updated, vec![1]);
        assert_eq!(result.added, vec![2]);
        assert!(result.removed.is_empty());
        assert!(result.has_changes());
    }

    #[test]
    fn test_empty_remote_removes_everything() {
        let local = vec![theme(1, "A"), theme(2, "B")];
        let result = reconcile(&local, &[]);
        assert!(result.merged.is_empty());
        assert_eq!(result.removed, vec![1, 2]);
    }

    #[test]
    fn test_identical_collections_have_no_changes() {
        let local = vec![word(1, "Pizza"), word(2, "Sushi")];
        let result = reconcile(&local, &local.clone());
        assert_eq!(result.merged, local);
        assert!(!result.has_changes());
    }

    #[test]
    fn test_result_sorted_by_id() {
        let local = vec![word(5, "Ramen"), word(2, "Sushi")];
        let remote = vec![word(9, "Tacos"), word(2, "Sushi"), word(1, "Pizza"), word(5, "Ramen")];

        let result = reconcile(&local, &remote);
        let ids: Vec<_> = result.merged.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 2, 5, 9]);
        assert_eq!(result.added, vec![9, 1]);
    }

    #[test]
    fn test_theme_type_is_compared() {
        let local = vec![theme(1, "Food")];
        let mut changed = theme(1, "Food");
        changed.theme_type = "images".to_string();

        let result = reconcile(&local, &[changed.clone()]);
        assert_eq!(result.updated, vec![1]);
        assert_eq!(result.merged, vec![changed]);
    }

    #[test]
    fn test_word_theme_id_is_not_compared() {
        let local = vec![word(1, "Pizza")];
        let mut moved = word(1, "Pizza");
        moved.theme_id = 7;

        let result = reconcile(&local, &[moved]);
        assert!(!result.has_changes());
    }

    #[test]
    fn test_local_only_entry_survives_one_pass() {
        let mut optimistic = word(3, "Gyoza");
        optimistic.local_only = true;
        let local = vec![word(1, "Pizza"), optimistic];
        let remote = vec![word(1, "Pizza")];

        let first = reconcile(&local, &remote);
        assert_eq!(first.pending, vec![3]);
        assert!(first.removed.is_empty());
        assert_eq!(first.merged.len(), 2);
        assert!(!first.merged[1].local_only);

        // Still missing on the next sync: now it goes
        let second = reconcile(&first.merged, &remote);
        assert_eq!(second.removed, vec![3]);
        assert_eq!(second.merged, vec![word(1, "Pizza")]);
    }

    #[test]
    fn test_local_only_entry_confirmed_by_server() {
        let mut optimistic = word(3, "Gyoza");
        optimistic.local_only = true;

        let result = reconcile(&[optimistic], &[word(3, "Gyoza")]);
        assert_eq!(result.confirmed, vec![3]);
        assert!(result.added.is_empty());
        assert_eq!(result.merged, vec![word(3, "Gyoza")]);
    }

    #[test]
    fn test_running_twice_is_stable() {
        let local = vec![theme(1, "A"), theme(4, "D")];
        let remote = vec![theme(1, "A2"), theme(2, "B")];

        let first = reconcile(&local, &remote);
        let second = reconcile(&first.merged, &remote);
        assert_eq!(second.merged, first.merged);
        assert!(!second.has_changes());
    }
}

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::binder::store::PositionStore;

/// Instance ids the owner has marked as physically missing from their binder.
///
/// Display-only: membership never changes the slot map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissingOverlay {
    instances: HashSet<Uuid>,
}

impl MissingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the id was not already marked.
    pub fn mark_missing(&mut self, instance_id: Uuid) -> bool {
        self.instances.insert(instance_id)
    }

    /// Returns `true` if the id was marked.
    pub fn unmark(&mut self, instance_id: Uuid) -> bool {
        self.instances.remove(&instance_id)
    }

    pub fn is_missing(&self, instance_id: Uuid) -> bool {
        self.instances.contains(&instance_id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Drops marks whose instance is no longer placed. Returns how many were dropped.
    pub fn prune(&mut self, store: &PositionStore) -> usize {
        let before = self.instances.len();
        let placed: HashSet<Uuid> = store.iter().map(|(_, e)| e.instance_id).collect();
        self.instances.retain(|id| placed.contains(id));
        before - self.instances.len()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::store::tests::store_with;

    #[test]
    fn test_mark_then_unmark_round_trip() {
        let mut overlay = MissingOverlay::new();
        let id = Uuid::new_v4();
        assert!(!overlay.is_missing(id));

        assert!(overlay.mark_missing(id));
        assert!(overlay.is_missing(id));
        assert!(!overlay.mark_missing(id), "second mark is a no-op");

        assert!(overlay.unmark(id));
        assert!(!overlay.is_missing(id));
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_unmark_unknown_is_noop() {
        let mut overlay = MissingOverlay::new();
        assert!(!overlay.unmark(Uuid::new_v4()));
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_prune_drops_unplaced_instances() {
        let store = store_with([0, 1]);
        let placed = store.get(1).unwrap().instance_id;
        let gone = Uuid::new_v4();

        let mut overlay = MissingOverlay::new();
        overlay.mark_missing(placed);
        overlay.mark_missing(gone);

        assert_eq!(overlay.prune(&store), 1);
        assert!(overlay.is_missing(placed));
        assert!(!overlay.is_missing(gone));
    }
}

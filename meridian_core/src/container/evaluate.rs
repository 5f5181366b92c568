// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame evaluation and change tracking.
//!
//! Evaluation drains each dirty channel into a [`ContainerChanges`] record:
//!
//! 1. **TRANSFORM**: containers whose screen transform changed.
//! 2. **CONTENT**: containers whose child list or child order changed.
//! 3. **TOPOLOGY**: drained and discarded; creation and destruction are
//!    reported through the lifecycle lists.
//!
//! Nodes removed from a container and not placed anywhere else by the time
//! of evaluation are reported as detached.
//!
//! [`ContainerChanges`] uses raw slot indices (`u32`) rather than
//! [`ContainerId`] handles so that presenters can index their own per-slot
//! state directly and read the store through the `*_at()` accessors without
//! paying for generation checks.
//!
//! [`ContainerId`]: super::ContainerId

use alloc::vec::Vec;

use super::store::ContainerStore;
use crate::dirty;
use crate::surface::NodeKey;

/// The set of changes produced by a single [`ContainerStore::evaluate`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerChanges {
    /// Containers created since the last evaluate, oldest first.
    pub added: Vec<u32>,
    /// Containers destroyed since the last evaluate.
    pub removed: Vec<u32>,
    /// Live containers whose screen transform changed.
    pub transforms: Vec<u32>,
    /// Live containers whose children changed.
    pub content: Vec<u32>,
    /// Nodes that are no longer in any container.
    pub detached: Vec<NodeKey>,
}

impl ContainerChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
        self.transforms.clear();
        self.content.clear();
        self.detached.clear();
    }

    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.transforms.is_empty()
            && self.content.is_empty()
            && self.detached.is_empty()
    }
}

impl ContainerStore {
    /// Drains all dirty channels and returns the set of changes.
    pub fn evaluate(&mut self) -> ContainerChanges {
        let mut changes = ContainerChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer
    /// to avoid allocation.
    pub fn evaluate_into(&mut self, changes: &mut ContainerChanges) {
        changes.clear();

        // A slot destroyed and re-created within one frame shows up in both
        // lifecycle lists; presenters apply removals first.
        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);

        let live = |store: &Self, idx: &u32| store.creation_order.contains(idx);

        let transforms: Vec<u32> = self
            .dirty
            .drain(dirty::TRANSFORM)
            .deterministic()
            .run()
            .collect();
        changes.transforms = transforms.into_iter().filter(|i| live(self, i)).collect();

        let content: Vec<u32> = self
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();
        changes.content = content.into_iter().filter(|i| live(self, i)).collect();

        // Drain TOPOLOGY channel (just consume, lifecycle lists carry it).
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();

        let mut detached = core::mem::take(&mut self.pending_detached);
        detached.sort_unstable();
        detached.dedup();
        detached.retain(|key| !self.node_slot.contains_key(key));
        changes.detached = detached;
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use crate::container::{ContainerStore, StackOrder};
    use crate::geometry::PixelSnapping;
    use crate::surface::NodeKey;

    const BBOX: Rect = Rect::new(0.0, 0.0, 100.0, 100.0);

    #[test]
    fn creation_is_reported_once() {
        let mut store = ContainerStore::new();
        let id = store.create(BBOX, 1.0);
        let changes = store.evaluate();
        assert_eq!(changes.added, [id.index()]);
        assert!(store.evaluate().is_empty(), "second evaluate should be clean");
    }

    #[test]
    fn node_moves_are_not_detaches() {
        let mut store = ContainerStore::new();
        let a = store.create(BBOX, 1.0);
        let b = store.create(BBOX, 1.0);
        store.add_node(a, NodeKey(1), BBOX, StackOrder::default());
        let _ = store.evaluate();

        store.remove_node(NodeKey(1));
        store.add_node(b, NodeKey(1), BBOX, StackOrder::default());
        let changes = store.evaluate();
        assert!(changes.detached.is_empty());
        assert_eq!(changes.content.len(), 2);
        assert!(changes.content.contains(&a.index()));
        assert!(changes.content.contains(&b.index()));
    }

    #[test]
    fn removed_nodes_are_detached() {
        let mut store = ContainerStore::new();
        let a = store.create(BBOX, 1.0);
        store.add_node(a, NodeKey(1), BBOX, StackOrder::default());
        store.add_node(a, NodeKey(2), BBOX, StackOrder::default());
        let _ = store.evaluate();

        store.remove_node(NodeKey(2));
        store.remove_node(NodeKey(1));
        let changes = store.evaluate();
        assert_eq!(changes.detached, [NodeKey(1), NodeKey(2)]);
    }

    #[test]
    fn destroyed_containers_drop_pending_transforms() {
        let mut store = ContainerStore::new();
        let a = store.create(BBOX, 1.0);
        let _ = store.evaluate();

        let moved = Rect::new(10.0, 0.0, 110.0, 100.0);
        store.update_transform(a, moved, 1.0, PixelSnapping::SubPixel);
        store.destroy(a);
        let changes = store.evaluate();
        assert_eq!(changes.removed, [a.index()]);
        assert!(changes.transforms.is_empty());
    }
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays container storage with allocation, child placement, and
//! transform management.

use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size, TranslateScale};
use understory_dirty::{CycleHandling, DirtyTracker};

use super::id::ContainerId;
use crate::dirty;
use crate::geometry::{PixelSnapping, screen_transform};
use crate::surface::NodeKey;

/// How a child is positioned inside its container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    /// Scales with the container and covers `bbox` (world coordinates).
    Scaled {
        /// World rectangle covered by the node.
        bbox: Rect,
    },
    /// Keeps its on-screen size: the top-left corner is pinned to `anchor`
    /// (world coordinates) and the node is `size` screen pixels large.
    FixedSize {
        /// World position of the node's top-left corner.
        anchor: Point,
        /// Size in screen pixels.
        size: Size,
    },
}

/// Stacking key of a child inside a container.
///
/// Children are ordered by layer position first and tier second; within the
/// same key, later insertions stack on top.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StackOrder {
    /// Position of the owning layer, bottom is 0.
    pub layer: u32,
    /// Tier inside the layer: the raster surface uses 0, retained nodes 1.
    pub tier: u8,
}

/// One node placed in a container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Child {
    /// The node.
    pub key: NodeKey,
    /// Where it sits.
    pub placement: Placement,
    /// Stacking key.
    pub order: StackOrder,
    seq: u64,
}

impl Child {
    fn sort_key(&self) -> (StackOrder, u64) {
        (self.order, self.seq)
    }
}

/// Struct-of-arrays storage for all containers.
///
/// Containers are addressed by [`ContainerId`] handles. Destroyed containers
/// are recycled via a free list, and generation counters prevent stale handle
/// access. Live containers are kept in creation order; the last one is the
/// paint target for new nodes.
#[derive(Debug)]
pub struct ContainerStore {
    // -- Properties --
    pub(crate) bbox: Vec<Rect>,
    pub(crate) resolution: Vec<f64>,
    pub(crate) transform: Vec<TranslateScale>,
    pub(crate) children: Vec<Vec<Child>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
    pub(crate) creation_order: Vec<u32>,

    // -- Node index --
    pub(crate) node_slot: HashMap<NodeKey, u32>,
    next_seq: u64,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
    pub(crate) pending_detached: Vec<NodeKey>,
    pub(crate) emptied: Vec<u32>,
}

impl Default for ContainerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bbox: Vec::new(),
            resolution: Vec::new(),
            transform: Vec::new(),
            children: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            creation_order: Vec::new(),
            node_slot: HashMap::new(),
            next_seq: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            pending_detached: Vec::new(),
            emptied: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a container holding a snapshot of `bbox` at `resolution` and
    /// makes it the latest one.
    ///
    /// The container starts with an identity screen transform and no
    /// children.
    pub fn create(&mut self, bbox: Rect, resolution: f64) -> ContainerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.bbox[i] = bbox;
            self.resolution[i] = resolution;
            self.transform[i] = TranslateScale::default();
            self.children[i].clear();
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.bbox.push(bbox);
            self.resolution.push(resolution);
            self.transform.push(TranslateScale::default());
            self.children.push(Vec::new());
            self.generation.push(0);
            idx
        };

        self.creation_order.push(idx);
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
        log::trace!("container {idx} created at resolution {resolution}");

        ContainerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a container, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the container still has children or if the handle is stale.
    pub fn destroy(&mut self, id: ContainerId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.children[idx as usize].is_empty(),
            "cannot destroy container with children"
        );

        self.creation_order.retain(|&i| i != idx);
        self.emptied.retain(|&i| i != idx);
        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;

        self.free_list.push(idx);
        self.pending_removed.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
        log::trace!("container {idx} destroyed");
    }

    /// Returns whether the given handle refers to a live container.
    #[must_use]
    pub fn is_alive(&self, id: ContainerId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Number of live containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.creation_order.len()
    }

    /// Whether no container is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creation_order.is_empty()
    }

    /// The most recently created live container.
    #[must_use]
    pub fn latest(&self) -> Option<ContainerId> {
        self.creation_order.last().map(|&idx| self.id_at(idx))
    }

    /// Live containers, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.creation_order.iter().map(|&idx| self.id_at(idx))
    }

    /// Position of a container in creation order. Later containers stack on
    /// top of earlier ones.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn position(&self, id: ContainerId) -> usize {
        self.validate(id);
        self.creation_order
            .iter()
            .position(|&i| i == id.idx)
            .unwrap_or(usize::MAX)
    }

    // -- Property getters --

    /// World rectangle of the container's snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn bbox(&self, id: ContainerId) -> Rect {
        self.validate(id);
        self.bbox[id.idx as usize]
    }

    /// Resolution of the container's snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn resolution(&self, id: ContainerId) -> f64 {
        self.validate(id);
        self.resolution[id.idx as usize]
    }

    /// Current screen transform.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn transform(&self, id: ContainerId) -> TranslateScale {
        self.validate(id);
        self.transform[id.idx as usize]
    }

    /// Children, bottom to top.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn children(&self, id: ContainerId) -> &[Child] {
        self.validate(id);
        &self.children[id.idx as usize]
    }

    /// The container currently holding `key`.
    #[must_use]
    pub fn container_of(&self, key: NodeKey) -> Option<ContainerId> {
        self.node_slot.get(&key).map(|&idx| self.id_at(idx))
    }

    // -- Transform API --

    /// Re-bases the container onto a viewport showing `view_bbox` at
    /// `view_res`.
    ///
    /// Only the container's own transform changes; children keep their
    /// container-local placement.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn update_transform(
        &mut self,
        id: ContainerId,
        view_bbox: Rect,
        view_res: f64,
        snapping: PixelSnapping,
    ) {
        self.validate(id);
        let i = id.idx as usize;
        let next = screen_transform(
            self.bbox[i],
            self.resolution[i],
            view_bbox,
            view_res,
            snapping,
        );
        let prev = self.transform[i];
        if prev.translation != next.translation || prev.scale != next.scale {
            self.transform[i] = next;
            self.dirty.mark(id.idx, dirty::TRANSFORM);
        }
    }

    // -- Child API --

    /// Places `key` in the container, scaled to cover the world `bbox`.
    ///
    /// A node already placed elsewhere is moved.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn add_node(&mut self, id: ContainerId, key: NodeKey, bbox: Rect, order: StackOrder) {
        self.insert_child(id, key, Placement::Scaled { bbox }, order);
    }

    /// Places `key` in the container at a fixed on-screen size with its
    /// top-left corner at the world point `anchor`.
    ///
    /// A node already placed elsewhere is moved.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn add_fixed_size_node(
        &mut self,
        id: ContainerId,
        key: NodeKey,
        anchor: Point,
        size: Size,
        order: StackOrder,
    ) {
        self.insert_child(id, key, Placement::FixedSize { anchor, size }, order);
    }

    /// Moves `key`, keeping its placement and order, into another container.
    ///
    /// Returns `false` if the node is not placed anywhere.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn move_node(&mut self, key: NodeKey, to: ContainerId) -> bool {
        self.validate(to);
        let Some(&from) = self.node_slot.get(&key) else {
            return false;
        };
        if from == to.idx {
            return true;
        }
        let Some(child) = self.take_child(from, key) else {
            return false;
        };
        self.insert_child(to, key, child.placement, child.order);
        true
    }

    /// Removes `key` from its container.
    ///
    /// When the last child of a container is removed, the container is
    /// reported by [`take_emptied`](Self::take_emptied).
    pub fn remove_node(&mut self, key: NodeKey) -> Option<ContainerId> {
        let idx = *self.node_slot.get(&key)?;
        self.take_child(idx, key)?;
        self.pending_detached.push(key);
        Some(self.id_at(idx))
    }

    /// Changes the stacking key of `key` within its container.
    pub fn set_order(&mut self, key: NodeKey, order: StackOrder) {
        let Some(&idx) = self.node_slot.get(&key) else {
            return;
        };
        let list = &mut self.children[idx as usize];
        let Some(pos) = list.iter().position(|c| c.key == key) else {
            return;
        };
        if list[pos].order == order {
            return;
        }
        let mut child = list.remove(pos);
        child.order = order;
        let at = list.partition_point(|c| c.sort_key() <= child.sort_key());
        list.insert(at, child);
        self.dirty.mark(idx, dirty::CONTENT);
    }

    /// Returns the containers that became empty since the last call and are
    /// still empty and alive.
    pub fn take_emptied(&mut self) -> Vec<ContainerId> {
        let mut out = Vec::new();
        for idx in core::mem::take(&mut self.emptied) {
            let alive = self.creation_order.contains(&idx);
            if alive && self.children[idx as usize].is_empty() {
                out.push(self.id_at(idx));
            }
        }
        out
    }

    /// Container-local pixel rectangle of a child.
    ///
    /// For [`Placement::FixedSize`] children the size is in screen pixels and
    /// the presenter must cancel the container's scale around the origin.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn child_rect(&self, id: ContainerId, child: &Child) -> Rect {
        self.validate(id);
        self.child_rect_at(id.idx, child)
    }

    // -- Unchecked index accessors (for presenters) --
    //
    // These bypass generation checks. Callers must only pass indices that
    // came from a `ContainerChanges` produced by `evaluate()`.

    /// Container-local pixel rectangle of a child, by raw slot index.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    #[must_use]
    pub fn child_rect_at(&self, idx: u32, child: &Child) -> Rect {
        let i = idx as usize;
        let c = self.bbox[i];
        let res = self.resolution[i];
        match child.placement {
            Placement::Scaled { bbox } => Rect::from_origin_size(
                Point::new((bbox.x0 - c.x0) / res, (c.y1 - bbox.y1) / res),
                Size::new(bbox.width() / res, bbox.height() / res),
            ),
            Placement::FixedSize { anchor, size } => Rect::from_origin_size(
                Point::new((anchor.x - c.x0) / res, (c.y1 - anchor.y) / res),
                size,
            ),
        }
    }

    /// Screen transform by raw slot index.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    #[must_use]
    pub fn transform_at(&self, idx: u32) -> TranslateScale {
        self.transform[idx as usize]
    }

    /// Children by raw slot index, bottom to top.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    #[must_use]
    pub fn children_at(&self, idx: u32) -> &[Child] {
        &self.children[idx as usize]
    }

    /// Resolution by raw slot index.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    #[must_use]
    pub fn resolution_at(&self, idx: u32) -> f64 {
        self.resolution[idx as usize]
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    fn validate(&self, id: ContainerId) {
        assert!(self.is_alive(id), "stale ContainerId: {id:?}");
    }

    fn id_at(&self, idx: u32) -> ContainerId {
        ContainerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn insert_child(
        &mut self,
        id: ContainerId,
        key: NodeKey,
        placement: Placement,
        order: StackOrder,
    ) {
        self.validate(id);
        if let Some(&from) = self.node_slot.get(&key) {
            self.take_child(from, key);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let child = Child {
            key,
            placement,
            order,
            seq,
        };
        let list = &mut self.children[id.idx as usize];
        let at = list.partition_point(|c| c.sort_key() <= child.sort_key());
        list.insert(at, child);
        self.node_slot.insert(key, id.idx);
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    fn take_child(&mut self, idx: u32, key: NodeKey) -> Option<Child> {
        let list = &mut self.children[idx as usize];
        let pos = list.iter().position(|c| c.key == key)?;
        let child = list.remove(pos);
        let now_empty = list.is_empty();
        self.node_slot.remove(&key);
        self.dirty.mark(idx, dirty::CONTENT);
        if now_empty {
            self.emptied.push(idx);
        }
        Some(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    const BBOX: Rect = Rect::new(-128.0, -128.0, 128.0, 128.0);

    fn order(layer: u32) -> StackOrder {
        StackOrder { layer, tier: 1 }
    }

    #[test]
    fn create_and_destroy() {
        let mut store = ContainerStore::new();
        let id = store.create(BBOX, 1.0);
        assert!(store.is_alive(id));
        assert_eq!(store.latest(), Some(id));
        store.destroy(id);
        assert!(!store.is_alive(id));
        assert!(store.is_empty());
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = ContainerStore::new();
        let a = store.create(BBOX, 1.0);
        store.destroy(a);
        let b = store.create(BBOX, 2.0);
        assert_eq!(a.idx, b.idx, "slot should be reused");
        assert!(!store.is_alive(a));
        assert!(store.is_alive(b));
    }

    #[test]
    #[should_panic(expected = "cannot destroy container with children")]
    fn destroy_with_children_panics() {
        let mut store = ContainerStore::new();
        let id = store.create(BBOX, 1.0);
        store.add_node(id, NodeKey(1), BBOX, order(0));
        store.destroy(id);
    }

    #[test]
    #[should_panic(expected = "stale ContainerId")]
    fn destroyed_handle_panics_on_bbox() {
        let mut store = ContainerStore::new();
        let id = store.create(BBOX, 1.0);
        store.destroy(id);
        let _ = store.bbox(id);
    }

    #[test]
    fn children_are_sorted_by_stack_order() {
        let mut store = ContainerStore::new();
        let id = store.create(BBOX, 1.0);
        store.add_node(id, NodeKey(1), BBOX, order(2));
        store.add_node(id, NodeKey(2), BBOX, order(0));
        store.add_node(id, NodeKey(3), BBOX, order(1));
        store.add_node(id, NodeKey(4), BBOX, order(0));
        let keys: Vec<u64> = store.children(id).iter().map(|c| c.key.0).collect();
        assert_eq!(keys, [2, 4, 3, 1]);

        store.set_order(NodeKey(1), order(0));
        let keys: Vec<u64> = store.children(id).iter().map(|c| c.key.0).collect();
        assert_eq!(keys, [2, 4, 1, 3]);
    }

    #[test]
    fn adding_a_placed_node_moves_it() {
        let mut store = ContainerStore::new();
        let a = store.create(BBOX, 1.0);
        let b = store.create(BBOX, 2.0);
        store.add_node(a, NodeKey(1), BBOX, order(0));
        store.add_node(b, NodeKey(1), BBOX, order(0));
        assert!(store.children(a).is_empty());
        assert_eq!(store.container_of(NodeKey(1)), Some(b));
        assert_eq!(store.take_emptied(), [a]);
    }

    #[test]
    fn move_node_keeps_placement() {
        let mut store = ContainerStore::new();
        let a = store.create(BBOX, 1.0);
        let b = store.create(BBOX, 1.0);
        store.add_fixed_size_node(a, NodeKey(5), Point::ORIGIN, Size::new(8.0, 8.0), order(3));
        assert!(store.move_node(NodeKey(5), b));
        let child = store.children(b)[0];
        assert_eq!(child.order, order(3));
        assert!(matches!(child.placement, Placement::FixedSize { .. }));
        assert!(!store.move_node(NodeKey(99), b));
    }

    #[test]
    fn removing_last_child_reports_empty() {
        let mut store = ContainerStore::new();
        let id = store.create(BBOX, 1.0);
        store.add_node(id, NodeKey(1), BBOX, order(0));
        store.add_node(id, NodeKey(2), BBOX, order(0));
        assert_eq!(store.remove_node(NodeKey(1)), Some(id));
        assert!(store.take_emptied().is_empty());
        assert_eq!(store.remove_node(NodeKey(2)), Some(id));
        assert_eq!(store.take_emptied(), [id]);
        assert_eq!(store.remove_node(NodeKey(2)), None);
    }

    #[test]
    fn refilled_container_is_not_reported_empty() {
        let mut store = ContainerStore::new();
        let id = store.create(BBOX, 1.0);
        store.add_node(id, NodeKey(1), BBOX, order(0));
        store.remove_node(NodeKey(1));
        store.add_node(id, NodeKey(2), BBOX, order(0));
        assert!(store.take_emptied().is_empty());
    }

    #[test]
    fn child_rect_is_relative_to_container_corner() {
        let mut store = ContainerStore::new();
        let id = store.create(BBOX, 2.0);
        store.add_node(id, NodeKey(1), Rect::new(-100.0, 0.0, -60.0, 20.0), order(0));
        let child = store.children(id)[0];
        assert_eq!(
            store.child_rect(id, &child),
            Rect::new(14.0, 54.0, 34.0, 64.0)
        );
    }

    #[test]
    fn update_transform_marks_only_real_changes() {
        let mut store = ContainerStore::new();
        let id = store.create(BBOX, 1.0);
        let _ = store.evaluate();

        store.update_transform(id, BBOX, 1.0, PixelSnapping::SubPixel);
        assert!(store.evaluate().transforms.is_empty());

        store.update_transform(id, BBOX + Vec2::new(5.0, 0.0), 1.0, PixelSnapping::SubPixel);
        let changes = store.evaluate();
        assert_eq!(changes.transforms, [id.idx]);
        assert_eq!(store.transform(id).translation, Vec2::new(-5.0, 0.0));
    }

    #[test]
    fn containers_keep_creation_order() {
        let mut store = ContainerStore::new();
        let a = store.create(BBOX, 1.0);
        let b = store.create(BBOX, 2.0);
        let c = store.create(BBOX, 4.0);
        store.destroy(b);
        let ids: Vec<ContainerId> = store.ids().collect();
        assert_eq!(ids, [a, c]);
        assert_eq!(store.position(c), 1);
        // Reused slot is appended, not put back in b's place.
        let d = store.create(BBOX, 8.0);
        assert_eq!(store.latest(), Some(d));
        assert_eq!(store.position(d), 2);
    }
}

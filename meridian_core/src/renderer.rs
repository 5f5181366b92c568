// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer render controller.
//!
//! A [`LayerRenderer`] sits between one [`Layer`](crate::layer::Layer) and the
//! container store. On every frame it checks whether the layer changed, polls
//! retained nodes that finished building, and rerenders when the change is
//! due or the compositor forces it:
//!
//! 1. query the layer for the primitives visible in the viewport,
//! 2. detach and discard nodes whose primitive is gone,
//! 3. repaint every raster primitive onto the layer's raster surface,
//! 4. start building nodes for new retained primitives,
//! 5. attach the raster surface if anything was drawn, detach it otherwise.
//!
//! The hit-test registry is rebuilt whenever the set of live nodes changes,
//! so a registered primitive always has a node in some container.
//!
//! Nodes that finish while a change is outstanding are parked rather than
//! attached: their primitive may already be gone. The next rerender attaches
//! the parked nodes it still wants and discards the rest.

use alloc::boxed::Box;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use kurbo::Point;

use crate::container::{ContainerId, ContainerStore, Placement, StackOrder};
use crate::error::LayerError;
use crate::feature::FeatureId;
use crate::geometry::{Viewport, pixel_rect_to_world, pixel_to_world};
use crate::input::EventMask;
use crate::layer::{LayerHandle, LayerKey, LayerRender};
use crate::primitive::{Primitive, RenderPrimitive, SurfaceKind};
use crate::surface::{NodeKey, NodeKeys, NodePoll, PendingNode, RasterSurface, Surfaces};
use crate::time::{Duration, HostTime};

const RASTER_TIER: u8 = 0;
const RETAINED_TIER: u8 = 1;

/// Everything a renderer needs from the compositor for one frame.
pub(crate) struct RenderContext<'a> {
    pub(crate) store: &'a mut ContainerStore,
    pub(crate) surfaces: &'a mut dyn Surfaces,
    pub(crate) keys: &'a mut NodeKeys,
    pub(crate) viewport: Viewport,
    pub(crate) now: HostTime,
    /// Rerender regardless of the layer's own state.
    pub(crate) force: bool,
    pub(crate) quiet: Duration,
}

/// Counters of one rerender.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct RenderStats {
    pub(crate) primitives: u32,
    pub(crate) nodes_built: u32,
    pub(crate) nodes_removed: u32,
}

#[derive(Debug)]
pub(crate) enum RenderOutcome {
    Idle,
    Rendered(RenderStats),
    Failed(LayerError),
}

struct RasterSlot {
    key: NodeKey,
    surface: Box<dyn RasterSurface>,
    attached: bool,
}

enum RetainedNode {
    Building {
        key: NodeKey,
        pending: PendingNode,
        placement: Placement,
    },
    Attached {
        key: NodeKey,
    },
    /// Built, but held back until a rerender confirms the primitive.
    Parked {
        key: NodeKey,
        placement: Placement,
    },
    /// Construction failed; the primitive stays without a node.
    Failed,
}

struct HitEntry {
    primitive: Primitive,
    feature: FeatureId,
    interest: EventMask,
}

pub(crate) struct LayerRenderer {
    key: LayerKey,
    layer: LayerHandle,
    z: u32,
    raster: Option<RasterSlot>,
    retained: HashMap<Primitive, RetainedNode>,
    frame: Vec<LayerRender>,
    render_resolution: f64,
    registry: Vec<HitEntry>,
    seen_revision: Option<u64>,
    seen_displayed: bool,
    update_needed: bool,
    last_change: HostTime,
}

impl core::fmt::Debug for LayerRenderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayerRenderer")
            .field("key", &self.key)
            .field("z", &self.z)
            .field("primitives", &self.frame.len())
            .field("retained", &self.retained.len())
            .field("update_needed", &self.update_needed)
            .finish_non_exhaustive()
    }
}

impl LayerRenderer {
    pub(crate) fn new(key: LayerKey, layer: LayerHandle, z: u32) -> Self {
        Self {
            key,
            layer,
            z,
            raster: None,
            retained: HashMap::new(),
            frame: Vec::new(),
            render_resolution: 1.0,
            registry: Vec::new(),
            seen_revision: None,
            seen_displayed: true,
            update_needed: true,
            last_change: HostTime(0),
        }
    }

    pub(crate) fn key(&self) -> LayerKey {
        self.key
    }

    pub(crate) fn layer(&self) -> &LayerHandle {
        &self.layer
    }

    pub(crate) fn update(&mut self, cx: &mut RenderContext<'_>) -> RenderOutcome {
        let (revision, displayed, delayed) = {
            let layer = self.layer.borrow();
            (layer.revision(), layer.is_displayed(), layer.delayed_update())
        };
        if self.seen_revision != Some(revision) || self.seen_displayed != displayed {
            self.seen_revision = Some(revision);
            self.seen_displayed = displayed;
            self.update_needed = true;
            self.last_change = cx.now;
        }
        self.poll_pending(cx.store, cx.surfaces, !(self.update_needed || cx.force));

        let due = self.update_needed
            && (!delayed || cx.now.saturating_duration_since(self.last_change) >= cx.quiet);
        if !(cx.force || due) {
            return RenderOutcome::Idle;
        }
        self.rerender(cx, displayed)
    }

    fn rerender(&mut self, cx: &mut RenderContext<'_>, displayed: bool) -> RenderOutcome {
        self.update_needed = false;
        let viewport = cx.viewport;
        let bbox = viewport.bbox();
        let resolution = viewport.resolution;

        let (renders, transition) = {
            let layer = self.layer.borrow();
            let renders = if displayed {
                match layer.renders(bbox, resolution) {
                    Ok(renders) => renders,
                    Err(err) => {
                        log::warn!("layer {:?} failed to render: {err}", self.key);
                        return RenderOutcome::Failed(err);
                    }
                }
            } else {
                Vec::new()
            };
            (renders, layer.transition_time())
        };

        let mut stats = RenderStats {
            primitives: count(renders.len()),
            ..RenderStats::default()
        };

        // Drop nodes whose primitive is gone.
        let live: HashSet<&Primitive> = renders
            .iter()
            .filter(|r| r.primitive.surface_kind() == SurfaceKind::Retained)
            .map(|r| &r.primitive)
            .collect();
        let stale: Vec<Primitive> = self
            .retained
            .keys()
            .filter(|p| !live.contains(p))
            .cloned()
            .collect();
        for primitive in stale {
            if let Some(node) = self.retained.remove(&primitive) {
                if release(node, cx.store, cx.surfaces) {
                    stats.nodes_removed += 1;
                }
            }
        }
        let order = self.retained_order();
        for node in self.retained.values_mut() {
            settle(node, cx.store, cx.surfaces, order, true);
        }

        // Repaint the raster surface from scratch.
        let has_raster = renders
            .iter()
            .any(|r| r.primitive.surface_kind() == SurfaceKind::Raster);
        if has_raster || self.raster.is_some() {
            let slot = self.raster.get_or_insert_with(|| {
                let key = cx.keys.next_key();
                RasterSlot {
                    key,
                    surface: cx.surfaces.create_raster(key),
                    attached: false,
                }
            });
            slot.surface.reset(bbox, resolution, viewport.size);
            for r in &renders {
                if r.primitive.surface_kind() == SurfaceKind::Raster {
                    slot.surface.draw(&r.primitive);
                }
            }
            let order = StackOrder {
                layer: self.z,
                tier: RASTER_TIER,
            };
            match cx.store.latest() {
                Some(latest) if !slot.surface.is_empty() => {
                    cx.store.add_node(latest, slot.key, bbox, order);
                    slot.attached = true;
                }
                _ => {
                    if slot.attached {
                        cx.store.remove_node(slot.key);
                        slot.attached = false;
                    }
                }
            }
        }

        // Start building nodes for new retained primitives.
        for r in &renders {
            if r.primitive.surface_kind() != SurfaceKind::Retained
                || self.retained.contains_key(&r.primitive)
            {
                continue;
            }
            let key = cx.keys.next_key();
            let placement = placement_of(&r.primitive, resolution);
            let pending = cx.surfaces.build_node(key, &r.primitive, transition);
            stats.nodes_built += 1;
            let mut node = RetainedNode::Building {
                key,
                pending,
                placement,
            };
            settle(&mut node, cx.store, cx.surfaces, order, true);
            self.retained.insert(r.primitive.clone(), node);
        }

        self.frame = renders;
        self.render_resolution = resolution;
        self.rebuild_registry();
        RenderOutcome::Rendered(stats)
    }

    /// Settles nodes that finished building. Ready nodes are attached only
    /// when `attach` is set and parked otherwise.
    fn poll_pending(
        &mut self,
        store: &mut ContainerStore,
        surfaces: &mut dyn Surfaces,
        attach: bool,
    ) {
        let order = self.retained_order();
        let mut changed = false;
        for node in self.retained.values_mut() {
            changed |= settle(node, store, surfaces, order, attach);
        }
        if changed {
            self.rebuild_registry();
        }
    }

    fn retained_order(&self) -> StackOrder {
        StackOrder {
            layer: self.z,
            tier: RETAINED_TIER,
        }
    }

    fn rebuild_registry(&mut self) {
        self.registry.clear();
        let raster_live = self.raster.as_ref().is_some_and(|slot| slot.attached);
        for r in &self.frame {
            if r.interest.is_empty() {
                continue;
            }
            let live = match r.primitive.surface_kind() {
                SurfaceKind::Raster => raster_live,
                SurfaceKind::Retained => matches!(
                    self.retained.get(&r.primitive),
                    Some(RetainedNode::Attached { .. })
                ),
            };
            if live {
                self.registry.push(HitEntry {
                    primitive: r.primitive.clone(),
                    feature: r.feature,
                    interest: r.interest,
                });
            }
        }
    }

    /// Topmost registered feature interested in `mask` under the world point.
    pub(crate) fn hit_test(
        &self,
        world: Point,
        view_res: f64,
        tolerance: f64,
        mask: EventMask,
    ) -> Option<FeatureId> {
        self.registry
            .iter()
            .rev()
            .filter(|e| e.interest.intersects(mask))
            .find(|e| {
                e.primitive
                    .hit_test(world, self.render_resolution, view_res, tolerance)
            })
            .map(|e| e.feature)
    }

    /// Keys of every node this layer has in a container.
    fn attached_keys(&self) -> impl Iterator<Item = (NodeKey, u8)> + '_ {
        let raster = self
            .raster
            .as_ref()
            .filter(|slot| slot.attached)
            .map(|slot| (slot.key, RASTER_TIER));
        let retained = self.retained.values().filter_map(|node| match node {
            RetainedNode::Attached { key } => Some((*key, RETAINED_TIER)),
            RetainedNode::Building { .. } | RetainedNode::Parked { .. } | RetainedNode::Failed => {
                None
            }
        });
        raster.into_iter().chain(retained)
    }

    /// Changes the layer's stacking position and reorders its nodes.
    pub(crate) fn restack(&mut self, z: u32, store: &mut ContainerStore) {
        if self.z == z {
            return;
        }
        self.z = z;
        for (key, tier) in self.attached_keys().collect::<Vec<_>>() {
            store.set_order(key, StackOrder { layer: z, tier });
        }
    }

    /// Lowest and highest creation position of the containers holding this
    /// layer's nodes.
    pub(crate) fn containers_span(&self, store: &ContainerStore) -> Option<(usize, usize)> {
        self.attached_keys()
            .filter_map(|(key, _)| store.container_of(key))
            .map(|id| store.position(id))
            .fold(None, |span, pos| match span {
                None => Some((pos, pos)),
                Some((lo, hi)) => Some((lo.min(pos), hi.max(pos))),
            })
    }

    /// Moves every node of this layer into `target`.
    pub(crate) fn migrate_to(&self, store: &mut ContainerStore, target: ContainerId) {
        for (key, _) in self.attached_keys().collect::<Vec<_>>() {
            store.move_node(key, target);
        }
    }

    /// Detaches and discards everything. The renderer is unusable afterwards.
    pub(crate) fn teardown(mut self, store: &mut ContainerStore, surfaces: &mut dyn Surfaces) {
        if let Some(slot) = self.raster.take() {
            if slot.attached {
                store.remove_node(slot.key);
            }
            surfaces.discard_node(slot.key);
        }
        for (_, node) in self.retained.drain() {
            release(node, store, surfaces);
        }
        self.registry.clear();
    }
}

/// Polls a building node, then attaches or parks it, or forgets it on
/// failure. A parked node is attached once `attach` is set. Returns whether
/// the node was attached or dropped.
fn settle(
    node: &mut RetainedNode,
    store: &mut ContainerStore,
    surfaces: &mut dyn Surfaces,
    order: StackOrder,
    attach: bool,
) -> bool {
    let (key, placement) = match node {
        RetainedNode::Building {
            key,
            pending,
            placement,
        } => match pending.poll_node() {
            NodePoll::Pending => return false,
            NodePoll::Ready => (*key, *placement),
            NodePoll::Failed(err) => {
                log::debug!("dropping node {key:?}: {err}");
                surfaces.discard_node(*key);
                *node = RetainedNode::Failed;
                return true;
            }
        },
        RetainedNode::Parked { key, placement } => (*key, *placement),
        RetainedNode::Attached { .. } | RetainedNode::Failed => return false,
    };
    let latest = store.latest().filter(|_| attach);
    let Some(latest) = latest else {
        *node = RetainedNode::Parked { key, placement };
        return false;
    };
    match placement {
        Placement::Scaled { bbox } => store.add_node(latest, key, bbox, order),
        Placement::FixedSize { anchor, size } => {
            store.add_fixed_size_node(latest, key, anchor, size, order);
        }
    }
    *node = RetainedNode::Attached { key };
    true
}

/// Detaches and discards a node. Returns whether there was one.
fn release(node: RetainedNode, store: &mut ContainerStore, surfaces: &mut dyn Surfaces) -> bool {
    match node {
        RetainedNode::Building { key, pending, .. } => {
            drop(pending);
            surfaces.discard_node(key);
            true
        }
        RetainedNode::Parked { key, .. } => {
            surfaces.discard_node(key);
            true
        }
        RetainedNode::Attached { key } => {
            store.remove_node(key);
            surfaces.discard_node(key);
            true
        }
        RetainedNode::Failed => false,
    }
}

fn placement_of(primitive: &RenderPrimitive, resolution: f64) -> Placement {
    let rect = primitive.bounds();
    if primitive.is_fixed_size() {
        Placement::FixedSize {
            anchor: pixel_to_world(rect.origin(), resolution),
            size: rect.size(),
        }
    } else {
        Placement::Scaled {
            bbox: pixel_rect_to_world(rect, resolution),
        }
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

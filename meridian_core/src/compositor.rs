// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame driver.
//!
//! [`Compositor`] owns the viewport, the layer renderers (bottom to top) and
//! the [`ContainerStore`]. The host calls [`tick`](Compositor::tick) once per
//! animation frame. A tick runs three phases:
//!
//! 1. **Viewport**: create a new container when the latest one's resolution
//!    drifted too far from the viewport's, and re-base every container's
//!    screen transform when the viewport moved.
//! 2. **Render**: update each layer renderer, bottom layer first, so upper
//!    layers attach their nodes last.
//! 3. **Overlay**: repair stacking across containers, then destroy containers
//!    that went empty (never the latest one).
//!
//! Between ticks the host drains the store with
//! [`evaluate`](Compositor::evaluate) and applies the changes.

use alloc::rc::Rc;
use alloc::vec::Vec;

use kurbo::{Point, Size, TranslateScale, Vec2};

use crate::config::CompositorConfig;
use crate::container::{ContainerChanges, ContainerId, ContainerStore};
use crate::error::SetupError;
use crate::geometry::{Viewport, nearest_resolution, screen_transform};
use crate::input::{EventMask, EventTarget};
use crate::layer::{LayerHandle, LayerKey};
use crate::renderer::{LayerRenderer, RenderContext, RenderOutcome};
use crate::surface::{NodeKeys, Surfaces};
use crate::time::FrameTick;
use crate::trace::{
    ContainerEvent, FrameSummary, FrameTickEvent, LayerFailedEvent, LayerRenderEvent,
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, Tracer,
};

/// What a [`Compositor::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The host surface has no area; nothing ran.
    NotDisplayed,
    /// Updates are forbidden; nothing ran.
    Frozen,
    /// The frame ran.
    Painted(FrameSummary),
}

/// Owns layers, containers and the viewport.
#[derive(Debug)]
pub struct Compositor {
    config: CompositorConfig,
    store: ContainerStore,
    keys: NodeKeys,
    renderers: Vec<LayerRenderer>,
    retired: Vec<LayerRenderer>,
    next_layer: u32,
    center: Point,
    resolution: f64,
    size: Size,
    /// Viewport the containers were last re-based onto.
    painted: Option<Viewport>,
    forbid_depth: u32,
    redraw: bool,
}

impl Compositor {
    /// Creates a compositor centered on the origin at resolution 1.
    #[must_use]
    pub fn new(config: CompositorConfig) -> Self {
        Self {
            config,
            store: ContainerStore::new(),
            keys: NodeKeys::default(),
            renderers: Vec::new(),
            retired: Vec::new(),
            next_layer: 0,
            center: Point::ORIGIN,
            resolution: 1.0,
            size: Size::ZERO,
            painted: None,
            forbid_depth: 0,
            redraw: false,
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    // -- Layers --

    /// Adds a layer on top of the existing ones.
    pub fn add_layer(&mut self, layer: LayerHandle) -> Result<LayerKey, SetupError> {
        self.insert_layer(self.renderers.len(), layer)
    }

    /// Adds a layer at stacking position `index` (0 is the bottom), clamped to
    /// the number of layers.
    pub fn insert_layer(
        &mut self,
        index: usize,
        layer: LayerHandle,
    ) -> Result<LayerKey, SetupError> {
        if self.renderers.iter().any(|r| Rc::ptr_eq(r.layer(), &layer)) {
            return Err(SetupError::DuplicateLayer);
        }
        let key = LayerKey(self.next_layer);
        self.next_layer += 1;
        let index = index.min(self.renderers.len());
        self.renderers
            .insert(index, LayerRenderer::new(key, layer, z_of(index)));
        self.restack();
        Ok(key)
    }

    /// Removes a layer. Its nodes are detached and discarded on the next
    /// tick that is allowed to update.
    pub fn remove_layer(&mut self, key: LayerKey) -> Result<LayerHandle, SetupError> {
        let index = self.index_of(key)?;
        let renderer = self.renderers.remove(index);
        let layer = renderer.layer().clone();
        self.retired.push(renderer);
        self.restack();
        Ok(layer)
    }

    /// Moves a layer to stacking position `index`, clamped to the top.
    pub fn move_layer(&mut self, key: LayerKey, index: usize) -> Result<(), SetupError> {
        let from = self.index_of(key)?;
        let renderer = self.renderers.remove(from);
        let to = index.min(self.renderers.len());
        self.renderers.insert(to, renderer);
        self.restack();
        Ok(())
    }

    /// Layer keys, bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = LayerKey> + '_ {
        self.renderers.iter().map(LayerRenderer::key)
    }

    /// The layer behind `key`.
    #[must_use]
    pub fn layer(&self, key: LayerKey) -> Option<&LayerHandle> {
        self.renderers
            .iter()
            .find(|r| r.key() == key)
            .map(LayerRenderer::layer)
    }

    fn index_of(&self, key: LayerKey) -> Result<usize, SetupError> {
        self.renderers
            .iter()
            .position(|r| r.key() == key)
            .ok_or(SetupError::UnknownLayer(key))
    }

    fn restack(&mut self) {
        for (index, renderer) in self.renderers.iter_mut().enumerate() {
            renderer.restack(z_of(index), &mut self.store);
        }
    }

    // -- Viewport --

    /// The viewport as of the latest host size.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.center, self.resolution, self.size)
    }

    /// World point at the center of the map.
    #[must_use]
    pub fn center(&self) -> Point {
        self.center
    }

    /// World units per screen pixel.
    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Sets the host surface size used between ticks (for hit testing).
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    /// Recenters the map.
    pub fn set_center(&mut self, center: Point) {
        self.center = center;
    }

    /// Changes the resolution, keeping the center.
    pub fn set_resolution(&mut self, resolution: f64) -> Result<(), SetupError> {
        check_resolution(resolution)?;
        self.resolution = resolution;
        Ok(())
    }

    /// Moves the map content by a screen delta.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.center.x -= delta.x * self.resolution;
        self.center.y += delta.y * self.resolution;
    }

    /// Scales the view by `factor` (2 shows everything twice as large) so
    /// that the world point under the screen point `anchor` stays there.
    ///
    /// Non-positive or non-finite factors are ignored.
    pub fn zoom_at(&mut self, factor: f64, anchor: Point) {
        if factor.is_finite() && factor > 0.0 {
            self.zoom_to(self.resolution / factor, anchor);
        }
    }

    /// Changes the resolution so that the world point under the screen point
    /// `anchor` stays there. Invalid resolutions are ignored.
    pub fn zoom_to(&mut self, resolution: f64, anchor: Point) {
        if check_resolution(resolution).is_err() {
            return;
        }
        let world = self.viewport().screen_to_world(anchor);
        let from_center = anchor - Point::new(self.size.width / 2.0, self.size.height / 2.0);
        self.center = Point::new(
            world.x - from_center.x * resolution,
            world.y + from_center.y * resolution,
        );
        self.resolution = resolution;
    }

    /// Moves the resolution to the nearest entry of `ladder`, zooming around
    /// the screen point `anchor`.
    pub fn snap_resolution(&mut self, ladder: &[f64], anchor: Point) {
        let target = nearest_resolution(self.resolution, ladder);
        if target != self.resolution {
            self.zoom_to(target, anchor);
        }
    }

    // -- Update control --

    /// Freezes the visuals. Nested calls need as many
    /// [`allow_update`](Self::allow_update)s.
    pub fn forbid_update(&mut self) {
        self.forbid_depth += 1;
    }

    /// Undoes one [`forbid_update`](Self::forbid_update). Extra calls are
    /// ignored.
    pub fn allow_update(&mut self) {
        self.forbid_depth = self.forbid_depth.saturating_sub(1);
    }

    /// Whether ticks currently run.
    #[must_use]
    pub fn is_update_allowed(&self) -> bool {
        self.forbid_depth == 0
    }

    /// Forces every layer to rerender on the next tick.
    pub fn redraw(&mut self) {
        self.redraw = true;
    }

    /// Transform from the last painted screen space to the current one.
    ///
    /// Identity while the visuals are in sync with the viewport. While
    /// updates are forbidden, hosts apply it to the whole map to preview
    /// viewport changes without repainting.
    #[must_use]
    pub fn preview_transform(&self) -> TranslateScale {
        let Some(painted) = self.painted else {
            return TranslateScale::default();
        };
        let current = self.viewport();
        screen_transform(
            painted.bbox(),
            painted.resolution,
            current.bbox(),
            current.resolution,
            self.config.snapping,
        )
    }

    // -- Frame --

    /// Runs one frame.
    pub fn tick(
        &mut self,
        tick: &FrameTick,
        size: Size,
        surfaces: &mut dyn Surfaces,
        tracer: &mut Tracer<'_>,
    ) -> FrameOutcome {
        self.size = size;
        let viewport = self.viewport();
        if !viewport.is_displayed() {
            return FrameOutcome::NotDisplayed;
        }
        if !self.is_update_allowed() {
            return FrameOutcome::Frozen;
        }
        for renderer in self.retired.drain(..) {
            renderer.teardown(&mut self.store, surfaces);
        }

        let frame_index = tick.frame_index;
        tracer.frame_tick(&FrameTickEvent::new(
            tick,
            viewport.center,
            viewport.resolution,
            viewport.size,
        ));
        let mut summary = FrameSummary {
            frame_index,
            now: tick.now,
            ..FrameSummary::default()
        };
        let mut collect = Vec::new();

        // Viewport
        phase_begin(tracer, tick, PhaseKind::Viewport);
        let drift = self
            .store
            .latest()
            .map(|id| (self.store.resolution(id) / viewport.resolution - 1.0).abs());
        if drift.is_none_or(|d| d > self.config.scale_drift) {
            let previous = self.store.latest();
            let bbox = viewport.bbox();
            let id = self.store.create(bbox, viewport.resolution);
            summary.containers_created += 1;
            tracer.container_created(&ContainerEvent {
                frame_index,
                container: id,
                bbox,
                resolution: viewport.resolution,
            });
            // The viewport must be re-based onto the new container.
            self.painted = None;
            collect.extend(previous);
        }
        let moved = self
            .painted
            .is_none_or(|p| !p.approx_eq(&viewport, self.config.viewport_epsilon));
        if moved {
            let ids: Vec<ContainerId> = self.store.ids().collect();
            for id in ids {
                self.store.update_transform(
                    id,
                    viewport.bbox(),
                    viewport.resolution,
                    self.config.snapping,
                );
            }
            self.painted = Some(viewport);
        }
        phase_end(tracer, tick, PhaseKind::Viewport);

        // Render
        phase_begin(tracer, tick, PhaseKind::Render);
        let mut cx = RenderContext {
            store: &mut self.store,
            surfaces,
            keys: &mut self.keys,
            viewport,
            now: tick.now,
            force: moved || self.redraw,
            quiet: self.config.delayed_update_quiet,
        };
        for renderer in &mut self.renderers {
            match renderer.update(&mut cx) {
                RenderOutcome::Idle => {}
                RenderOutcome::Rendered(stats) => {
                    summary.layers_rendered += 1;
                    tracer.layer_rendered(&LayerRenderEvent {
                        frame_index,
                        layer: renderer.key(),
                        primitives: stats.primitives,
                        nodes_built: stats.nodes_built,
                        nodes_removed: stats.nodes_removed,
                    });
                }
                RenderOutcome::Failed(error) => {
                    summary.layers_failed += 1;
                    tracer.layer_failed(&LayerFailedEvent {
                        frame_index,
                        layer: renderer.key(),
                        error: &error,
                    });
                }
            }
        }
        self.redraw = false;
        phase_end(tracer, tick, PhaseKind::Render);

        // Overlay
        phase_begin(tracer, tick, PhaseKind::Overlay);
        summary.layers_migrated = self.resolve_layer_overlay();
        collect.extend(self.store.take_emptied());
        let latest = self.store.latest();
        for id in collect {
            let collectable = Some(id) != latest
                && self.store.is_alive(id)
                && self.store.children(id).is_empty();
            if !collectable {
                continue;
            }
            let event = ContainerEvent {
                frame_index,
                container: id,
                bbox: self.store.bbox(id),
                resolution: self.store.resolution(id),
            };
            self.store.destroy(id);
            summary.containers_destroyed += 1;
            tracer.container_destroyed(&event);
        }
        phase_end(tracer, tick, PhaseKind::Overlay);

        summary.containers = u32::try_from(self.store.len()).unwrap_or(u32::MAX);
        tracer.frame_summary(&summary);
        FrameOutcome::Painted(summary)
    }

    /// Moves layers whose nodes sit below a lower layer's nodes into the
    /// latest container, so container order never contradicts layer order.
    ///
    /// Returns how many layers moved.
    fn resolve_layer_overlay(&mut self) -> u32 {
        let Some(latest) = self.store.latest() else {
            return 0;
        };
        let top = self.store.position(latest);
        let mut reached = 0;
        let mut migrated = 0;
        for renderer in &self.renderers {
            let Some((lowest, highest)) = renderer.containers_span(&self.store) else {
                continue;
            };
            if lowest < reached {
                renderer.migrate_to(&mut self.store, latest);
                migrated += 1;
                reached = top;
            } else {
                reached = highest;
            }
        }
        migrated
    }

    // -- Queries --

    /// Resolves the screen point `position` to the topmost feature interested
    /// in any of `mask`, or the map background.
    #[must_use]
    pub fn hit_test(&self, position: Point, mask: EventMask) -> EventTarget {
        let viewport = self.viewport();
        let world = viewport.screen_to_world(position);
        self.renderers
            .iter()
            .rev()
            .find_map(|r| {
                r.hit_test(world, viewport.resolution, self.config.hit_tolerance, mask)
                    .map(|feature| EventTarget::Feature {
                        layer: r.key(),
                        feature,
                    })
            })
            .unwrap_or(EventTarget::Map)
    }

    /// The container store, for presenters.
    #[must_use]
    pub fn containers(&self) -> &ContainerStore {
        &self.store
    }

    /// Drains the container changes since the last call.
    pub fn evaluate(&mut self) -> ContainerChanges {
        self.store.evaluate()
    }

    /// Like [`evaluate`](Self::evaluate) into a reused buffer.
    pub fn evaluate_into(&mut self, changes: &mut ContainerChanges) {
        self.store.evaluate_into(changes);
    }
}

fn z_of(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

fn check_resolution(resolution: f64) -> Result<(), SetupError> {
    if resolution.is_finite() && resolution > 0.0 {
        Ok(())
    } else {
        Err(SetupError::InvalidResolution(resolution))
    }
}

fn phase_begin(tracer: &mut Tracer<'_>, tick: &FrameTick, phase: PhaseKind) {
    let timestamp = tracer.now_or(tick.now);
    tracer.phase_begin(&PhaseBeginEvent {
        frame_index: tick.frame_index,
        phase,
        timestamp,
    });
}

fn phase_end(tracer: &mut Tracer<'_>, tick: &FrameTick, phase: PhaseKind) {
    let timestamp = tracer.now_or(tick.now);
    tracer.phase_end(&PhaseEndEvent {
        frame_index: tick.frame_index,
        phase,
        timestamp,
    });
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The map facade.
//!
//! [`Map`] bundles a [`Compositor`], an [`EventHub`] and a [`Dispatcher`]
//! behind one object. Hosts drive it with [`tick`](Map::tick) once per
//! animation frame and [`handle_input`](Map::handle_input) for every input
//! event; controls register handlers with [`on`](Map::on) and friends.

use alloc::vec::Vec;

use kurbo::{Point, Size, Vec2};

use crate::compositor::{Compositor, FrameOutcome};
use crate::config::MapConfig;
use crate::container::ContainerChanges;
use crate::error::SetupError;
use crate::feature::FeatureId;
use crate::input::{
    DispatchContext, Dispatcher, EventHub, EventMask, EventTarget, HandlerId, InputEvent, MapEvent,
    Scope,
};
use crate::layer::{LayerHandle, LayerKey};
use crate::surface::Surfaces;
use crate::time::FrameTick;
use crate::trace::Tracer;

/// An interactive map.
#[derive(Debug)]
pub struct Map {
    compositor: Compositor,
    hub: EventHub,
    dispatcher: Dispatcher,
    resolutions: Vec<f64>,
}

impl Map {
    /// Creates a map.
    ///
    /// Fails if the resolution ladder contains a non-positive or non-finite
    /// entry. With a ladder, the map starts at its coarsest resolution.
    pub fn new(config: MapConfig) -> Result<Self, SetupError> {
        if let Some(&bad) = config
            .resolutions
            .iter()
            .find(|r| !(r.is_finite() && **r > 0.0))
        {
            return Err(SetupError::InvalidResolution(bad));
        }
        let mut compositor = Compositor::new(config.compositor);
        if let Some(coarsest) = config.resolutions.iter().copied().reduce(f64::max) {
            compositor.set_resolution(coarsest)?;
        }
        Ok(Self {
            compositor,
            hub: EventHub::new(),
            dispatcher: Dispatcher::new(config.input),
            resolutions: config.resolutions,
        })
    }

    /// The compositor.
    #[must_use]
    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// The compositor, mutably.
    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    /// The input dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The allowed resolutions.
    #[must_use]
    pub fn resolutions(&self) -> &[f64] {
        &self.resolutions
    }

    // -- Handlers --

    /// Listens for `kinds` on every target.
    pub fn on(
        &mut self,
        kinds: EventMask,
        handler: impl FnMut(&mut MapEvent) + 'static,
    ) -> HandlerId {
        self.hub.on(Scope::Map, kinds, handler)
    }

    /// Listens for `kinds` on one layer and its features.
    pub fn on_layer(
        &mut self,
        layer: LayerKey,
        kinds: EventMask,
        handler: impl FnMut(&mut MapEvent) + 'static,
    ) -> HandlerId {
        self.hub.on(Scope::Layer(layer), kinds, handler)
    }

    /// Listens for `kinds` on one feature.
    pub fn on_feature(
        &mut self,
        layer: LayerKey,
        feature: FeatureId,
        kinds: EventMask,
        handler: impl FnMut(&mut MapEvent) + 'static,
    ) -> HandlerId {
        self.hub.on(Scope::Feature(layer, feature), kinds, handler)
    }

    /// Removes a handler. Returns `false` if it was already gone.
    pub fn off(&mut self, id: HandlerId) -> bool {
        self.hub.off(id)
    }

    // -- Layers --

    /// Adds a layer on top.
    pub fn add_layer(&mut self, layer: LayerHandle) -> Result<LayerKey, SetupError> {
        self.compositor.add_layer(layer)
    }

    /// Adds a layer at stacking position `index`.
    pub fn insert_layer(
        &mut self,
        index: usize,
        layer: LayerHandle,
    ) -> Result<LayerKey, SetupError> {
        self.compositor.insert_layer(index, layer)
    }

    /// Removes a layer and every handler registered on it.
    pub fn remove_layer(&mut self, key: LayerKey) -> Result<LayerHandle, SetupError> {
        let layer = self.compositor.remove_layer(key)?;
        self.hub.clear_scope(Scope::Layer(key));
        Ok(layer)
    }

    /// Moves a layer to stacking position `index`.
    pub fn move_layer(&mut self, key: LayerKey, index: usize) -> Result<(), SetupError> {
        self.compositor.move_layer(key, index)
    }

    // -- Viewport --

    /// World point at the center of the map.
    #[must_use]
    pub fn center(&self) -> Point {
        self.compositor.center()
    }

    /// World units per screen pixel.
    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.compositor.resolution()
    }

    /// Recenters the map.
    pub fn set_center(&mut self, center: Point) {
        self.compositor.set_center(center);
    }

    /// Changes the resolution.
    pub fn set_resolution(&mut self, resolution: f64) -> Result<(), SetupError> {
        self.compositor.set_resolution(resolution)
    }

    /// Moves the content by a screen delta.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.compositor.pan_by(delta);
    }

    /// Zooms by `factor` around a screen point.
    pub fn zoom_at(&mut self, factor: f64, anchor: Point) {
        self.compositor.zoom_at(factor, anchor);
    }

    /// Snaps the resolution to the nearest allowed one, around the center.
    pub fn snap(&mut self) {
        let size = self.compositor.viewport().size;
        let middle = Point::new(size.width / 2.0, size.height / 2.0);
        self.compositor.snap_resolution(&self.resolutions, middle);
    }

    /// Hit-tests a screen point.
    #[must_use]
    pub fn target_at(&self, position: Point, kinds: EventMask) -> EventTarget {
        self.compositor.hit_test(position, kinds)
    }

    // -- Host entry points --

    /// Runs one frame. See [`Compositor::tick`].
    pub fn tick(
        &mut self,
        tick: &FrameTick,
        size: Size,
        surfaces: &mut dyn Surfaces,
        tracer: &mut Tracer<'_>,
    ) -> FrameOutcome {
        self.compositor.tick(tick, size, surfaces, tracer)
    }

    /// Processes one host input event.
    pub fn handle_input(&mut self, input: &InputEvent) {
        let mut cx = DispatchContext {
            compositor: &mut self.compositor,
            hub: &mut self.hub,
            resolutions: &self.resolutions,
        };
        self.dispatcher.handle(input, &mut cx);
    }

    /// Drains the container changes since the last call.
    pub fn evaluate(&mut self) -> ContainerChanges {
        self.compositor.evaluate()
    }

    /// Like [`evaluate`](Self::evaluate) into a reused buffer.
    pub fn evaluate_into(&mut self, changes: &mut ContainerChanges) {
        self.compositor.evaluate_into(changes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Crs, Feature, Geometry, PointSymbol};
    use crate::input::{EventKind, Modifiers, MouseButton, MouseInput, MousePhase};
    use crate::layer::FeatureLayer;
    use crate::primitive::{Color, RenderPrimitive, Style};
    use crate::testing::TestSurfaces;
    use crate::time::HostTime;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    fn press(phase: MousePhase, x: f64, y: f64) -> InputEvent {
        InputEvent::Mouse(MouseInput {
            phase,
            button: Some(MouseButton::Left),
            position: Point::new(x, y),
            mods: Modifiers::empty(),
            time: HostTime(0),
        })
    }

    #[test]
    fn point_feature_renders_and_receives_clicks() {
        let symbol = PointSymbol {
            size: 10.0,
            style: Style {
                stroke: None,
                fill: Some(Color::BLACK),
            },
        };
        let feature = Feature::new(
            FeatureId(1),
            Geometry::Point(Point::new(10.0, 10.0)),
            Rc::new(symbol),
            Crs::PLAIN,
        )
        .with_interest(EventMask::CLICK);

        let primitives = feature.render(1.0, Crs::PLAIN);
        let RenderPrimitive::Arc { center, radius, .. } = &primitives[0] else {
            panic!("expected an arc");
        };
        assert_eq!(*center, Point::new(10.0, -10.0));
        assert_eq!(*radius, 5.0);

        let mut layer = FeatureLayer::new(Crs::PLAIN);
        layer.add(feature).unwrap();
        let mut map = Map::new(MapConfig::default()).unwrap();
        let key = map.add_layer(Rc::new(RefCell::new(layer))).unwrap();
        map.tick(
            &FrameTick::new(HostTime(0), 0),
            Size::new(256.0, 256.0),
            &mut TestSurfaces::default(),
            &mut Tracer::none(),
        );

        let feature_clicks = Rc::new(Cell::new(0));
        let background_clicks = Rc::new(Cell::new(0));
        let counter = feature_clicks.clone();
        map.on_feature(key, FeatureId(1), EventMask::CLICK, move |e| {
            assert_eq!(e.kind(), EventKind::Click);
            assert!((e.point() - Point::new(10.0, 10.0)).hypot() < 1e-9);
            counter.set(counter.get() + 1);
        });
        let counter = background_clicks.clone();
        map.on(EventMask::CLICK, move |e| {
            if e.target() == EventTarget::Map {
                counter.set(counter.get() + 1);
            }
        });

        // Screen (138, 118) is pixel (10, -10) at this viewport.
        map.handle_input(&press(MousePhase::Down, 138.0, 118.0));
        map.handle_input(&press(MousePhase::Up, 138.0, 118.0));
        assert_eq!(feature_clicks.get(), 1);
        assert_eq!(background_clicks.get(), 0);
    }

    #[test]
    fn ladder_is_validated_and_sets_the_start_resolution() {
        let config = MapConfig {
            resolutions: vec![1.0, 8.0, 2.0],
            ..MapConfig::default()
        };
        assert_eq!(Map::new(config).unwrap().resolution(), 8.0);

        let config = MapConfig {
            resolutions: vec![1.0, -2.0],
            ..MapConfig::default()
        };
        assert!(matches!(
            Map::new(config),
            Err(SetupError::InvalidResolution(r)) if r == -2.0
        ));
    }

    #[test]
    fn removing_a_layer_drops_its_handlers() {
        let mut map = Map::new(MapConfig::default()).unwrap();
        let key = map
            .add_layer(Rc::new(RefCell::new(FeatureLayer::new(Crs::PLAIN))))
            .unwrap();
        let id = map.on_layer(key, EventMask::CLICK, |_| {});
        map.remove_layer(key).unwrap();
        assert!(!map.off(id));
    }

    #[test]
    fn snap_rounds_to_the_ladder() {
        let mut map = Map::new(MapConfig {
            resolutions: vec![4.0, 2.0, 1.0],
            ..MapConfig::default()
        })
        .unwrap();
        map.set_resolution(1.3).unwrap();
        map.snap();
        assert_eq!(map.resolution(), 1.0);
    }
}

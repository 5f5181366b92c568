// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Turns host input into map events.
//!
//! The dispatcher owns the gesture state machine. For each [`InputEvent`] it
//! hit-tests through the [`Compositor`], dispatches the resulting
//! [`MapEvent`]s through the [`EventHub`], and runs the map's default action
//! (pan, zoom) unless a handler canceled the event.
//!
//! Inconsistent sequences (a release without a press, a move during an
//! unknown touch) are ignored.

use kurbo::{Point, Vec2};

use super::event::{
    EventKind, EventMask, EventTarget, InputEvent, MapEvent, MouseButton, MouseInput,
    MousePhase, TouchInput, TouchPhase, TouchPoint, WheelInput,
};
use super::gesture::{Gesture, PinchStep, pinch_step};
use super::hub::EventHub;
use crate::compositor::Compositor;
use crate::config::InputConfig;
use crate::geometry::step_resolution;
use crate::time::HostTime;

/// Gesture recognition and event synthesis.
#[derive(Debug, Default)]
pub struct Dispatcher {
    config: InputConfig,
    gesture: Gesture,
    hover: Option<EventTarget>,
    last_click: Option<(HostTime, Point)>,
}

/// Borrowed state the dispatcher acts on.
pub(crate) struct DispatchContext<'a> {
    pub(crate) compositor: &'a mut Compositor,
    pub(crate) hub: &'a mut EventHub,
    pub(crate) resolutions: &'a [f64],
}

impl Dispatcher {
    /// Creates an idle dispatcher.
    #[must_use]
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Whether a single-pointer drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging { .. })
    }

    /// Whether a two-finger gesture is in progress.
    #[must_use]
    pub fn is_pinching(&self) -> bool {
        matches!(self.gesture, Gesture::MultiTouch { .. })
    }

    pub(crate) fn handle(&mut self, input: &InputEvent, cx: &mut DispatchContext<'_>) {
        match input {
            InputEvent::Mouse(mouse) => self.mouse(mouse, input, cx),
            InputEvent::Wheel(wheel) => self.wheel(wheel, input, cx),
            InputEvent::Touch(touch) => self.touch(touch, input, cx),
        }
    }

    fn mouse(&mut self, mouse: &MouseInput, source: &InputEvent, cx: &mut DispatchContext<'_>) {
        let pos = mouse.position;
        match mouse.phase {
            MousePhase::Down => {
                if mouse.button.is_none_or(|b| b == MouseButton::Left) {
                    self.press(pos);
                }
            }
            MousePhase::Move => self.moved(pos, source, cx),
            MousePhase::Up => {
                if mouse.button.is_none_or(|b| b == MouseButton::Left) {
                    self.release(pos, mouse.time, source, cx);
                }
            }
            MousePhase::Leave => {
                if let Gesture::Dragging { .. } = self.gesture {
                    self.release(pos, mouse.time, source, cx);
                }
                self.gesture = Gesture::Idle;
                let target = self.hover.take().unwrap_or(EventTarget::Map);
                self.emit(EventKind::PointerOut, target, pos, Vec2::ZERO, source, cx);
            }
        }
    }

    fn press(&mut self, pos: Point) {
        if matches!(self.gesture, Gesture::Idle) {
            self.gesture = Gesture::Pressed {
                origin: pos,
                last: pos,
            };
        }
    }

    fn moved(&mut self, pos: Point, source: &InputEvent, cx: &mut DispatchContext<'_>) {
        match self.gesture {
            Gesture::Idle => self.hover_at(pos, source, cx),
            Gesture::Pressed { origin, .. } => {
                if (pos - origin).hypot() > self.config.drag_threshold {
                    self.start_drag(origin, source, cx);
                    self.drag_to(pos, source, cx);
                } else {
                    self.gesture = Gesture::Pressed { origin, last: pos };
                }
            }
            Gesture::Dragging { .. } => self.drag_to(pos, source, cx),
            Gesture::MultiTouch { .. } => {}
        }
    }

    fn release(
        &mut self,
        pos: Point,
        time: HostTime,
        source: &InputEvent,
        cx: &mut DispatchContext<'_>,
    ) {
        match core::mem::take(&mut self.gesture) {
            Gesture::Pressed { .. } => self.click(pos, time, source, cx),
            Gesture::Dragging { target, origin, .. } => {
                self.emit(EventKind::DragEnd, target, pos, pos - origin, source, cx);
            }
            Gesture::Idle => {}
            multi @ Gesture::MultiTouch { .. } => self.gesture = multi,
        }
    }

    fn click(
        &mut self,
        pos: Point,
        time: HostTime,
        source: &InputEvent,
        cx: &mut DispatchContext<'_>,
    ) {
        let target = cx.compositor.hit_test(pos, EventMask::CLICK);
        self.emit(EventKind::Click, target, pos, Vec2::ZERO, source, cx);

        let double = self.last_click.is_some_and(|(at, p)| {
            time.saturating_duration_since(at) <= self.config.double_click_interval
                && (pos - p).hypot() <= self.config.double_click_distance
        });
        if !double {
            self.last_click = Some((time, pos));
            return;
        }
        self.last_click = None;
        let target = cx.compositor.hit_test(pos, EventMask::DOUBLE_CLICK);
        let event = self.emit(EventKind::DoubleClick, target, pos, Vec2::ZERO, source, cx);
        if !event.is_canceled() {
            self.zoom_step(true, pos, cx);
        }
    }

    fn start_drag(&mut self, origin: Point, source: &InputEvent, cx: &mut DispatchContext<'_>) {
        let hit = cx.compositor.hit_test(origin, EventMask::DRAG_START);
        let event = self.emit(EventKind::DragStart, hit, origin, Vec2::ZERO, source, cx);
        self.gesture = Gesture::Dragging {
            target: event.dragging_object().unwrap_or(EventTarget::Map),
            origin,
            last: origin,
        };
    }

    fn drag_to(&mut self, pos: Point, source: &InputEvent, cx: &mut DispatchContext<'_>) {
        let Gesture::Dragging {
            target,
            origin,
            last,
        } = self.gesture
        else {
            return;
        };
        let delta = pos - last;
        let event = self.emit(EventKind::Drag, target, pos, delta, source, cx);
        if target == EventTarget::Map && !event.is_canceled() {
            cx.compositor.pan_by(delta);
        }
        self.gesture = Gesture::Dragging {
            target,
            origin,
            last: pos,
        };
    }

    fn hover_at(&mut self, pos: Point, source: &InputEvent, cx: &mut DispatchContext<'_>) {
        let target = cx
            .compositor
            .hit_test(pos, EventMask::POINTER_MOVE | EventMask::POINTER_OUT);
        if let Some(previous) = self.hover {
            if previous != target && previous != EventTarget::Map {
                self.emit(EventKind::PointerOut, previous, pos, Vec2::ZERO, source, cx);
            }
        }
        self.hover = Some(target);
        self.emit(EventKind::PointerMove, target, pos, Vec2::ZERO, source, cx);
    }

    fn wheel(&mut self, wheel: &WheelInput, source: &InputEvent, cx: &mut DispatchContext<'_>) {
        if !cx.compositor.is_update_allowed() {
            return;
        }
        let target = cx.compositor.hit_test(wheel.position, EventMask::WHEEL);
        let event = self.emit(EventKind::Wheel, target, wheel.position, Vec2::ZERO, source, cx);
        if !event.is_canceled() && wheel.dy != 0.0 {
            self.zoom_step(wheel.dy < 0.0, wheel.position, cx);
        }
    }

    fn zoom_step(&self, zoom_in: bool, anchor: Point, cx: &mut DispatchContext<'_>) {
        let next = step_resolution(
            cx.compositor.resolution(),
            cx.resolutions,
            zoom_in,
            self.config.wheel_zoom_factor,
        );
        cx.compositor.zoom_to(next, anchor);
    }

    fn touch(&mut self, touch: &TouchInput, source: &InputEvent, cx: &mut DispatchContext<'_>) {
        if touch.phase == TouchPhase::Cancel {
            if let Gesture::Dragging {
                target,
                origin,
                last,
            } = self.gesture
            {
                self.emit(EventKind::DragEnd, target, last, last - origin, source, cx);
            }
            self.end_multi_touch(cx);
            self.gesture = Gesture::Idle;
            return;
        }
        match (self.gesture, touch.touches.as_slice()) {
            (Gesture::MultiTouch { a, b }, touches) => {
                let a1 = find(touches, a.id);
                let b1 = find(touches, b.id);
                match (a1, b1) {
                    (Some(a1), Some(b1)) => {
                        self.pinch(a, b, a1, b1, cx);
                    }
                    _ if touches.len() >= 2 => {
                        // A tracked finger lifted but two remain: track those.
                        self.gesture = Gesture::MultiTouch {
                            a: touches[0],
                            b: touches[1],
                        };
                    }
                    _ => {
                        self.end_multi_touch(cx);
                        self.gesture = Gesture::Idle;
                    }
                }
            }
            (_, [first, second, ..]) => {
                if let Gesture::Dragging {
                    target,
                    origin,
                    last,
                } = self.gesture
                {
                    self.emit(EventKind::DragEnd, target, last, last - origin, source, cx);
                }
                cx.compositor.forbid_update();
                self.gesture = Gesture::MultiTouch {
                    a: *first,
                    b: *second,
                };
            }
            (gesture, [only]) => match touch.phase {
                TouchPhase::Start => self.press(only.position),
                // Touches do not hover.
                _ if gesture == Gesture::Idle => {}
                _ => self.moved(only.position, source, cx),
            },
            (Gesture::Pressed { last, .. } | Gesture::Dragging { last, .. }, []) => {
                self.release(last, touch.time, source, cx);
            }
            (_, []) => {}
        }
    }

    fn pinch(
        &mut self,
        a: TouchPoint,
        b: TouchPoint,
        a1: TouchPoint,
        b1: TouchPoint,
        cx: &mut DispatchContext<'_>,
    ) {
        match pinch_step(
            a.position,
            b.position,
            a1.position,
            b1.position,
            self.config.touch_pinch_epsilon,
        ) {
            PinchStep::Pan(delta) => cx.compositor.pan_by(delta),
            PinchStep::Zoom { factor, anchor } => cx.compositor.zoom_at(factor, anchor),
        }
        self.gesture = Gesture::MultiTouch { a: a1, b: b1 };
    }

    fn end_multi_touch(&mut self, cx: &mut DispatchContext<'_>) {
        if let Gesture::MultiTouch { a, b } = self.gesture {
            cx.compositor.allow_update();
            let mid = a.position.midpoint(b.position);
            cx.compositor.snap_resolution(cx.resolutions, mid);
        }
    }

    fn emit(
        &self,
        kind: EventKind,
        target: EventTarget,
        pos: Point,
        offset: Vec2,
        source: &InputEvent,
        cx: &mut DispatchContext<'_>,
    ) -> MapEvent {
        let world = cx.compositor.viewport().screen_to_world(pos);
        let mut event =
            MapEvent::new(kind, target, world, pos, source.clone()).with_offset(offset);
        cx.hub.dispatch(&mut event);
        event
    }
}

fn find(touches: &[TouchPoint], id: u32) -> Option<TouchPoint> {
    touches.iter().copied().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompositorConfig;
    use crate::feature::{Crs, Feature, FeatureId, Geometry, PointSymbol};
    use crate::input::event::Modifiers;
    use crate::input::hub::Scope;
    use crate::layer::{FeatureLayer, LayerKey};
    use crate::primitive::{Color, Style};
    use crate::testing::TestSurfaces;
    use crate::time::FrameTick;
    use crate::trace::Tracer;
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use kurbo::Size;

    type Log = Rc<RefCell<Vec<(EventKind, EventTarget, Vec2)>>>;

    struct Rig {
        compositor: Compositor,
        hub: EventHub,
        dispatcher: Dispatcher,
        resolutions: Vec<f64>,
        layer: LayerKey,
        log: Log,
    }

    impl Rig {
        /// A 256 px map at resolution 1 with a 10 px dot at world (10, 10),
        /// which sits at screen (138, 118).
        fn new() -> Self {
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
            .with_interest(EventMask::all());
            let mut layer = FeatureLayer::new(Crs::PLAIN);
            layer.add(feature).unwrap();

            let mut compositor = Compositor::new(CompositorConfig::DEFAULT);
            let key = compositor.add_layer(Rc::new(RefCell::new(layer))).unwrap();
            compositor.tick(
                &FrameTick::new(HostTime(0), 0),
                Size::new(256.0, 256.0),
                &mut TestSurfaces::default(),
                &mut Tracer::none(),
            );

            let log: Log = Rc::default();
            let mut hub = EventHub::new();
            let sink = log.clone();
            hub.on(Scope::Map, EventMask::all(), move |e| {
                sink.borrow_mut().push((e.kind(), e.target(), e.pixel_offset()));
            });
            Self {
                compositor,
                hub,
                dispatcher: Dispatcher::new(InputConfig::DEFAULT),
                resolutions: Vec::new(),
                layer: key,
                log,
            }
        }

        fn feature(&self) -> EventTarget {
            EventTarget::Feature {
                layer: self.layer,
                feature: FeatureId(1),
            }
        }

        fn send(&mut self, input: InputEvent) {
            let mut cx = DispatchContext {
                compositor: &mut self.compositor,
                hub: &mut self.hub,
                resolutions: &self.resolutions,
            };
            self.dispatcher.handle(&input, &mut cx);
        }

        fn mouse(&mut self, phase: MousePhase, x: f64, y: f64, ms: u64) {
            let button = matches!(phase, MousePhase::Down | MousePhase::Up)
                .then_some(MouseButton::Left);
            self.send(InputEvent::Mouse(MouseInput {
                phase,
                button,
                position: Point::new(x, y),
                mods: Modifiers::empty(),
                time: HostTime(ms * 1000),
            }));
        }

        fn touch(&mut self, phase: TouchPhase, points: &[(u32, f64, f64)]) {
            let touches = points
                .iter()
                .map(|&(id, x, y)| TouchPoint {
                    id,
                    position: Point::new(x, y),
                })
                .collect();
            self.send(InputEvent::Touch(TouchInput {
                phase,
                touches,
                time: HostTime(0),
            }));
        }

        fn kinds(&self) -> Vec<EventKind> {
            self.log.borrow().iter().map(|(k, _, _)| *k).collect()
        }
    }

    #[test]
    fn click_on_feature_reaches_the_feature() {
        let mut rig = Rig::new();
        rig.mouse(MousePhase::Down, 138.0, 118.0, 0);
        rig.mouse(MousePhase::Up, 138.0, 118.0, 10);
        let log = rig.log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, EventKind::Click);
        assert_eq!(log[0].1, rig.feature());
    }

    #[test]
    fn click_on_background_targets_the_map() {
        let mut rig = Rig::new();
        rig.mouse(MousePhase::Down, 20.0, 20.0, 0);
        rig.mouse(MousePhase::Up, 20.0, 20.0, 10);
        assert_eq!(rig.log.borrow()[0].1, EventTarget::Map);
    }

    #[test]
    fn one_pixel_wobble_is_still_a_click() {
        let mut rig = Rig::new();
        rig.mouse(MousePhase::Down, 50.0, 50.0, 0);
        rig.mouse(MousePhase::Move, 51.0, 50.0, 5);
        rig.mouse(MousePhase::Up, 51.0, 50.0, 10);
        assert_eq!(rig.kinds(), [EventKind::Click]);
        assert_eq!(rig.compositor.center(), Point::ORIGIN);
    }

    #[test]
    fn three_pixels_start_a_map_drag() {
        let mut rig = Rig::new();
        rig.mouse(MousePhase::Down, 50.0, 50.0, 0);
        rig.mouse(MousePhase::Move, 53.0, 50.0, 5);
        rig.mouse(MousePhase::Move, 55.0, 52.0, 6);
        rig.mouse(MousePhase::Up, 55.0, 52.0, 10);
        assert_eq!(
            rig.kinds(),
            [
                EventKind::DragStart,
                EventKind::Drag,
                EventKind::Drag,
                EventKind::DragEnd
            ]
        );
        let log = rig.log.borrow();
        assert_eq!(log[1].2, Vec2::new(3.0, 0.0));
        assert_eq!(log[2].2, Vec2::new(2.0, 2.0));
        assert_eq!(log[3].2, Vec2::new(5.0, 2.0));
        // Content follows the pointer.
        assert_eq!(rig.compositor.center(), Point::new(-5.0, 2.0));
    }

    #[test]
    fn claimed_drag_goes_to_the_feature_and_does_not_pan() {
        let mut rig = Rig::new();
        let feature = rig.feature();
        rig.hub.on(
            Scope::Feature(rig.layer, FeatureId(1)),
            EventMask::DRAG_START,
            move |e| e.set_dragging_object(feature),
        );
        rig.mouse(MousePhase::Down, 138.0, 118.0, 0);
        rig.mouse(MousePhase::Move, 148.0, 118.0, 5);
        rig.mouse(MousePhase::Up, 148.0, 118.0, 10);
        let log = rig.log.borrow();
        assert!(log.iter().all(|(_, target, _)| *target == feature));
        assert_eq!(rig.compositor.center(), Point::ORIGIN);
    }

    #[test]
    fn canceled_map_drag_does_not_pan() {
        let mut rig = Rig::new();
        rig.hub.on(Scope::Map, EventMask::DRAG, MapEvent::cancel);
        rig.mouse(MousePhase::Down, 50.0, 50.0, 0);
        rig.mouse(MousePhase::Move, 60.0, 50.0, 5);
        assert_eq!(rig.compositor.center(), Point::ORIGIN);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut rig = Rig::new();
        rig.mouse(MousePhase::Up, 50.0, 50.0, 0);
        assert!(rig.log.borrow().is_empty());
    }

    #[test]
    fn double_click_zooms_in_one_step() {
        let mut rig = Rig::new();
        rig.resolutions = vec![2.0, 1.0, 0.5];
        for t in [0, 100] {
            rig.mouse(MousePhase::Down, 128.0, 128.0, t);
            rig.mouse(MousePhase::Up, 128.0, 128.0, t + 20);
        }
        assert_eq!(
            rig.kinds(),
            [EventKind::Click, EventKind::Click, EventKind::DoubleClick]
        );
        assert_eq!(rig.compositor.resolution(), 0.5);
    }

    #[test]
    fn slow_clicks_are_not_a_double_click() {
        let mut rig = Rig::new();
        for t in [0, 1000] {
            rig.mouse(MousePhase::Down, 128.0, 128.0, t);
            rig.mouse(MousePhase::Up, 128.0, 128.0, t + 20);
        }
        assert_eq!(rig.kinds(), [EventKind::Click, EventKind::Click]);
        assert_eq!(rig.compositor.resolution(), 1.0);
    }

    #[test]
    fn wheel_steps_the_ladder_unless_frozen() {
        let mut rig = Rig::new();
        rig.resolutions = vec![4.0, 2.0, 1.0];
        let wheel = |dy| {
            InputEvent::Wheel(WheelInput {
                position: Point::new(128.0, 128.0),
                dx: 0.0,
                dy,
                mods: Modifiers::empty(),
                time: HostTime(0),
            })
        };
        rig.send(wheel(100.0));
        assert_eq!(rig.compositor.resolution(), 2.0);

        rig.compositor.forbid_update();
        rig.send(wheel(100.0));
        assert_eq!(rig.compositor.resolution(), 2.0);
        assert_eq!(rig.kinds(), [EventKind::Wheel]);
    }

    #[test]
    fn hover_emits_pointer_out_when_leaving_a_feature() {
        let mut rig = Rig::new();
        rig.mouse(MousePhase::Move, 138.0, 118.0, 0);
        rig.mouse(MousePhase::Move, 20.0, 20.0, 5);
        let log = rig.log.borrow();
        let feature = rig.feature();
        assert_eq!(log[0].0, EventKind::PointerMove);
        assert_eq!(log[0].1, feature);
        assert_eq!(log[1].0, EventKind::PointerOut);
        assert_eq!(log[1].1, feature);
        assert_eq!(log[2].0, EventKind::PointerMove);
        assert_eq!(log[2].1, EventTarget::Map);
    }

    #[test]
    fn pinch_zooms_and_freezes_updates() {
        let mut rig = Rig::new();
        rig.resolutions = vec![1.0, 0.5, 0.25];
        rig.touch(TouchPhase::Start, &[(1, 118.0, 128.0)]);
        rig.touch(TouchPhase::Start, &[(1, 118.0, 128.0), (2, 138.0, 128.0)]);
        assert!(rig.dispatcher.is_pinching());
        assert!(!rig.compositor.is_update_allowed());

        rig.touch(TouchPhase::Move, &[(1, 108.0, 128.0), (2, 148.0, 128.0)]);
        assert!((rig.compositor.resolution() - 0.5).abs() < 1e-12);
        assert!((rig.compositor.center() - Point::ORIGIN).hypot() < 1e-9);

        // Slightly past the ladder entry; release snaps back onto it.
        rig.touch(TouchPhase::Move, &[(1, 107.0, 128.0), (2, 149.0, 128.0)]);
        rig.touch(TouchPhase::End, &[(2, 149.0, 128.0)]);
        assert!(rig.compositor.is_update_allowed());
        assert_eq!(rig.compositor.resolution(), 0.5);
        assert!(rig.log.borrow().is_empty());
    }

    #[test]
    fn second_finger_ends_a_touch_drag() {
        let mut rig = Rig::new();
        rig.touch(TouchPhase::Start, &[(1, 50.0, 50.0)]);
        rig.touch(TouchPhase::Move, &[(1, 60.0, 50.0)]);
        rig.touch(TouchPhase::Start, &[(1, 60.0, 50.0), (2, 90.0, 50.0)]);
        assert_eq!(
            rig.kinds(),
            [EventKind::DragStart, EventKind::Drag, EventKind::DragEnd]
        );
        rig.touch(TouchPhase::End, &[]);
        assert!(!rig.dispatcher.is_pinching());
        assert!(rig.compositor.is_update_allowed());
    }

    #[test]
    fn touch_tap_clicks() {
        let mut rig = Rig::new();
        rig.touch(TouchPhase::Start, &[(1, 138.0, 118.0)]);
        rig.touch(TouchPhase::End, &[]);
        assert_eq!(rig.kinds(), [EventKind::Click]);
        assert_eq!(rig.log.borrow()[0].1, rig.feature());
    }
}

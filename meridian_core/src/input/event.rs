// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host input and map events.
//!
//! Hosts translate their native events into [`InputEvent`]s with positions in
//! screen pixels relative to the map's top-left corner. The dispatcher turns
//! those into [`MapEvent`]s addressed to an [`EventTarget`].

use alloc::vec::Vec;

use bitflags::bitflags;
use kurbo::{Point, Vec2};

use crate::feature::FeatureId;
use crate::layer::LayerKey;
use crate::time::HostTime;

bitflags! {
    /// Set of event kinds, used to declare which events a feature wants.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u16 {
        /// Press and release without moving past the drag threshold.
        const CLICK        = 1 << 0;
        /// Two clicks in quick succession.
        const DOUBLE_CLICK = 1 << 1;
        /// Pointer moved without a button pressed.
        const POINTER_MOVE = 1 << 2;
        /// Pointer left the target.
        const POINTER_OUT  = 1 << 3;
        /// A drag began.
        const DRAG_START   = 1 << 4;
        /// Pointer moved during a drag.
        const DRAG         = 1 << 5;
        /// A drag ended.
        const DRAG_END     = 1 << 6;
        /// Wheel turned.
        const WHEEL        = 1 << 7;
    }
}

bitflags! {
    /// Modifier keys held during an input event.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Shift.
        const SHIFT = 0b0001;
        /// Alt / Option.
        const ALT   = 0b0010;
        /// Control.
        const CTRL  = 0b0100;
        /// Meta / Command / Windows.
        const SUPER = 0b1000;
    }
}

/// A map-semantic event kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`EventMask::CLICK`].
    Click,
    /// See [`EventMask::DOUBLE_CLICK`].
    DoubleClick,
    /// See [`EventMask::POINTER_MOVE`].
    PointerMove,
    /// See [`EventMask::POINTER_OUT`].
    PointerOut,
    /// See [`EventMask::DRAG_START`].
    DragStart,
    /// See [`EventMask::DRAG`].
    Drag,
    /// See [`EventMask::DRAG_END`].
    DragEnd,
    /// See [`EventMask::WHEEL`].
    Wheel,
}

impl EventKind {
    /// The single-bit mask of this kind.
    #[must_use]
    pub const fn mask(self) -> EventMask {
        match self {
            Self::Click => EventMask::CLICK,
            Self::DoubleClick => EventMask::DOUBLE_CLICK,
            Self::PointerMove => EventMask::POINTER_MOVE,
            Self::PointerOut => EventMask::POINTER_OUT,
            Self::DragStart => EventMask::DRAG_START,
            Self::Drag => EventMask::DRAG,
            Self::DragEnd => EventMask::DRAG_END,
            Self::Wheel => EventMask::WHEEL,
        }
    }
}

/// Who an event is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// The map background.
    Map,
    /// A layer as a whole.
    Layer(LayerKey),
    /// One feature of a layer.
    Feature {
        /// The layer the feature was hit in.
        layer: LayerKey,
        /// The feature.
        feature: FeatureId,
    },
}

impl EventTarget {
    /// The layer of a layer or feature target.
    #[must_use]
    pub fn layer(self) -> Option<LayerKey> {
        match self {
            Self::Map => None,
            Self::Layer(layer) | Self::Feature { layer, .. } => Some(layer),
        }
    }
}

/// Phase of a mouse or pen event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MousePhase {
    /// Button pressed.
    Down,
    /// Button released.
    Up,
    /// Pointer moved.
    Move,
    /// Pointer left the map surface.
    Leave,
}

/// Mouse button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Wheel button.
    Middle,
    /// Secondary button.
    Right,
    /// Any other button, by host index.
    Other(u8),
}

impl MouseButton {
    /// Maps a DOM-style button index.
    #[must_use]
    pub const fn from_u8(n: u8) -> Self {
        match n {
            0 => Self::Left,
            1 => Self::Middle,
            2 => Self::Right,
            other => Self::Other(other),
        }
    }
}

/// A mouse or pen event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseInput {
    /// What happened.
    pub phase: MousePhase,
    /// Button that changed state, for `Down`/`Up`.
    pub button: Option<MouseButton>,
    /// Screen position.
    pub position: Point,
    /// Held modifiers.
    pub mods: Modifiers,
    /// Host time of the event.
    pub time: HostTime,
}

/// A wheel event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelInput {
    /// Screen position.
    pub position: Point,
    /// Horizontal delta, host units.
    pub dx: f64,
    /// Vertical delta, host units. Positive scrolls down (zooms out).
    pub dy: f64,
    /// Held modifiers.
    pub mods: Modifiers,
    /// Host time of the event.
    pub time: HostTime,
}

/// Phase of a touch event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    /// A finger touched down.
    Start,
    /// Fingers moved.
    Move,
    /// A finger lifted.
    End,
    /// The host aborted the touch sequence.
    Cancel,
}

/// One active touch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    /// Host identifier, stable for the lifetime of the touch.
    pub id: u32,
    /// Screen position.
    pub position: Point,
}

/// A touch event.
#[derive(Clone, Debug, PartialEq)]
pub struct TouchInput {
    /// What happened.
    pub phase: TouchPhase,
    /// Every touch still on the surface after this event.
    pub touches: Vec<TouchPoint>,
    /// Host time of the event.
    pub time: HostTime,
}

/// A normalized host input event.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// Mouse or pen.
    Mouse(MouseInput),
    /// Wheel.
    Wheel(WheelInput),
    /// Touch.
    Touch(TouchInput),
}

impl InputEvent {
    /// Host time of the event.
    #[must_use]
    pub fn time(&self) -> HostTime {
        match self {
            Self::Mouse(m) => m.time,
            Self::Wheel(w) => w.time,
            Self::Touch(t) => t.time,
        }
    }
}

/// A map-semantic event delivered to handlers.
#[derive(Clone, Debug)]
pub struct MapEvent {
    kind: EventKind,
    target: EventTarget,
    point: Point,
    position: Point,
    pixel_offset: Vec2,
    source: InputEvent,
    dragging_object: Option<EventTarget>,
    stopped: bool,
    canceled: bool,
}

impl MapEvent {
    pub(crate) fn new(
        kind: EventKind,
        target: EventTarget,
        point: Point,
        position: Point,
        source: InputEvent,
    ) -> Self {
        Self {
            kind,
            target,
            point,
            position,
            pixel_offset: Vec2::ZERO,
            source,
            dragging_object: None,
            stopped: false,
            canceled: false,
        }
    }

    pub(crate) fn with_offset(mut self, offset: Vec2) -> Self {
        self.pixel_offset = offset;
        self
    }

    /// The event kind.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// The target the event was resolved to.
    #[must_use]
    pub fn target(&self) -> EventTarget {
        self.target
    }

    /// World position of the pointer.
    #[must_use]
    pub fn point(&self) -> Point {
        self.point
    }

    /// Screen position of the pointer.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Screen offset: movement since the previous drag event for `Drag`, the
    /// whole drag for `DragEnd`, zero otherwise.
    #[must_use]
    pub fn pixel_offset(&self) -> Vec2 {
        self.pixel_offset
    }

    /// The host event this was synthesized from.
    #[must_use]
    pub fn source(&self) -> &InputEvent {
        &self.source
    }

    /// The target nominated to receive the drag, if any.
    #[must_use]
    pub fn dragging_object(&self) -> Option<EventTarget> {
        self.dragging_object
    }

    /// From a `DragStart` handler, claims the drag for `target`. Subsequent
    /// `Drag` and `DragEnd` events go there instead of the map.
    pub fn set_dragging_object(&mut self, target: EventTarget) {
        self.dragging_object = Some(target);
    }

    /// Stops delivery to the remaining handlers on the propagation path.
    pub fn stop_propagation(&mut self) {
        self.stopped = true;
    }

    /// Whether [`stop_propagation`](Self::stop_propagation) was called.
    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped
    }

    /// Suppresses the map's default action (pan, zoom) for this event.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    /// Whether [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }
}

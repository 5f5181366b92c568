// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input dispatch.
//!
//! Hosts feed normalized [`InputEvent`]s in. The [`Dispatcher`] recognizes
//! clicks, double-clicks, drags and two-finger pinches, resolves each event to
//! an [`EventTarget`] by hit-testing layers topmost first, and hands the
//! resulting [`MapEvent`] to the [`EventHub`], which walks handlers from the
//! feature up to the map.
//!
//! Drags are armed on press and start only once the pointer moved more than
//! [`InputConfig::drag_threshold`](crate::config::InputConfig::drag_threshold)
//! pixels. The drag-start event is hit-tested at the press position; a
//! handler claims the drag with [`MapEvent::set_dragging_object`], otherwise
//! the map pans.

mod dispatcher;
mod event;
mod gesture;
mod hub;

pub(crate) use dispatcher::DispatchContext;
pub use dispatcher::Dispatcher;
pub use event::{
    EventKind, EventMask, EventTarget, InputEvent, MapEvent, Modifiers, MouseButton, MouseInput,
    MousePhase, TouchInput, TouchPhase, TouchPoint, WheelInput,
};
pub use gesture::{PinchStep, pinch_step};
pub use hub::{EventHub, Handler, HandlerId, Scope};

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM input listeners.
//!
//! [`InputListeners`] registers mouse, wheel and touch listeners on one
//! element and forwards every event as an [`InputEvent`] with positions
//! relative to the element's top-left corner. Dropping it removes every
//! listener again.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use js_sys::Function;
use kurbo::Point;
use meridian_core::input::{
    InputEvent, Modifiers, MouseButton, MouseInput, MousePhase, TouchInput, TouchPhase,
    TouchPoint, WheelInput,
};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use web_sys::{AddEventListenerOptions, Event, HtmlElement, MouseEvent, TouchEvent, WheelEvent};

use crate::now;

type Listener = Closure<dyn FnMut(Event)>;
type Sink = Rc<RefCell<dyn FnMut(InputEvent)>>;

/// Event listeners forwarding DOM input to a callback.
pub struct InputListeners {
    target: HtmlElement,
    listeners: Vec<(&'static str, Listener)>,
}

impl core::fmt::Debug for InputListeners {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kinds: Vec<&str> = self.listeners.iter().map(|(k, _)| *k).collect();
        f.debug_struct("InputListeners")
            .field("events", &kinds)
            .finish_non_exhaustive()
    }
}

impl InputListeners {
    /// Starts listening on `target`.
    pub fn attach(target: &HtmlElement, sink: impl FnMut(InputEvent) + 'static) -> Self {
        let sink: Sink = Rc::new(RefCell::new(sink));
        let mut this = Self {
            target: target.clone(),
            listeners: Vec::new(),
        };
        for (kind, phase) in [
            ("mousedown", MousePhase::Down),
            ("mouseup", MousePhase::Up),
            ("mousemove", MousePhase::Move),
            ("mouseleave", MousePhase::Leave),
        ] {
            this.listen(kind, false, &sink, move |el, event| {
                let e = event.dyn_ref::<MouseEvent>()?;
                Some(InputEvent::Mouse(mouse_input(phase, e, el)))
            });
        }
        this.listen("wheel", true, &sink, |el, event| {
            let e = event.dyn_ref::<WheelEvent>()?;
            Some(InputEvent::Wheel(WheelInput {
                position: local_position(el, e.client_x(), e.client_y()),
                dx: e.delta_x(),
                dy: e.delta_y(),
                mods: modifiers(e),
                time: now(),
            }))
        });
        for (kind, phase) in [
            ("touchstart", TouchPhase::Start),
            ("touchmove", TouchPhase::Move),
            ("touchend", TouchPhase::End),
            ("touchcancel", TouchPhase::Cancel),
        ] {
            this.listen(kind, true, &sink, move |el, event| {
                let e = event.dyn_ref::<TouchEvent>()?;
                Some(InputEvent::Touch(touch_input(phase, e, el)))
            });
        }
        this
    }

    /// Registers one listener. With `exclusive`, the browser's default
    /// action (page scroll, touch zoom) is suppressed.
    fn listen(
        &mut self,
        kind: &'static str,
        exclusive: bool,
        sink: &Sink,
        convert: impl Fn(&HtmlElement, &Event) -> Option<InputEvent> + 'static,
    ) {
        let sink = Rc::clone(sink);
        let el = self.target.clone();
        let closure = Closure::wrap(Box::new(move |event: Event| {
            let Some(input) = convert(&el, &event) else {
                return;
            };
            if exclusive {
                event.prevent_default();
            }
            match sink.try_borrow_mut() {
                Ok(mut sink) => (*sink)(input),
                Err(_) => log::debug!("dropping {kind} received during dispatch"),
            }
        }) as Box<dyn FnMut(Event)>);

        let options = AddEventListenerOptions::new();
        options.set_passive(!exclusive);
        let callback: &Function = closure.as_ref().unchecked_ref();
        let added = self
            .target
            .add_event_listener_with_callback_and_add_event_listener_options(
                kind,
                callback,
                &options,
            );
        if let Err(err) = added {
            log::warn!("cannot listen for {kind}: {err:?}");
            return;
        }
        self.listeners.push((kind, closure));
    }
}

impl Drop for InputListeners {
    fn drop(&mut self) {
        for (kind, closure) in self.listeners.drain(..) {
            let callback: &Function = closure.as_ref().unchecked_ref();
            let removed = self
                .target
                .remove_event_listener_with_callback(kind, callback);
            if let Err(err) = removed {
                log::debug!("cannot stop listening for {kind}: {err:?}");
            }
        }
    }
}

fn local_position(el: &HtmlElement, client_x: i32, client_y: i32) -> Point {
    let rect = el.get_bounding_client_rect();
    to_local(
        Point::new(f64::from(client_x), f64::from(client_y)),
        Point::new(rect.left(), rect.top()),
    )
}

fn to_local(client: Point, origin: Point) -> Point {
    (client - origin).to_point()
}

fn modifiers(e: &MouseEvent) -> Modifiers {
    let mut mods = Modifiers::empty();
    mods.set(Modifiers::SHIFT, e.shift_key());
    mods.set(Modifiers::ALT, e.alt_key());
    mods.set(Modifiers::CTRL, e.ctrl_key());
    mods.set(Modifiers::SUPER, e.meta_key());
    mods
}

fn mouse_input(phase: MousePhase, e: &MouseEvent, el: &HtmlElement) -> MouseInput {
    let button = match phase {
        MousePhase::Down | MousePhase::Up => button(e.button()),
        MousePhase::Move | MousePhase::Leave => None,
    };
    MouseInput {
        phase,
        button,
        position: local_position(el, e.client_x(), e.client_y()),
        mods: modifiers(e),
        time: now(),
    }
}

fn button(raw: i16) -> Option<MouseButton> {
    u8::try_from(raw).ok().map(MouseButton::from_u8)
}

fn touch_input(phase: TouchPhase, e: &TouchEvent, el: &HtmlElement) -> TouchInput {
    let list = e.touches();
    let rect = el.get_bounding_client_rect();
    let origin = Point::new(rect.left(), rect.top());
    let touches = (0..list.length())
        .filter_map(|i| list.item(i))
        .map(|t| TouchPoint {
            id: touch_id(t.identifier()),
            position: to_local(
                Point::new(f64::from(t.client_x()), f64::from(t.client_y())),
                origin,
            ),
        })
        .collect();
    TouchInput {
        phase,
        touches,
        time: now(),
    }
}

/// Browsers hand out small non-negative identifiers; anything else is folded
/// into the `u32` range bit-for-bit.
fn touch_id(raw: i32) -> u32 {
    u32::from_ne_bytes(raw.to_ne_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_relative_to_the_element() {
        let p = to_local(Point::new(150.0, 40.0), Point::new(12.0, 22.0));
        assert_eq!(p, Point::new(138.0, 18.0));
    }

    #[test]
    fn dom_buttons_map_to_mouse_buttons() {
        assert_eq!(button(0), Some(MouseButton::Left));
        assert_eq!(button(2), Some(MouseButton::Right));
        assert_eq!(button(4), Some(MouseButton::Other(4)));
        assert_eq!(button(-1), None);
    }

    #[test]
    fn touch_ids_survive_the_conversion() {
        assert_eq!(touch_id(7), 7);
        assert_ne!(touch_id(-1), touch_id(1));
    }
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation-frame scheduling for a mounted map.
//!
//! [`RafLoop`] drives one map frame per `requestAnimationFrame` callback. The
//! callback's [`DOMHighResTimeStamp`][mdn] (milliseconds on the
//! `performance.now()` timeline) becomes a microsecond [`HostTime`].
//!
//! A frame callback may find the map already borrowed, for example when an
//! event handler running inside the frame calls back into the host. It
//! reports [`FrameStatus::Busy`] and the loop keeps going; the next frame
//! picks up the work. Frames that arrive while the frame callback itself is
//! still running are skipped the same way.
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};

use js_sys::Function;
use meridian_core::time::{FrameTick, HostTime};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

// Global bindings avoid fetching the Window and Performance objects per frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &Function) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(handle: i32);
}

/// What a frame callback managed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame ran.
    Ran,
    /// The map was in use elsewhere; the frame was skipped.
    Busy,
}

#[derive(Clone, Copy, Debug)]
enum Schedule {
    Stopped,
    Requested(i32),
}

type FrameFn = Box<dyn FnMut(FrameTick) -> FrameStatus>;

struct Shared {
    schedule: Cell<Schedule>,
    frames: Cell<u64>,
    skipped: Cell<u64>,
    on_frame: RefCell<FrameFn>,
    /// Registered with `requestAnimationFrame`. Holds only a weak reference
    /// back, so dropping the loop frees both.
    trampoline: Closure<dyn FnMut(f64)>,
}

impl Shared {
    fn fire(&self, timestamp_ms: f64) {
        if matches!(self.schedule.get(), Schedule::Stopped) {
            return;
        }
        let frame_index = self.frames.get();
        self.frames.set(frame_index + 1);
        let tick = FrameTick::new(HostTime::from_millis_f64(timestamp_ms), frame_index);

        let status = match self.on_frame.try_borrow_mut() {
            Ok(mut on_frame) => on_frame(tick),
            Err(_) => FrameStatus::Busy,
        };
        if status == FrameStatus::Busy {
            self.skipped.set(self.skipped.get() + 1);
            log::debug!("frame {frame_index} skipped: map busy");
        }

        // The callback may have stopped the loop.
        if !matches!(self.schedule.get(), Schedule::Stopped) {
            self.request();
        }
    }

    fn request(&self) {
        let handle = request_animation_frame(self.trampoline.as_ref().unchecked_ref());
        self.schedule.set(Schedule::Requested(handle));
    }
}

/// A `requestAnimationFrame` loop driving map frames.
///
/// The loop re-registers itself each frame until [`stop`](Self::stop) is
/// called or the `RafLoop` is dropped.
pub struct RafLoop {
    shared: Rc<Shared>,
}

impl RafLoop {
    /// Creates a loop that is not running yet.
    pub fn new(on_frame: impl FnMut(FrameTick) -> FrameStatus + 'static) -> Self {
        let shared = Rc::new_cyclic(|weak: &Weak<Shared>| {
            let weak = weak.clone();
            let trampoline = Closure::wrap(Box::new(move |timestamp_ms: f64| {
                if let Some(shared) = weak.upgrade() {
                    shared.fire(timestamp_ms);
                }
            }) as Box<dyn FnMut(f64)>);
            Shared {
                schedule: Cell::new(Schedule::Stopped),
                frames: Cell::new(0),
                skipped: Cell::new(0),
                on_frame: RefCell::new(Box::new(on_frame)),
                trampoline,
            }
        });
        Self { shared }
    }

    /// Starts the loop. No-op if already running.
    pub fn start(&self) {
        if matches!(self.shared.schedule.get(), Schedule::Stopped) {
            self.shared.request();
        }
    }

    /// Stops the loop and cancels the pending callback. Can be restarted.
    pub fn stop(&self) {
        if let Schedule::Requested(handle) = self.shared.schedule.replace(Schedule::Stopped) {
            cancel_animation_frame(handle);
        }
    }

    /// Whether the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.shared.schedule.get(), Schedule::Requested(_))
    }

    /// Frames delivered so far, including skipped ones.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.shared.frames.get()
    }

    /// Frames skipped because the map was busy.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.shared.skipped.get()
    }
}

impl Drop for RafLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

impl core::fmt::Debug for RafLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RafLoop")
            .field("running", &self.is_running())
            .field("frames", &self.frames())
            .field("skipped", &self.skipped())
            .finish_non_exhaustive()
    }
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mounting a map into a page.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use core::cell::RefCell;

use kurbo::Size;
use meridian_core::compositor::FrameOutcome;
use meridian_core::config::MapConfig;
use meridian_core::container::ContainerChanges;
use meridian_core::error::SetupError;
use meridian_core::geometry::PixelSnapping;
use meridian_core::map::Map;
use meridian_core::presenter::Presenter as _;
use meridian_core::time::FrameTick;
use meridian_core::trace::{NoopSink, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink, Tracer};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use web_sys::{Element, HtmlElement};

use crate::input::InputListeners;
use crate::presenter::DomPresenter;
use crate::raf::{FrameStatus, RafLoop};
use crate::style::{MAP_STYLE, MAP_STYLE_NAME, StyleRegistry};
use crate::surfaces::{NodeTable, WebSurfaces};
use crate::{WebClock, css};

/// Class of the wrapper element appended to the mount target.
const WRAPPER_CLASS: &str = "meridian-map";
/// Class of the element holding all containers.
const VIEWPORT_CLASS: &str = "meridian-viewport";

/// Host-side options for [`MapHost::mount`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostConfig {
    /// Install [`MAP_STYLE`] into the document.
    pub install_styles: bool,
    /// Pick [`PixelSnapping`] from the browser's compositing support instead
    /// of using the configured value.
    pub detect_sub_pixel: bool,
}

impl HostConfig {
    /// Default host configuration.
    pub const DEFAULT: Self = Self {
        install_styles: true,
        detect_sub_pixel: true,
    };
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

struct HostState {
    map: RefCell<Map>,
    presenter: RefCell<DomPresenter>,
    surfaces: RefCell<WebSurfaces>,
    sink: RefCell<Box<dyn TraceSink>>,
    changes: RefCell<ContainerChanges>,
    wrapper: HtmlElement,
    viewport: HtmlElement,
}

impl HostState {
    fn frame(&self, tick: FrameTick) -> FrameStatus {
        // A handler that re-entered the frame loop; try again next frame.
        let Ok(mut map) = self.map.try_borrow_mut() else {
            return FrameStatus::Busy;
        };
        let size = Size::new(
            f64::from(self.wrapper.client_width().max(0)),
            f64::from(self.wrapper.client_height().max(0)),
        );
        let mut sink = self.sink.borrow_mut();
        let clock = WebClock;
        let mut tracer = Tracer::new(&mut **sink).with_clock(&clock);

        let outcome = map.tick(&tick, size, &mut *self.surfaces.borrow_mut(), &mut tracer);

        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: tick.frame_index,
            phase: PhaseKind::Present,
            timestamp: tracer.now_or(tick.now),
        });
        let mut changes = self.changes.borrow_mut();
        map.evaluate_into(&mut changes);
        if !changes.is_empty() {
            self.presenter
                .borrow_mut()
                .apply(map.compositor().containers(), &changes);
        }
        let style = self.viewport.style();
        if matches!(outcome, FrameOutcome::Frozen) {
            let preview = map.compositor().preview_transform();
            css::set_property(&style, "transform", &css::transform(preview));
        } else {
            css::remove_property(&style, "transform");
        }
        tracer.phase_end(&PhaseEndEvent {
            frame_index: tick.frame_index,
            phase: PhaseKind::Present,
            timestamp: tracer.now_or(tick.now),
        });
        FrameStatus::Ran
    }
}

/// A map mounted into a DOM element.
///
/// Dropping the host (or calling [`unmount`](Self::unmount)) stops the frame
/// loop, removes every listener and removes the wrapper element.
pub struct MapHost {
    state: Rc<HostState>,
    raf: Option<RafLoop>,
    listeners: Option<InputListeners>,
    styles: StyleRegistry,
}

impl core::fmt::Debug for MapHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MapHost")
            .field("mounted", &self.is_mounted())
            .field("raf", &self.raf)
            .field("listeners", &self.listeners)
            .field("styles", &self.styles)
            .finish_non_exhaustive()
    }
}

impl MapHost {
    /// Builds a map from `config` and mounts it into `target`.
    ///
    /// Appends exactly one wrapper element to `target` and starts the frame
    /// loop. Fails with [`SetupError::InvalidMountTarget`] when `target` is
    /// missing or not connected to a document.
    pub fn mount(
        target: Option<&Element>,
        mut config: MapConfig,
        host: HostConfig,
    ) -> Result<Self, SetupError> {
        let target = target.ok_or_else(|| invalid("no mount target"))?;
        if !target.is_connected() {
            return Err(invalid("mount target is not attached to a document"));
        }
        let document = target
            .owner_document()
            .ok_or_else(|| invalid("mount target has no document"))?;

        if host.detect_sub_pixel {
            config.compositor.snapping = detect_snapping();
        }
        let map = Map::new(config)?;

        let mut styles = StyleRegistry::new();
        if host.install_styles {
            styles
                .register(&document, MAP_STYLE_NAME, MAP_STYLE)
                .map_err(dom_error)?;
        }

        let wrapper = create_div(&document, WRAPPER_CLASS)?;
        let viewport = create_div(&document, VIEWPORT_CLASS)?;
        wrapper.append_child(&viewport).map_err(dom_error)?;

        let nodes = NodeTable::default();
        let state = Rc::new(HostState {
            map: RefCell::new(map),
            presenter: RefCell::new(DomPresenter::new(viewport.clone(), nodes.clone())),
            surfaces: RefCell::new(WebSurfaces::new(document, nodes)),
            sink: RefCell::new(Box::new(NoopSink)),
            changes: RefCell::new(ContainerChanges::default()),
            wrapper,
            viewport,
        });
        target.append_child(&state.wrapper).map_err(dom_error)?;

        let listeners = {
            let state = Rc::clone(&state);
            let wrapper = state.wrapper.clone();
            InputListeners::attach(&wrapper, move |input| {
                match state.map.try_borrow_mut() {
                    Ok(mut map) => map.handle_input(&input),
                    Err(_) => log::debug!("input arrived while the map was busy"),
                }
            })
        };
        let raf = {
            let state = Rc::clone(&state);
            RafLoop::new(move |tick| state.frame(tick))
        };
        raf.start();
        log::debug!("map mounted");

        Ok(Self {
            state,
            raf: Some(raf),
            listeners: Some(listeners),
            styles,
        })
    }

    /// Runs `f` with the map.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a map event handler.
    pub fn with_map<R>(&self, f: impl FnOnce(&mut Map) -> R) -> R {
        f(&mut self.state.map.borrow_mut())
    }

    /// Routes trace events of subsequent frames to `sink`.
    pub fn set_trace_sink(&self, sink: Box<dyn TraceSink>) {
        *self.state.sink.borrow_mut() = sink;
    }

    /// The wrapper element.
    #[must_use]
    pub fn wrapper(&self) -> &HtmlElement {
        &self.state.wrapper
    }

    /// Whether the host is still mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.raf.is_some()
    }

    /// Stops the frame loop, removes listeners and the wrapper element.
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let Some(raf) = self.raf.take() else {
            return;
        };
        raf.stop();
        drop(raf);
        self.listeners = None;
        self.state.wrapper.remove();
        log::debug!("map unmounted");
    }
}

impl Drop for MapHost {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Whether the browser composites transformed elements at sub-pixel
/// precision.
fn detect_snapping() -> PixelSnapping {
    match web_sys::css::supports_with_value("will-change", "transform") {
        Ok(true) => PixelSnapping::SubPixel,
        Ok(false) | Err(_) => PixelSnapping::WholePixels,
    }
}

fn create_div(document: &web_sys::Document, class: &str) -> Result<HtmlElement, SetupError> {
    let el: HtmlElement = document
        .create_element("div")
        .map_err(dom_error)?
        .unchecked_into();
    el.set_class_name(class);
    Ok(el)
}

fn invalid(reason: &str) -> SetupError {
    SetupError::InvalidMountTarget(String::from(reason))
}

fn dom_error(err: JsValue) -> SetupError {
    SetupError::InvalidMountTarget(format!("{err:?}"))
}

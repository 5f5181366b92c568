// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canvas raster surfaces and DOM retained nodes.
//!
//! Every surface the core asks for becomes one DOM element recorded in a
//! [`NodeTable`] under its [`NodeKey`]. The [`DomPresenter`](crate::DomPresenter)
//! reads the same table to move elements between containers.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString as _};
use core::cell::RefCell;
use core::f64::consts::TAU;

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size, Vec2};
use meridian_core::error::NodeError;
use meridian_core::primitive::{RenderPrimitive, Style};
use meridian_core::surface::{NodeCompleter, NodeKey, PendingNode, RasterSurface, Surfaces};
use meridian_core::time::Duration;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{
    CanvasRenderingContext2d, CanvasWindingRule, Document, HtmlCanvasElement, HtmlElement,
    HtmlImageElement,
};

use crate::css;

/// Class given to every node element.
pub(crate) const NODE_CLASS: &str = "meridian-node";

/// Shared map from node keys to their DOM elements.
#[derive(Clone, Default)]
pub struct NodeTable {
    elements: Rc<RefCell<HashMap<NodeKey, HtmlElement>>>,
}

impl core::fmt::Debug for NodeTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeTable")
            .field("len", &self.elements.borrow().len())
            .finish()
    }
}

impl NodeTable {
    /// Returns the element of `key`.
    #[must_use]
    pub fn get(&self, key: NodeKey) -> Option<HtmlElement> {
        self.elements.borrow().get(&key).cloned()
    }

    /// Number of live node elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    /// Whether no node elements exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }

    fn insert(&self, key: NodeKey, element: HtmlElement) {
        self.elements.borrow_mut().insert(key, element);
    }

    fn remove(&self, key: NodeKey) -> Option<HtmlElement> {
        self.elements.borrow_mut().remove(&key)
    }
}

/// Keeps an image's load callbacks alive until the node is discarded.
struct ImageLoad {
    image: HtmlImageElement,
    _onload: Closure<dyn FnMut()>,
    _onerror: Closure<dyn FnMut()>,
}

/// [`Surfaces`] implementation creating DOM elements in one document.
pub struct WebSurfaces {
    document: Document,
    nodes: NodeTable,
    loads: HashMap<NodeKey, ImageLoad>,
}

impl core::fmt::Debug for WebSurfaces {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebSurfaces")
            .field("nodes", &self.nodes)
            .field("loading", &self.loads.len())
            .finish_non_exhaustive()
    }
}

impl WebSurfaces {
    /// Creates surfaces in `document`, recording elements in `nodes`.
    #[must_use]
    pub fn new(document: Document, nodes: NodeTable) -> Self {
        Self {
            document,
            nodes,
            loads: HashMap::new(),
        }
    }

    fn create_node_element(&self, tag: &str) -> Result<HtmlElement, JsValue> {
        let el: HtmlElement = self.document.create_element(tag)?.unchecked_into();
        el.set_class_name(NODE_CLASS);
        Ok(el)
    }

    fn build_image(
        &mut self,
        key: NodeKey,
        source: &str,
        opacity: f64,
        transition: Duration,
    ) -> Result<PendingNode, JsValue> {
        let image = HtmlImageElement::new()?;
        image.set_class_name(NODE_CLASS);
        let style = image.style();
        style.set_property("opacity", "0")?;
        if transition > Duration::ZERO {
            style.set_property(
                "transition",
                &css::fade_transition(transition.as_millis_f64()),
            )?;
        }

        let (pending, completer) = PendingNode::channel();
        let completer = Rc::new(RefCell::new(Some(completer)));

        let onload = {
            let completer = Rc::clone(&completer);
            let image = image.clone();
            let opacity = opacity.to_string();
            Closure::<dyn FnMut()>::new(move || {
                css::set_property(&image.style(), "opacity", &opacity);
                finish(&completer, Ok(()));
            })
        };
        let onerror = {
            let completer = Rc::clone(&completer);
            let source = String::from(source);
            Closure::<dyn FnMut()>::new(move || {
                finish(&completer, Err(NodeError::Decode(source.clone())));
            })
        };
        image.set_onload(Some(onload.as_ref().unchecked_ref()));
        image.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        image.set_src(source);

        self.nodes.insert(key, image.clone().unchecked_into());
        self.loads.insert(
            key,
            ImageLoad {
                image,
                _onload: onload,
                _onerror: onerror,
            },
        );
        Ok(pending)
    }

    fn build_markup(&mut self, key: NodeKey, markup: &str) -> Result<PendingNode, JsValue> {
        let el = self.create_node_element("div")?;
        el.set_inner_html(markup);
        self.nodes.insert(key, el);
        Ok(PendingNode::ready())
    }
}

fn finish(completer: &RefCell<Option<NodeCompleter>>, result: Result<(), NodeError>) {
    if let Some(completer) = completer.borrow_mut().take()
        && !completer.complete(result)
    {
        log::debug!("image finished loading after its node was dropped");
    }
}

impl Surfaces for WebSurfaces {
    fn create_raster(&mut self, key: NodeKey) -> Box<dyn RasterSurface> {
        match CanvasSurface::new(&self.document) {
            Ok(surface) => {
                self.nodes.insert(key, surface.canvas.clone().unchecked_into());
                Box::new(surface)
            }
            Err(err) => {
                log::warn!("cannot create a 2d canvas for {key:?}: {err:?}");
                Box::new(NullRaster)
            }
        }
    }

    fn build_node(
        &mut self,
        key: NodeKey,
        primitive: &RenderPrimitive,
        transition: Duration,
    ) -> PendingNode {
        let built = match primitive {
            RenderPrimitive::Image {
                source, opacity, ..
            } => self.build_image(key, source, *opacity, transition),
            RenderPrimitive::Markup { markup, .. } => self.build_markup(key, markup),
            RenderPrimitive::Arc { .. } | RenderPrimitive::Poly { .. } => {
                return PendingNode::failed(NodeError::Unsupported);
            }
        };
        built.unwrap_or_else(|err| {
            log::debug!("building {key:?} failed: {err:?}");
            PendingNode::failed(NodeError::Unsupported)
        })
    }

    fn discard_node(&mut self, key: NodeKey) {
        if let Some(load) = self.loads.remove(&key) {
            load.image.set_onload(None);
            load.image.set_onerror(None);
        }
        if let Some(el) = self.nodes.remove(key) {
            el.remove();
        }
    }
}

/// A layer's raster surface backed by a 2d canvas.
struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    drawn: bool,
}

impl CanvasSurface {
    fn new(document: &Document) -> Result<Self, JsValue> {
        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        canvas.set_class_name(NODE_CLASS);
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into()?;
        Ok(Self {
            canvas,
            ctx,
            drawn: false,
        })
    }

    fn trace_arc(
        &self,
        center: Point,
        radius: f64,
        start: f64,
        end: f64,
        clockwise: bool,
    ) -> Result<(), JsValue> {
        self.ctx.begin_path();
        let sweep = end - start;
        if sweep >= TAU || sweep <= -TAU {
            self.ctx.arc(center.x, center.y, radius, 0.0, TAU)?;
        } else {
            // A sector: apex at the center.
            self.ctx.move_to(center.x, center.y);
            self.ctx
                .arc_with_anticlockwise(center.x, center.y, radius, start, end, !clockwise)?;
            self.ctx.close_path();
        }
        Ok(())
    }

    fn trace_rings(&self, rings: &[alloc::vec::Vec<Point>], closed: bool) {
        self.ctx.begin_path();
        for ring in rings {
            let mut points = ring.iter();
            let Some(first) = points.next() else {
                continue;
            };
            self.ctx.move_to(first.x, first.y);
            for p in points {
                self.ctx.line_to(p.x, p.y);
            }
            if closed {
                self.ctx.close_path();
            }
        }
    }

    fn paint(&self, style: &Style, fillable: bool) {
        if fillable && let Some(fill) = style.fill {
            self.ctx.set_fill_style_str(&css::color(fill));
            self.ctx
                .fill_with_canvas_winding_rule(CanvasWindingRule::Evenodd);
        }
        if let Some(stroke) = style.stroke {
            self.ctx.set_stroke_style_str(&css::color(stroke.color));
            self.ctx.set_line_width(stroke.width);
            self.ctx.stroke();
        }
    }
}

impl RasterSurface for CanvasSurface {
    fn reset(&mut self, bbox: Rect, resolution: f64, size: Size) {
        let (width, height) = canvas_size(size);
        // Resizing a canvas also clears it.
        if self.canvas.width() != width || self.canvas.height() != height {
            self.canvas.set_width(width);
            self.canvas.set_height(height);
        }
        let origin = canvas_origin(bbox, resolution);
        if let Err(err) = self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0) {
            log::debug!("cannot reset canvas transform: {err:?}");
        }
        self.ctx
            .clear_rect(0.0, 0.0, f64::from(width), f64::from(height));
        if let Err(err) = self
            .ctx
            .set_transform(1.0, 0.0, 0.0, 1.0, origin.x, origin.y)
        {
            log::debug!("cannot anchor canvas at {origin:?}: {err:?}");
        }
        self.drawn = false;
    }

    fn draw(&mut self, primitive: &RenderPrimitive) {
        let result = match primitive {
            RenderPrimitive::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                clockwise,
                style,
            } => self
                .trace_arc(*center, *radius, *start_angle, *end_angle, *clockwise)
                .map(|()| self.paint(style, true)),
            RenderPrimitive::Poly {
                rings,
                closed,
                style,
            } => {
                self.trace_rings(rings, *closed);
                self.paint(style, *closed);
                Ok(())
            }
            RenderPrimitive::Image { .. } | RenderPrimitive::Markup { .. } => return,
        };
        match result {
            Ok(()) => self.drawn = true,
            Err(err) => log::debug!("canvas rejected a primitive: {err:?}"),
        }
    }

    fn is_empty(&self) -> bool {
        !self.drawn
    }
}

/// Stand-in when no canvas can be created. Never holds anything.
struct NullRaster;

impl RasterSurface for NullRaster {
    fn reset(&mut self, _bbox: Rect, _resolution: f64, _size: Size) {}

    fn draw(&mut self, _primitive: &RenderPrimitive) {}

    fn is_empty(&self) -> bool {
        true
    }
}

/// Offset from pixel space to canvas space: the canvas' top-left is the
/// top-left corner of `bbox`.
fn canvas_origin(bbox: Rect, resolution: f64) -> Vec2 {
    Vec2::new(-bbox.x0 / resolution, bbox.y1 / resolution)
}

/// Bitmap size for a surface size; negative and non-finite sizes are empty.
#[expect(
    clippy::cast_possible_truncation,
    reason = "clamped to the u32 range; sizes are whole CSS pixels"
)]
fn canvas_size(size: Size) -> (u32, u32) {
    let clamp = |v: f64| {
        if v.is_finite() && v > 0.0 {
            v.min(f64::from(u32::MAX)) as u32
        } else {
            0
        }
    };
    (clamp(size.width), clamp(size.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_origin_maps_bbox_corner_to_zero() {
        let bbox = Rect::new(-128.0, -128.0, 128.0, 128.0);
        let origin = canvas_origin(bbox, 1.0);
        // The pixel-space position of the bbox' top-left corner.
        let corner = Point::new(-128.0, -128.0);
        assert_eq!(corner + origin, Point::ORIGIN);
        // World (10, 10) is pixel (10, -10).
        assert_eq!(Point::new(10.0, -10.0) + origin, Point::new(138.0, 118.0));
    }

    #[test]
    fn canvas_size_clamps() {
        assert_eq!(canvas_size(Size::new(256.0, 100.0)), (256, 100));
        assert_eq!(canvas_size(Size::new(-1.0, f64::NAN)), (0, 0));
    }
}

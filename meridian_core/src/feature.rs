// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Features and the symbols that turn them into primitives.
//!
//! This is a deliberately small data model: enough geometry kinds to drive
//! the renderer and the hit tester. Projection between coordinate systems is
//! not performed here; symbols render features whose [`Crs`] matches the
//! requested one and produce nothing otherwise.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Rect, Size, Vec2};

use crate::geometry::world_to_pixel;
use crate::input::EventMask;
use crate::primitive::{RenderPrimitive, Stroke, Style};

/// Identifies a feature within its layer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub u64);

impl fmt::Debug for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureId({})", self.0)
    }
}

/// A coordinate reference system, identified by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Crs(pub &'static str);

impl Crs {
    /// Spherical Web Mercator.
    pub const WEB_MERCATOR: Self = Self("EPSG:3857");
    /// Unprojected plane coordinates.
    pub const PLAIN: Self = Self("plain");
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Feature geometry in world coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// A single position.
    Point(Point),
    /// A group of positions rendered as one feature.
    MultiPoint(Vec<Point>),
    /// One or more open paths.
    Polyline(Vec<Vec<Point>>),
    /// One or more closed rings.
    Polygon(Vec<Vec<Point>>),
}

impl Geometry {
    /// World bounding box of the geometry.
    #[must_use]
    pub fn bbox(&self) -> Rect {
        let mut bbox: Option<Rect> = None;
        let mut add = |p: &Point| {
            bbox = Some(bbox.map_or(Rect::from_points(*p, *p), |r| r.union_pt(*p)));
        };
        match self {
            Self::Point(p) => add(p),
            Self::MultiPoint(ps) => ps.iter().for_each(&mut add),
            Self::Polyline(paths) | Self::Polygon(paths) => {
                paths.iter().flatten().for_each(&mut add);
            }
        }
        bbox.unwrap_or(Rect::ZERO)
    }

    fn points(&self) -> &[Point] {
        match self {
            Self::Point(p) => core::slice::from_ref(p),
            Self::MultiPoint(ps) => ps,
            Self::Polyline(_) | Self::Polygon(_) => &[],
        }
    }
}

/// Turns a feature into render primitives.
///
/// Implementations must be pure: the same feature, resolution and CRS always
/// yield equal primitives.
pub trait Symbol: fmt::Debug {
    /// Renders `feature` at `resolution` for the target `crs`.
    fn render(&self, feature: &Feature, resolution: f64, crs: Crs) -> Vec<RenderPrimitive>;
}

/// A renderable, interactive map object.
#[derive(Clone, Debug)]
pub struct Feature {
    /// Identity within the owning layer.
    pub id: FeatureId,
    /// World geometry.
    pub geometry: Geometry,
    /// How the feature is drawn.
    pub symbol: Rc<dyn Symbol>,
    /// Event kinds this feature wants to receive.
    pub interest: EventMask,
    /// Coordinate system of `geometry`.
    pub crs: Crs,
}

impl Feature {
    /// Creates a feature with no event interest.
    pub fn new(id: FeatureId, geometry: Geometry, symbol: Rc<dyn Symbol>, crs: Crs) -> Self {
        Self {
            id,
            geometry,
            symbol,
            interest: EventMask::empty(),
            crs,
        }
    }

    /// Sets the event kinds this feature responds to.
    #[must_use]
    pub fn with_interest(mut self, interest: EventMask) -> Self {
        self.interest = interest;
        self
    }

    /// Renders the feature through its symbol.
    #[must_use]
    pub fn render(&self, resolution: f64, crs: Crs) -> Vec<RenderPrimitive> {
        if crs != self.crs {
            return Vec::new();
        }
        self.symbol.render(self, resolution, crs)
    }
}

/// Draws points as circles of `size` pixels in diameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointSymbol {
    /// Diameter in pixels.
    pub size: f64,
    /// Stroke and fill.
    pub style: Style,
}

impl Symbol for PointSymbol {
    fn render(&self, feature: &Feature, resolution: f64, _crs: Crs) -> Vec<RenderPrimitive> {
        feature
            .geometry
            .points()
            .iter()
            .map(|p| {
                RenderPrimitive::circle(world_to_pixel(*p, resolution), self.size / 2.0, self.style)
            })
            .collect()
    }
}

/// Draws polylines, and polygon outlines, as open or closed strokes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolylineSymbol {
    /// Line styling.
    pub stroke: Stroke,
}

impl Symbol for PolylineSymbol {
    fn render(&self, feature: &Feature, resolution: f64, _crs: Crs) -> Vec<RenderPrimitive> {
        let (paths, closed) = match &feature.geometry {
            Geometry::Polyline(paths) => (paths, false),
            Geometry::Polygon(rings) => (rings, true),
            Geometry::Point(_) | Geometry::MultiPoint(_) => return Vec::new(),
        };
        vec![RenderPrimitive::Poly {
            rings: project_rings(paths, resolution),
            closed,
            style: Style {
                stroke: Some(self.stroke),
                fill: None,
            },
        }]
    }
}

/// Draws polygons with fill and outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolygonSymbol {
    /// Stroke and fill.
    pub style: Style,
}

impl Symbol for PolygonSymbol {
    fn render(&self, feature: &Feature, resolution: f64, _crs: Crs) -> Vec<RenderPrimitive> {
        let Geometry::Polygon(rings) = &feature.geometry else {
            return Vec::new();
        };
        vec![RenderPrimitive::Poly {
            rings: project_rings(rings, resolution),
            closed: true,
            style: self.style,
        }]
    }
}

/// Draws an image at each point.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSymbol {
    /// Image URL.
    pub source: String,
    /// Image size in pixels.
    pub size: Size,
    /// Position of the anchor inside the image, in pixels from its top-left.
    pub anchor: Vec2,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f64,
    /// Keep the on-screen size while zooming.
    pub fixed_size: bool,
}

impl Symbol for ImageSymbol {
    fn render(&self, feature: &Feature, resolution: f64, _crs: Crs) -> Vec<RenderPrimitive> {
        feature
            .geometry
            .points()
            .iter()
            .map(|p| RenderPrimitive::Image {
                source: self.source.clone(),
                rect: anchored_rect(*p, resolution, self.size, self.anchor),
                opacity: self.opacity,
                fixed_size: self.fixed_size,
            })
            .collect()
    }
}

/// Places a piece of markup at each point.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkupSymbol {
    /// Markup source.
    pub markup: String,
    /// Box size in pixels.
    pub size: Size,
    /// Position of the anchor inside the box.
    pub anchor: Vec2,
    /// Keep the on-screen size while zooming.
    pub fixed_size: bool,
}

impl Symbol for MarkupSymbol {
    fn render(&self, feature: &Feature, resolution: f64, _crs: Crs) -> Vec<RenderPrimitive> {
        feature
            .geometry
            .points()
            .iter()
            .map(|p| RenderPrimitive::Markup {
                markup: self.markup.clone(),
                rect: anchored_rect(*p, resolution, self.size, self.anchor),
                fixed_size: self.fixed_size,
            })
            .collect()
    }
}

fn project_rings(rings: &[Vec<Point>], resolution: f64) -> Vec<Vec<Point>> {
    rings
        .iter()
        .map(|ring| ring.iter().map(|p| world_to_pixel(*p, resolution)).collect())
        .collect()
}

fn anchored_rect(p: Point, resolution: f64, size: Size, anchor: Vec2) -> Rect {
    Rect::from_origin_size(world_to_pixel(p, resolution) - anchor, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Color;

    fn point_feature(p: Point, size: f64) -> Feature {
        let symbol = PointSymbol {
            size,
            style: Style {
                stroke: None,
                fill: Some(Color::BLACK),
            },
        };
        Feature::new(FeatureId(1), Geometry::Point(p), Rc::new(symbol), Crs::PLAIN)
    }

    #[test]
    fn point_symbol_flips_y_and_halves_size() {
        let f = point_feature(Point::new(10.0, 10.0), 10.0);
        let prims = f.render(1.0, Crs::PLAIN);
        assert_eq!(prims.len(), 1);
        let RenderPrimitive::Arc { center, radius, .. } = &prims[0] else {
            panic!("expected an arc, got {:?}", prims[0]);
        };
        assert_eq!(*center, Point::new(10.0, -10.0));
        assert_eq!(*radius, 5.0);
    }

    #[test]
    fn multipoint_renders_one_arc_per_point() {
        let mut f = point_feature(Point::ORIGIN, 4.0);
        f.geometry = Geometry::MultiPoint(vec![
            Point::ORIGIN,
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ]);
        assert_eq!(f.render(1.0, Crs::PLAIN).len(), 3);
    }

    #[test]
    fn mismatched_crs_renders_nothing() {
        let f = point_feature(Point::ORIGIN, 4.0);
        assert!(f.render(1.0, Crs::WEB_MERCATOR).is_empty());
    }

    #[test]
    fn image_rect_is_anchored() {
        let symbol = ImageSymbol {
            source: String::from("pin.png"),
            size: Size::new(20.0, 30.0),
            anchor: Vec2::new(10.0, 30.0),
            opacity: 1.0,
            fixed_size: true,
        };
        let f = Feature::new(
            FeatureId(7),
            Geometry::Point(Point::new(100.0, 50.0)),
            Rc::new(symbol),
            Crs::PLAIN,
        );
        let prims = f.render(2.0, Crs::PLAIN);
        let RenderPrimitive::Image { rect, .. } = &prims[0] else {
            panic!("expected an image");
        };
        assert_eq!(*rect, Rect::new(40.0, -55.0, 60.0, -25.0));
    }

    #[test]
    fn geometry_bbox_spans_all_rings() {
        let g = Geometry::Polygon(vec![
            vec![Point::new(0.0, 0.0), Point::new(4.0, 1.0)],
            vec![Point::new(-2.0, 3.0)],
        ]);
        assert_eq!(g.bbox(), Rect::new(-2.0, 0.0, 4.0, 3.0));
    }
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render primitives.
//!
//! A [`RenderPrimitive`] is an immutable description of one visual unit in
//! pixel space (see [`geometry`](crate::geometry)) for the resolution it was
//! rendered at. Primitives are shared through the [`Primitive`] handle, whose
//! equality is identity: a feature that redraws produces new handles, and the
//! layer renderer diffs frames by handle.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::f64::consts::TAU;
use core::hash::{Hash, Hasher};
use core::ops::Deref;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{BezPath, Line, ParamCurveNearest as _, Point, Rect, Shape as _, Size};

use crate::geometry::{pixel_to_world, world_to_pixel};

/// An 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha, 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color with alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Outline styling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    /// Line color.
    pub color: Color,
    /// Line width in pixels.
    pub width: f64,
}

/// Stroke and fill of a vector primitive. Either may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Style {
    /// Outline, if any.
    pub stroke: Option<Stroke>,
    /// Fill color, if any.
    pub fill: Option<Color>,
}

impl Style {
    fn half_stroke(&self) -> f64 {
        self.stroke.map_or(0.0, |s| s.width / 2.0)
    }
}

/// Which kind of surface a primitive is painted on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Painted onto the layer's shared raster surface, redrawn every rerender.
    Raster,
    /// Built once into its own retained node.
    Retained,
}

/// One drawable unit, in pixel space.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderPrimitive {
    /// A circle or circular sector.
    Arc {
        /// Center in pixel space.
        center: Point,
        /// Radius in pixels.
        radius: f64,
        /// Start angle in radians, measured in pixel space (y down).
        start_angle: f64,
        /// End angle in radians.
        end_angle: f64,
        /// Sweep direction from start to end.
        clockwise: bool,
        /// Stroke and fill.
        style: Style,
    },
    /// A polyline (`closed == false`) or a polygon with any number of rings.
    Poly {
        /// Rings in pixel space. Polygons use the even-odd rule across rings.
        rings: Vec<Vec<Point>>,
        /// Whether rings are closed and fillable.
        closed: bool,
        /// Stroke and fill.
        style: Style,
    },
    /// A positioned image.
    Image {
        /// Image URL or data URI.
        source: String,
        /// Placement in pixel space.
        rect: Rect,
        /// Opacity in `0.0..=1.0`.
        opacity: f64,
        /// Keep the on-screen size constant while the map zooms.
        fixed_size: bool,
    },
    /// A positioned piece of host markup (HTML on the web).
    Markup {
        /// Markup source.
        markup: String,
        /// Placement in pixel space.
        rect: Rect,
        /// Keep the on-screen size constant while the map zooms.
        fixed_size: bool,
    },
}

impl RenderPrimitive {
    /// Creates a filled or stroked full circle.
    #[must_use]
    pub fn circle(center: Point, radius: f64, style: Style) -> Self {
        Self::Arc {
            center,
            radius,
            start_angle: 0.0,
            end_angle: TAU,
            clockwise: true,
            style,
        }
    }

    /// Which surface this primitive is painted on.
    #[must_use]
    pub fn surface_kind(&self) -> SurfaceKind {
        match self {
            Self::Arc { .. } | Self::Poly { .. } => SurfaceKind::Raster,
            Self::Image { .. } | Self::Markup { .. } => SurfaceKind::Retained,
        }
    }

    /// Whether the primitive keeps its on-screen size while zooming.
    #[must_use]
    pub fn is_fixed_size(&self) -> bool {
        match self {
            Self::Image { fixed_size, .. } | Self::Markup { fixed_size, .. } => *fixed_size,
            Self::Arc { .. } | Self::Poly { .. } => false,
        }
    }

    /// Pixel-space bounds, including stroke width.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Arc {
                center,
                radius,
                style,
                ..
            } => {
                let r = radius + style.half_stroke();
                Rect::from_center_size(*center, Size::new(2.0 * r, 2.0 * r))
            }
            Self::Poly { rings, style, .. } => {
                let mut points = rings.iter().flatten();
                let Some(first) = points.next() else {
                    return Rect::ZERO;
                };
                let rect = points.fold(Rect::from_points(*first, *first), |r, p| {
                    r.union_pt(*p)
                });
                let hw = style.half_stroke();
                rect.inflate(hw, hw)
            }
            Self::Image { rect, .. } | Self::Markup { rect, .. } => *rect,
        }
    }

    /// Geometric containment test in the primitive's own pixel space.
    ///
    /// `tolerance` grows the hit area by that many pixels.
    #[must_use]
    pub fn contains(&self, p: Point, tolerance: f64) -> bool {
        match self {
            Self::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                clockwise,
                style,
            } => {
                let d = p - *center;
                let dist = d.hypot();
                let in_reach = if style.fill.is_some() {
                    dist <= radius + style.half_stroke() + tolerance
                } else {
                    (dist - radius).abs() <= style.half_stroke() + tolerance
                };
                in_reach && angle_in_sweep(d.atan2(), *start_angle, *end_angle, *clockwise)
            }
            Self::Poly {
                rings,
                closed,
                style,
            } => {
                if *closed && style.fill.is_some() && inside_rings(rings, p) {
                    return true;
                }
                let reach = style.half_stroke() + tolerance;
                near_rings(rings, *closed, p, reach)
            }
            Self::Image { rect, .. } | Self::Markup { rect, .. } => {
                rect.inflate(tolerance, tolerance).contains(p)
            }
        }
    }

    /// Hit test against a world point.
    ///
    /// `render_res` is the resolution the primitive was rendered at and
    /// `view_res` the current viewport resolution; `tolerance` is in screen
    /// pixels. Fixed-size primitives are tested at their on-screen size.
    #[must_use]
    pub fn hit_test(&self, world: Point, render_res: f64, view_res: f64, tolerance: f64) -> bool {
        if self.is_fixed_size() {
            let rect = self.bounds();
            let anchor = world_to_pixel(pixel_to_world(rect.origin(), render_res), view_res);
            let on_screen = Rect::from_origin_size(anchor, rect.size());
            return on_screen
                .inflate(tolerance, tolerance)
                .contains(world_to_pixel(world, view_res));
        }
        let p = world_to_pixel(world, render_res);
        self.contains(p, tolerance * view_res / render_res)
    }
}

fn angle_in_sweep(angle: f64, start: f64, end: f64, clockwise: bool) -> bool {
    let sweep = if clockwise { end - start } else { start - end };
    if sweep.abs() >= TAU {
        return true;
    }
    let (from, span) = if clockwise {
        (start, sweep.rem_euclid(TAU))
    } else {
        (end, sweep.rem_euclid(TAU))
    };
    (angle - from).rem_euclid(TAU) <= span
}

fn inside_rings(rings: &[Vec<Point>], p: Point) -> bool {
    let mut inside = false;
    for ring in rings {
        let Some((first, rest)) = ring.split_first() else {
            continue;
        };
        let mut path = BezPath::new();
        path.move_to(*first);
        for pt in rest {
            path.line_to(*pt);
        }
        path.close_path();
        if path.winding(p) != 0 {
            inside = !inside;
        }
    }
    inside
}

fn near_rings(rings: &[Vec<Point>], closed: bool, p: Point, reach: f64) -> bool {
    let reach_sq = reach * reach;
    for ring in rings {
        if ring.len() == 1 {
            if (ring[0] - p).hypot2() <= reach_sq {
                return true;
            }
            continue;
        }
        let closing = closed
            .then(|| ring.last().zip(ring.first()))
            .flatten()
            .map(|(a, b)| Line::new(*a, *b));
        let segments = ring
            .windows(2)
            .map(|w| Line::new(w[0], w[1]))
            .chain(closing);
        for seg in segments {
            if seg.nearest(p, 1e-9).distance_sq <= reach_sq {
                return true;
            }
        }
    }
    false
}

/// Shared, identity-compared handle to a [`RenderPrimitive`].
///
/// Two handles are equal only if they point at the same allocation, so a
/// redrawn feature never compares equal to its previous primitives even when
/// the geometry is unchanged.
#[derive(Clone, Debug)]
pub struct Primitive(Rc<RenderPrimitive>);

impl Primitive {
    /// Wraps a primitive in a new handle.
    #[must_use]
    pub fn new(primitive: RenderPrimitive) -> Self {
        Self(Rc::new(primitive))
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl From<RenderPrimitive> for Primitive {
    fn from(primitive: RenderPrimitive) -> Self {
        Self::new(primitive)
    }
}

impl Deref for Primitive {
    type Target = RenderPrimitive;

    fn deref(&self) -> &RenderPrimitive {
        &self.0
    }
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Primitive {}

impl Hash for Primitive {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinate spaces and the viewport.
//!
//! Three spaces are in play:
//!
//! - **World**: map units in the map's coordinate system, y grows upwards.
//! - **Pixel**: world divided by a resolution with y flipped, i.e.
//!   `(x / R, -y / R)`. Render primitives carry geometry in this space for
//!   the resolution they were rendered at.
//! - **Screen**: pixels relative to the top-left corner of the host surface.
//!   For a viewport with bounding box `bbox`, `screen = pixel - pixel(top_left)`.
//!
//! [`screen_transform`] maps a container's local pixel space onto the screen
//! for the current viewport. It is the only transform a container ever gets.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect, Size, TranslateScale, Vec2};

/// Converts a world point to pixel space at `resolution`.
#[inline]
#[must_use]
pub fn world_to_pixel(p: Point, resolution: f64) -> Point {
    Point::new(p.x / resolution, -p.y / resolution)
}

/// Converts a pixel-space point at `resolution` back to world space.
#[inline]
#[must_use]
pub fn pixel_to_world(p: Point, resolution: f64) -> Point {
    Point::new(p.x * resolution, -p.y * resolution)
}

/// Converts a pixel-space rectangle at `resolution` to a world rectangle.
#[must_use]
pub fn pixel_rect_to_world(rect: Rect, resolution: f64) -> Rect {
    Rect::from_points(
        pixel_to_world(rect.origin(), resolution),
        pixel_to_world(Point::new(rect.x1, rect.y1), resolution),
    )
}

/// Converts a world rectangle to pixel space at `resolution`.
#[must_use]
pub fn world_rect_to_pixel(rect: Rect, resolution: f64) -> Rect {
    Rect::from_points(
        world_to_pixel(rect.origin(), resolution),
        world_to_pixel(Point::new(rect.x1, rect.y1), resolution),
    )
}

/// How container translations are rounded before they reach the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PixelSnapping {
    /// Keep fractional translations. Used when the host composites at
    /// sub-pixel precision.
    #[default]
    SubPixel,
    /// Round translations to whole device pixels.
    WholePixels,
}

/// The visible part of the map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// World point at the center of the host surface.
    pub center: Point,
    /// World units per screen pixel.
    pub resolution: f64,
    /// Host surface size in pixels.
    pub size: Size,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(center: Point, resolution: f64, size: Size) -> Self {
        Self {
            center,
            resolution,
            size,
        }
    }

    /// Whether the host surface has a non-zero area.
    #[must_use]
    pub fn is_displayed(&self) -> bool {
        self.size.width > 0.0 && self.size.height > 0.0
    }

    /// The world rectangle covered by the viewport.
    #[must_use]
    pub fn bbox(&self) -> Rect {
        let half = Vec2::new(
            self.size.width * self.resolution / 2.0,
            self.size.height * self.resolution / 2.0,
        );
        Rect::from_points(self.center - half, self.center + half)
    }

    /// Maps a screen point to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, p: Point) -> Point {
        let bbox = self.bbox();
        Point::new(
            bbox.x0 + p.x * self.resolution,
            bbox.y1 - p.y * self.resolution,
        )
    }

    /// Maps a world point to screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, p: Point) -> Point {
        let bbox = self.bbox();
        Point::new(
            (p.x - bbox.x0) / self.resolution,
            (bbox.y1 - p.y) / self.resolution,
        )
    }

    /// Maps a screen point to pixel space at the viewport resolution.
    #[must_use]
    pub fn screen_to_pixel(&self, p: Point) -> Point {
        world_to_pixel(self.screen_to_world(p), self.resolution)
    }

    /// Whether `other` differs from `self` by less than
    /// `resolution * epsilon` in center and resolution, with the same size.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        let tol = self.resolution * epsilon;
        self.size == other.size
            && (self.center - other.center).hypot() < tol
            && (self.resolution - other.resolution).abs() < tol
    }
}

/// Computes the screen transform of a container.
///
/// The container holds a snapshot rendered at `container_res` whose local
/// pixel origin is the top-left corner of `container_bbox`. The result maps
/// that local space onto the screen of a viewport showing `view_bbox` at
/// `view_res`. The scale is `container_res / view_res` and the translation is
/// the offset between the two top-left corners in screen pixels.
#[must_use]
pub fn screen_transform(
    container_bbox: Rect,
    container_res: f64,
    view_bbox: Rect,
    view_res: f64,
    snapping: PixelSnapping,
) -> TranslateScale {
    let scale = container_res / view_res;
    let mut translation = Vec2::new(
        (container_bbox.x0 - view_bbox.x0) / view_res,
        (view_bbox.y1 - container_bbox.y1) / view_res,
    );
    if snapping == PixelSnapping::WholePixels {
        translation = translation.round();
    }
    TranslateScale::new(translation, scale)
}

/// Returns the ladder entry closest to `resolution` on a logarithmic scale,
/// or `resolution` itself when the ladder is empty.
#[must_use]
pub fn nearest_resolution(resolution: f64, ladder: &[f64]) -> f64 {
    let mut best = resolution;
    let mut best_dist = f64::INFINITY;
    for &r in ladder {
        let dist = (r / resolution).ln().abs();
        if dist < best_dist {
            best = r;
            best_dist = dist;
        }
    }
    best
}

/// Returns the next resolution one zoom step away from `resolution`.
///
/// With a ladder, this is the closest entry strictly finer (`zoom_in`) or
/// coarser than the current resolution, clamped to the ladder's ends. Without
/// one, the resolution is divided or multiplied by `factor`.
#[must_use]
pub fn step_resolution(resolution: f64, ladder: &[f64], zoom_in: bool, factor: f64) -> f64 {
    if ladder.is_empty() {
        return if zoom_in {
            resolution / factor
        } else {
            resolution * factor
        };
    }
    // Entries within this relative distance count as the current step.
    let tol = resolution * 1e-6;
    let candidate = if zoom_in {
        ladder
            .iter()
            .copied()
            .filter(|&r| r < resolution - tol)
            .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.max(r))))
    } else {
        ladder
            .iter()
            .copied()
            .filter(|&r| r > resolution + tol)
            .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.min(r))))
    };
    candidate.unwrap_or_else(|| nearest_resolution(resolution, ladder))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(Point::ORIGIN, 1.0, Size::new(256.0, 256.0))
    }

    #[test]
    fn pixel_space_flips_y() {
        assert_eq!(
            world_to_pixel(Point::new(10.0, 10.0), 1.0),
            Point::new(10.0, -10.0)
        );
        assert_eq!(
            world_to_pixel(Point::new(10.0, 10.0), 2.0),
            Point::new(5.0, -5.0)
        );
    }

    #[test]
    fn bbox_is_centered() {
        let bbox = viewport().bbox();
        assert_eq!(bbox, Rect::new(-128.0, -128.0, 128.0, 128.0));
    }

    #[test]
    fn screen_world_round_trip() {
        let vp = Viewport::new(Point::new(500.0, -20.0), 3.5, Size::new(640.0, 480.0));
        let p = Point::new(17.25, 401.0);
        let back = vp.world_to_screen(vp.screen_to_world(p));
        assert!((back - p).hypot() < 1e-9, "{back:?}");
    }

    #[test]
    fn screen_origin_is_top_left() {
        let vp = viewport();
        assert_eq!(vp.screen_to_world(Point::ORIGIN), Point::new(-128.0, 128.0));
        assert_eq!(
            vp.world_to_screen(Point::new(10.0, 10.0)),
            Point::new(138.0, 118.0)
        );
        assert_eq!(
            vp.screen_to_pixel(Point::new(138.0, 118.0)),
            Point::new(10.0, -10.0)
        );
    }

    #[test]
    fn approx_eq_uses_resolution_scaled_tolerance() {
        let a = viewport();
        let mut b = a;
        b.center.x += 1e-4;
        assert!(a.approx_eq(&b, 1e-3));
        b.center.x += 1e-2;
        assert!(!a.approx_eq(&b, 1e-3));
    }

    #[test]
    fn identical_bboxes_give_identity_transform() {
        let bbox = viewport().bbox();
        let t = screen_transform(bbox, 1.0, bbox, 1.0, PixelSnapping::SubPixel);
        assert_eq!(t.translation, Vec2::ZERO);
        assert_eq!(t.scale, 1.0);
    }

    #[test]
    fn panned_view_translates_container() {
        let c = viewport().bbox();
        // Viewport moved 10.4 units right and 3 units up.
        let v = c + Vec2::new(10.4, 3.0);
        let t = screen_transform(c, 1.0, v, 1.0, PixelSnapping::SubPixel);
        assert!((t.translation.x + 10.4).abs() < 1e-9);
        assert!((t.translation.y - 3.0).abs() < 1e-9);

        let snapped = screen_transform(c, 1.0, v, 1.0, PixelSnapping::WholePixels);
        assert_eq!(snapped.translation, Vec2::new(-10.0, 3.0));
    }

    #[test]
    fn zoomed_view_scales_container() {
        let c = viewport().bbox();
        let v = Viewport::new(Point::ORIGIN, 0.5, Size::new(256.0, 256.0)).bbox();
        let t = screen_transform(c, 1.0, v, 0.5, PixelSnapping::SubPixel);
        assert_eq!(t.scale, 2.0);
        // The container's top-left corner lies 128 screen px outside the view.
        assert_eq!(t.translation, Vec2::new(-128.0, -128.0));
    }

    #[test]
    fn ladder_snapping() {
        let ladder = [1.0, 2.0, 4.0, 8.0];
        assert_eq!(nearest_resolution(2.7, &ladder), 2.0);
        assert_eq!(nearest_resolution(3.0, &ladder), 4.0);
        assert_eq!(nearest_resolution(3.0, &[]), 3.0);
        assert_eq!(step_resolution(2.0, &ladder, true, 2.0), 1.0);
        assert_eq!(step_resolution(2.0, &ladder, false, 2.0), 4.0);
        assert_eq!(step_resolution(1.0, &ladder, true, 2.0), 1.0);
        assert_eq!(step_resolution(3.0, &[], true, 2.0), 1.5);
    }
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CSS value formatting.

use alloc::format;
use alloc::string::String;

use kurbo::{Rect, TranslateScale};
use meridian_core::primitive::Color;
use web_sys::CssStyleDeclaration;

/// Sets an inline style property, logging a rejected value.
pub(crate) fn set_property(style: &CssStyleDeclaration, property: &str, value: &str) {
    if let Err(err) = style.set_property(property, value) {
        log::debug!("cannot set {property}: {value}: {err:?}");
    }
}

/// Removes an inline style property, logging a failure.
pub(crate) fn remove_property(style: &CssStyleDeclaration, property: &str) {
    if let Err(err) = style.remove_property(property) {
        log::debug!("cannot remove {property}: {err:?}");
    }
}

/// `translate(..) scale(..)` for a container transform. Assumes
/// `transform-origin: 0 0`.
pub(crate) fn transform(t: TranslateScale) -> String {
    format!(
        "translate({}px, {}px) scale({})",
        t.translation.x, t.translation.y, t.scale
    )
}

/// Cancels a container scale for a fixed-size child.
pub(crate) fn counter_scale(scale: f64) -> String {
    if scale > 0.0 && scale.is_finite() {
        format!("scale({})", 1.0 / scale)
    } else {
        String::from("none")
    }
}

/// `rgba(..)` for a color.
pub(crate) fn color(c: Color) -> String {
    let alpha = f64::from(c.a) / 255.0;
    format!("rgba({}, {}, {}, {alpha})", c.r, c.g, c.b)
}

/// Absolute placement of a node inside its container.
pub(crate) struct Placement {
    pub(crate) left: String,
    pub(crate) top: String,
    pub(crate) width: String,
    pub(crate) height: String,
}

pub(crate) fn placement(rect: Rect) -> Placement {
    Placement {
        left: format!("{}px", rect.x0),
        top: format!("{}px", rect.y0),
        width: format!("{}px", rect.width()),
        height: format!("{}px", rect.height()),
    }
}

/// `opacity ..ms` transition for fading in retained nodes.
pub(crate) fn fade_transition(millis: f64) -> String {
    format!("opacity {millis}ms")
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use kurbo::{Point, Size, Vec2};
    use meridian_core::geometry::{PixelSnapping, Viewport, screen_transform};

    /// Applies a `translate(..) scale(..)` string to `p` the way a browser
    /// does with `transform-origin: 0 0`.
    fn apply(css: &str, p: Point) -> Point {
        let numbers: Vec<f64> = css
            .split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().unwrap())
            .collect();
        let &[tx, ty, scale] = numbers.as_slice() else {
            panic!("unexpected transform {css}");
        };
        Point::new(tx + scale * p.x, ty + scale * p.y)
    }

    #[test]
    fn transform_puts_translation_first() {
        let t = TranslateScale::new(Vec2::new(-10.5, 3.0), 2.0);
        assert_eq!(transform(t), "translate(-10.5px, 3px) scale(2)");
    }

    #[test]
    fn zoom_preview_keeps_its_anchor_in_place() {
        let size = Size::new(256.0, 256.0);
        let painted = Viewport::new(Point::ORIGIN, 1.0, size);
        for (anchor, zoomed) in [
            // Zoom 2x around the middle.
            (Point::new(128.0, 128.0), Viewport::new(Point::ORIGIN, 0.5, size)),
            // Zoom 2x around the top-left quarter point.
            (
                Point::new(64.0, 64.0),
                Viewport::new(Point::new(-32.0, 32.0), 0.5, size),
            ),
        ] {
            let preview = screen_transform(
                painted.bbox(),
                painted.resolution,
                zoomed.bbox(),
                zoomed.resolution,
                PixelSnapping::SubPixel,
            );
            let moved = apply(&transform(preview), anchor);
            assert!((moved - anchor).hypot() < 1e-9, "{anchor:?} -> {moved:?}");
        }
    }

    #[test]
    fn counter_scale_inverts() {
        assert_eq!(counter_scale(4.0), "scale(0.25)");
        assert_eq!(counter_scale(0.0), "none");
    }

    #[test]
    fn color_alpha_is_normalized() {
        assert_eq!(color(Color::rgba(255, 0, 10, 0)), "rgba(255, 0, 10, 0)");
        assert_eq!(color(Color::BLACK), "rgba(0, 0, 0, 1)");
    }

    #[test]
    fn placement_uses_rect_origin_and_size() {
        let p = placement(Rect::new(1.0, 2.0, 11.0, 32.0));
        assert_eq!(p.left, "1px");
        assert_eq!(p.top, "2px");
        assert_eq!(p.width, "10px");
        assert_eq!(p.height, "30px");
    }
}

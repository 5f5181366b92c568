// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gesture state and two-finger pinch math.

use kurbo::{Point, Vec2};

use super::event::{EventTarget, TouchPoint};

/// Where the dispatcher is in a pointer or touch interaction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) enum Gesture {
    /// Nothing pressed.
    #[default]
    Idle,
    /// Pressed but not moved past the drag threshold yet.
    Pressed {
        /// Where the press started.
        origin: Point,
        /// Latest pointer position.
        last: Point,
    },
    /// A single-pointer drag.
    Dragging {
        /// Who receives the drag events.
        target: EventTarget,
        /// Where the press started.
        origin: Point,
        /// Position of the previous drag event.
        last: Point,
    },
    /// Two fingers down; the map is pinched and panned.
    MultiTouch {
        /// First tracked touch at its previous position.
        a: TouchPoint,
        /// Second tracked touch at its previous position.
        b: TouchPoint,
    },
}

/// What one two-finger move does to the view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PinchStep {
    /// Translate by a screen delta.
    Pan(Vec2),
    /// Scale by `factor` around the screen point `anchor`, which stays put.
    Zoom {
        /// Ratio of the new finger distance to the old one.
        factor: f64,
        /// Fixed point of the motion.
        anchor: Point,
    },
}

/// Computes the view change for two touches moving from `(a0, b0)` to
/// `(a1, b1)`.
///
/// The scale is the ratio of finger distances. The anchor is the point that
/// moves least under that scale: the least-squares solution of
/// `p1 = f + k (p0 - f)` over both fingers. When `|1 - k|` is below
/// `epsilon` the anchor is undefined and the step is a pan by the mean
/// finger delta.
#[must_use]
pub fn pinch_step(a0: Point, b0: Point, a1: Point, b1: Point, epsilon: f64) -> PinchStep {
    let before = (a0 - b0).hypot();
    let after = (a1 - b1).hypot();
    let pan = ((a1 - a0) + (b1 - b0)) / 2.0;
    if before <= 0.0 {
        return PinchStep::Pan(pan);
    }
    let k = after / before;
    if !k.is_finite() || k <= 0.0 || (1.0 - k).abs() < epsilon {
        return PinchStep::Pan(pan);
    }
    let sum1 = a1.to_vec2() + b1.to_vec2();
    let sum0 = a0.to_vec2() + b0.to_vec2();
    let anchor = (sum1 - sum0 * k) / (2.0 * (1.0 - k));
    PinchStep::Zoom {
        factor: k,
        anchor: anchor.to_point(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spreading_fingers_zooms_around_their_center() {
        let step = pinch_step(
            Point::new(90.0, 100.0),
            Point::new(110.0, 100.0),
            Point::new(80.0, 100.0),
            Point::new(120.0, 100.0),
            1e-6,
        );
        let PinchStep::Zoom { factor, anchor } = step else {
            panic!("expected a zoom, got {step:?}");
        };
        assert!((factor - 2.0).abs() < 1e-12);
        assert!((anchor - Point::new(100.0, 100.0)).hypot() < 1e-9);
    }

    #[test]
    fn parallel_motion_is_a_pan() {
        let step = pinch_step(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(5.0, 3.0),
            Point::new(15.0, 3.0),
            1e-6,
        );
        assert_eq!(step, PinchStep::Pan(Vec2::new(5.0, 3.0)));
    }

    #[test]
    fn coincident_fingers_pan() {
        let p = Point::new(4.0, 4.0);
        let step = pinch_step(p, p, Point::new(6.0, 4.0), Point::new(6.0, 4.0), 1e-6);
        assert_eq!(step, PinchStep::Pan(Vec2::new(2.0, 0.0)));
    }

    #[test]
    fn anchor_is_exact_for_similarity_motion() {
        let f = Point::new(30.0, -12.0);
        let k = 0.75;
        let map = |p: Point| f + (p - f) * k;
        let (a0, b0) = (Point::new(0.0, 0.0), Point::new(40.0, 25.0));
        let PinchStep::Zoom { factor, anchor } = pinch_step(a0, b0, map(a0), map(b0), 1e-6) else {
            panic!("expected a zoom");
        };
        assert!((factor - k).abs() < 1e-12);
        assert!((anchor - f).hypot() < 1e-9);
    }
}

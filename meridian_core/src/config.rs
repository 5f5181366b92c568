// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tunables for the compositor and the input dispatcher.

use alloc::vec::Vec;

use crate::geometry::PixelSnapping;
use crate::time::Duration;

/// Compositor tunables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositorConfig {
    /// Maximum relative difference between the latest container's resolution
    /// and the viewport resolution before a new container is created.
    ///
    /// A value of `0.01` re-bases once the scale factor leaves `[0.99, 1.01]`.
    pub scale_drift: f64,
    /// Viewport changes smaller than `resolution * viewport_epsilon` world
    /// units are treated as no change.
    pub viewport_epsilon: f64,
    /// How container translations are rounded.
    pub snapping: PixelSnapping,
    /// Quiet period for layers in delayed-update mode.
    pub delayed_update_quiet: Duration,
    /// Extra screen pixels around a primitive that still count as a hit.
    pub hit_tolerance: f64,
}

impl CompositorConfig {
    /// Default compositor configuration.
    pub const DEFAULT: Self = Self {
        scale_drift: 0.01,
        viewport_epsilon: 1e-3,
        snapping: PixelSnapping::SubPixel,
        delayed_update_quiet: Duration::from_millis(500),
        hit_tolerance: 2.0,
    };
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Input dispatcher tunables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputConfig {
    /// A pointer must move strictly more than this many pixels from its
    /// down position before the press turns into a drag.
    pub drag_threshold: f64,
    /// Maximum time between two clicks of a double-click.
    pub double_click_interval: Duration,
    /// Maximum distance in pixels between two clicks of a double-click.
    pub double_click_distance: f64,
    /// Resolution factor applied per wheel notch when the map has no
    /// resolution ladder.
    pub wheel_zoom_factor: f64,
    /// Pinch scale changes with `|1 - k|` below this are treated as a pure
    /// two-finger pan.
    pub touch_pinch_epsilon: f64,
}

impl InputConfig {
    /// Default input configuration.
    pub const DEFAULT: Self = Self {
        drag_threshold: 2.0,
        double_click_interval: Duration::from_millis(300),
        double_click_distance: 4.0,
        wheel_zoom_factor: 2.0,
        touch_pinch_epsilon: 1e-6,
    };
}

impl Default for InputConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything a [`Map`](crate::map::Map) needs at construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapConfig {
    /// Compositor tunables.
    pub compositor: CompositorConfig,
    /// Input tunables.
    pub input: InputConfig,
    /// Allowed resolutions, used for snapping and zoom steps. Empty means
    /// free zoom.
    pub resolutions: Vec<f64>,
}

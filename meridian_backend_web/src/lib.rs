// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser host for meridian maps.
//!
//! - [`MapHost`]: mounts a [`Map`](meridian_core::map::Map) into a DOM element
//!   and owns everything below
//! - [`RafLoop`]: `requestAnimationFrame` frame driver that skips busy frames
//! - [`DomPresenter`]: mirrors the container store into `<div>` elements
//! - [`WebSurfaces`]: canvas raster surfaces and `<img>`/markup nodes
//! - [`InputListeners`]: mouse, wheel and touch listeners
//! - [`StyleRegistry`]: explicit, idempotent stylesheet installation

#![no_std]

extern crate alloc;

mod css;
mod host;
mod input;
mod presenter;
mod raf;
mod style;
mod surfaces;

pub use host::{HostConfig, MapHost};
pub use input::InputListeners;
pub use meridian_core::presenter::Presenter;
pub use presenter::DomPresenter;
pub use raf::{FrameStatus, RafLoop};
pub use style::{MAP_STYLE, MAP_STYLE_NAME, StyleRegistry};
pub use surfaces::{NodeTable, WebSurfaces};

use meridian_core::time::{Clock, HostTime};

/// Returns the current host time from `performance.now()`.
#[must_use]
pub fn now() -> HostTime {
    HostTime::from_millis_f64(raf::performance_now())
}

/// [`Clock`] over `performance.now()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebClock;

impl Clock for WebClock {
    fn now(&self) -> HostTime {
        now()
    }
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract.
//!
//! The core never touches a platform visual tree. A host provides:
//!
//! - **Tick source**: produces [`FrameTick`] values from a platform mechanism
//!   such as `requestAnimationFrame`. Not abstracted by a trait.
//! - **Clock**: a [`Clock`](crate::time::Clock) reading the platform's
//!   monotonic time, used for trace timestamps.
//! - **Surfaces**: a [`Surfaces`](crate::surface::Surfaces) implementation
//!   that creates raster bitmaps and builds retained nodes.
//! - **Presenter**: a [`Presenter`] that mirrors containers and their
//!   children into the platform tree.
//! - **Input**: translation of platform events into
//!   [`InputEvent`](crate::input::InputEvent)s fed to
//!   [`Map::handle_input`](crate::map::Map::handle_input).
//!
//! [`FrameTick`]: crate::time::FrameTick

use crate::container::{ContainerChanges, ContainerStore};

/// Applies container changes to a platform-native presentation tree.
///
/// # Frame loop pseudocode
///
/// ```rust,ignore
/// fn on_frame(tick: FrameTick) {
///     map.tick(&tick, viewport_size, &mut surfaces, &mut tracer);
///     let changes = map.evaluate();
///     presenter.apply(map.compositor().containers(), &changes);
/// }
/// ```
pub trait Presenter {
    /// Applies `changes`, reading current container state from `store`.
    ///
    /// Expected order: detach nodes, remove containers, add containers,
    /// update transforms, then reorder container children.
    fn apply(&mut self, store: &ContainerStore, changes: &ContainerChanges);
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport containers.
//!
//! A container is a screen-anchored, scaled group of nodes that all share one
//! `(bbox, resolution)` snapshot. When the viewport pans or zooms, only the
//! container's own screen transform is recomputed; its children keep their
//! container-local placement. This keeps viewport changes O(containers)
//! rather than O(primitives).
//!
//! Several containers can coexist (for example while zooming, the old
//! snapshot stays visible until the new one is painted). They stack in
//! creation order and the latest one is the paint target for new nodes.

mod evaluate;
mod id;
mod store;

pub use evaluate::ContainerChanges;
pub use id::ContainerId;
pub use store::{Child, ContainerStore, Placement, StackOrder};

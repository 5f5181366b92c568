// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositing and input dispatch for interactive maps.
//!
//! `meridian_core` turns a stack of feature layers into positioned visual
//! containers and routes pointer, wheel and touch input to the features under
//! the cursor. It is `no_std` compatible (with `alloc`) and knows nothing
//! about any particular platform: hosts supply surfaces, a presenter and a
//! tick source.
//!
//! # Architecture
//!
//! ```text
//!   Host (tick source, input)
//!       │                      │
//!       ▼                      ▼
//!   Map::tick()           Map::handle_input()
//!       │                      │
//!       ▼                      ▼
//!   Compositor ◄──────── Dispatcher ──► EventHub ──► handlers
//!       │  LayerRenderer per layer
//!       ▼
//!   ContainerStore::evaluate() ──► ContainerChanges ──► Presenter::apply()
//! ```
//!
//! **[`container`]**: struct-of-arrays store of visual containers, each
//! rendered at one resolution and re-based by a screen transform as the
//! viewport moves.
//!
//! **[`compositor`]**: the per-frame pipeline. Decides when to create a new
//! container, asks each layer renderer to refresh, keeps every layer within
//! the containers it spans and collects containers nobody uses.
//!
//! **[`layer`]** and **[`feature`]**: the [`Layer`](layer::Layer) trait and the
//! stock [`FeatureLayer`](layer::FeatureLayer), with symbols producing
//! [`RenderPrimitive`](primitive::RenderPrimitive)s.
//!
//! **[`input`]**: gesture recognition (click, double-click, drag, hover,
//! wheel, pinch) and scoped handler dispatch.
//!
//! **[`map`]**: the [`Map`](map::Map) facade tying everything together.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) and the zero-overhead
//! [`Tracer`](trace::Tracer) wrapper for frame instrumentation.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod compositor;
pub mod config;
pub mod container;
pub mod dirty;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod input;
pub mod layer;
pub mod map;
pub mod presenter;
pub mod primitive;
pub mod surface;
pub mod time;
pub mod trace;

mod renderer;

#[cfg(test)]
mod testing;

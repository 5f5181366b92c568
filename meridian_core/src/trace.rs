// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the compositor calls at each stage of a frame. All method bodies default
//! to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink` and an optional
//! [`Clock`] used to timestamp phases. When the `trace` feature is **off**,
//! every `Tracer` method compiles to nothing (zero overhead). When **on**,
//! each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).

use kurbo::{Point, Rect, Size};

use crate::container::ContainerId;
use crate::error::LayerError;
use crate::layer::LayerKey;
use crate::time::{Clock, FrameTick, HostTime};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Identifies a phase of a compositor frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Viewport change detection, container creation and re-basing.
    Viewport,
    /// Layer renderer updates.
    Render,
    /// Stacking repair and container collection.
    Overlay,
    /// Host-side application of container changes.
    Present,
}

/// Emitted when the compositor starts a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTickEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Host time at the frame callback.
    pub now: HostTime,
    /// Viewport center at the start of the frame.
    pub center: Point,
    /// Viewport resolution at the start of the frame.
    pub resolution: f64,
    /// Host surface size.
    pub size: Size,
}

impl FrameTickEvent {
    /// Creates the event for a tick and viewport.
    #[must_use]
    pub fn new(tick: &FrameTick, center: Point, resolution: f64, size: Size) -> Self {
        Self {
            frame_index: tick.frame_index,
            now: tick.now,
            center,
            resolution,
            size,
        }
    }
}

/// Emitted at the start of a frame phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseBeginEvent {
    /// Frame the phase belongs to.
    pub frame_index: u64,
    /// Which phase.
    pub phase: PhaseKind,
    /// When the phase started.
    pub timestamp: HostTime,
}

/// Emitted at the end of a frame phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseEndEvent {
    /// Frame the phase belongs to.
    pub frame_index: u64,
    /// Which phase.
    pub phase: PhaseKind,
    /// When the phase ended.
    pub timestamp: HostTime,
}

/// Emitted when a container is created or destroyed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerEvent {
    /// Frame during which it happened.
    pub frame_index: u64,
    /// The container.
    pub container: ContainerId,
    /// World bbox of the container snapshot.
    pub bbox: Rect,
    /// Resolution of the container snapshot.
    pub resolution: f64,
}

/// Emitted after a layer rerendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerRenderEvent {
    /// Frame during which the layer rerendered.
    pub frame_index: u64,
    /// The layer.
    pub layer: LayerKey,
    /// Primitives the layer returned.
    pub primitives: u32,
    /// Retained nodes whose construction started.
    pub nodes_built: u32,
    /// Nodes detached because their primitive went away.
    pub nodes_removed: u32,
}

/// Emitted when a layer failed to produce primitives.
#[derive(Clone, Copy, Debug)]
pub struct LayerFailedEvent<'a> {
    /// Frame during which the layer failed.
    pub frame_index: u64,
    /// The layer.
    pub layer: LayerKey,
    /// What went wrong.
    pub error: &'a LayerError,
}

/// Per-frame counters, emitted at the end of every frame that ran.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    /// The frame.
    pub frame_index: u64,
    /// Host time at the frame callback.
    pub now: HostTime,
    /// Live containers after the frame.
    pub containers: u32,
    /// Containers created during the frame.
    pub containers_created: u32,
    /// Containers destroyed during the frame.
    pub containers_destroyed: u32,
    /// Layers that rerendered.
    pub layers_rendered: u32,
    /// Layers that failed.
    pub layers_failed: u32,
    /// Layers whose nodes moved to the latest container.
    pub layers_migrated: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a frame starts.
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        _ = e;
    }

    /// Called at the beginning of a frame phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a frame phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a container is created.
    fn on_container_created(&mut self, e: &ContainerEvent) {
        _ = e;
    }

    /// Called when a container is destroyed.
    fn on_container_destroyed(&mut self, e: &ContainerEvent) {
        _ = e;
    }

    /// Called after a layer rerendered.
    fn on_layer_rendered(&mut self, e: &LayerRenderEvent) {
        _ = e;
    }

    /// Called when a layer failed to render.
    fn on_layer_failed(&mut self, e: &LayerFailedEvent<'_>) {
        _ = e;
    }

    /// Called with the per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(feature = "trace")]
    clock: Option<&'a dyn Clock>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident, $e:expr) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    ///
    /// Without a clock, phases are stamped with the frame's tick time.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self {
                sink: Some(sink),
                clock: None,
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Sets the clock used to timestamp phases.
    #[inline]
    #[must_use]
    pub fn with_clock(self, clock: &'a dyn Clock) -> Self {
        #[cfg(feature = "trace")]
        {
            Self {
                clock: Some(clock),
                ..self
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = clock;
            self
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self {
                sink: None,
                clock: None,
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Reads the clock, or returns `fallback` when there is none.
    #[inline]
    #[must_use]
    pub fn now_or(&self, fallback: HostTime) -> HostTime {
        #[cfg(feature = "trace")]
        if let Some(clock) = self.clock {
            return clock.now();
        }
        fallback
    }

    /// Emits a [`FrameTickEvent`].
    #[inline]
    pub fn frame_tick(&mut self, e: &FrameTickEvent) {
        dispatch!(self, on_frame_tick, e);
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        dispatch!(self, on_phase_begin, e);
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        dispatch!(self, on_phase_end, e);
    }

    /// Emits a container-created [`ContainerEvent`].
    #[inline]
    pub fn container_created(&mut self, e: &ContainerEvent) {
        dispatch!(self, on_container_created, e);
    }

    /// Emits a container-destroyed [`ContainerEvent`].
    #[inline]
    pub fn container_destroyed(&mut self, e: &ContainerEvent) {
        dispatch!(self, on_container_destroyed, e);
    }

    /// Emits a [`LayerRenderEvent`].
    #[inline]
    pub fn layer_rendered(&mut self, e: &LayerRenderEvent) {
        dispatch!(self, on_layer_rendered, e);
    }

    /// Emits a [`LayerFailedEvent`].
    #[inline]
    pub fn layer_failed(&mut self, e: &LayerFailedEvent<'_>) {
        dispatch!(self, on_layer_failed, e);
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        dispatch!(self, on_frame_summary, s);
    }
}

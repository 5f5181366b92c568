// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Host times
//! are printed in milliseconds.

use std::io::Write;

use meridian_core::time::HostTime;
use meridian_core::trace::{
    ContainerEvent, FrameSummary, FrameTickEvent, LayerFailedEvent, LayerRenderEvent,
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn ms(t: HostTime) -> f64 {
    t.micros() as f64 / 1000.0
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Viewport => "viewport",
        PhaseKind::Render => "render",
        PhaseKind::Overlay => "overlay",
        PhaseKind::Present => "present",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        let _ = writeln!(
            self.writer,
            "[tick] frame={} now={:.3}ms center=({:.3}, {:.3}) res={} size={}x{}",
            e.frame_index,
            ms(e.now),
            e.center.x,
            e.center.y,
            e.resolution,
            e.size.width,
            e.size.height,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.3}ms",
            e.frame_index,
            phase_name(e.phase),
            ms(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.3}ms",
            e.frame_index,
            phase_name(e.phase),
            ms(e.timestamp),
        );
    }

    fn on_container_created(&mut self, e: &ContainerEvent) {
        let _ = writeln!(
            self.writer,
            "[container:new] frame={} {:?} res={} bbox={:?}",
            e.frame_index, e.container, e.resolution, e.bbox,
        );
    }

    fn on_container_destroyed(&mut self, e: &ContainerEvent) {
        let _ = writeln!(
            self.writer,
            "[container:gc] frame={} {:?} res={}",
            e.frame_index, e.container, e.resolution,
        );
    }

    fn on_layer_rendered(&mut self, e: &LayerRenderEvent) {
        let _ = writeln!(
            self.writer,
            "[layer] frame={} layer={} primitives={} built={} removed={}",
            e.frame_index,
            e.layer.raw(),
            e.primitives,
            e.nodes_built,
            e.nodes_removed,
        );
    }

    fn on_layer_failed(&mut self, e: &LayerFailedEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[layer:FAILED] frame={} layer={} {}",
            e.frame_index,
            e.layer.raw(),
            e.error,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} containers={} (+{} -{}) rendered={} failed={} migrated={}",
            s.frame_index,
            s.containers,
            s.containers_created,
            s.containers_destroyed,
            s.layers_rendered,
            s.layers_failed,
            s.layers_migrated,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Size};
    use meridian_core::error::LayerError;
    use meridian_core::time::FrameTick;

    use crate::testing::layer_key;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_tick() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        let tick = FrameTick::new(HostTime(1_500), 1);
        sink.on_frame_tick(&FrameTickEvent::new(
            &tick,
            Point::new(10.0, -4.0),
            2.0,
            Size::new(256.0, 256.0),
        ));
        let output = output(sink);
        assert!(output.contains("[tick]"), "got: {output}");
        assert!(output.contains("frame=1"), "got: {output}");
        assert!(output.contains("now=1.500ms"), "got: {output}");
    }

    #[test]
    fn pretty_print_failure_includes_message() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        let error = LayerError::new("tile server down");
        sink.on_layer_failed(&LayerFailedEvent {
            frame_index: 3,
            layer: layer_key(),
            error: &error,
        });
        sink.on_frame_summary(&FrameSummary {
            frame_index: 3,
            layers_failed: 1,
            ..FrameSummary::default()
        });
        let output = output(sink);
        assert!(output.contains("tile server down"), "got: {output}");
        assert!(output.contains("failed=1"), "got: {output}");
    }
}

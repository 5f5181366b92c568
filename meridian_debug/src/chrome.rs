// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format export.
//!
//! [`ChromeTraceSink`] collects events as they arrive and
//! [`write_to`](ChromeTraceSink::write_to) writes them as a
//! [Chrome Trace Event Format][spec] JSON array.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use meridian_core::trace::{
    ContainerEvent, FrameSummary, FrameTickEvent, LayerFailedEvent, LayerRenderEvent,
    PhaseBeginEvent, PhaseEndEvent, TraceSink,
};

/// Collects trace events for export to `chrome://tracing` or
/// [Perfetto](https://ui.perfetto.dev/).
///
/// Host times are microseconds already, so timestamps are written as-is.
/// Instants without a timestamp of their own use the last frame tick.
#[derive(Debug, Default)]
pub struct ChromeTraceSink {
    events: Vec<Value>,
    last_ts: u64,
}

impl ChromeTraceSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drops all collected events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Writes the collected events as a JSON array.
    pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, &self.events)?;
        Ok(())
    }

    fn instant(&mut self, name: &str, cat: &str, ts: u64, args: Value) {
        self.events.push(json!({
            "ph": "i",
            "name": name,
            "cat": cat,
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "s": "g",
            "args": args,
        }));
    }
}

impl TraceSink for ChromeTraceSink {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        self.last_ts = e.now.micros();
        self.instant(
            "FrameTick",
            "Frame",
            e.now.micros(),
            json!({
                "frame_index": e.frame_index,
                "center": [e.center.x, e.center.y],
                "resolution": e.resolution,
                "size": [e.size.width, e.size.height],
            }),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.events.push(json!({
            "ph": "B",
            "name": format!("{:?}", e.phase),
            "cat": "Frame",
            "ts": e.timestamp.micros(),
            "pid": 0,
            "tid": 0,
            "args": { "frame_index": e.frame_index },
        }));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.events.push(json!({
            "ph": "E",
            "name": format!("{:?}", e.phase),
            "cat": "Frame",
            "ts": e.timestamp.micros(),
            "pid": 0,
            "tid": 0,
            "args": { "frame_index": e.frame_index },
        }));
    }

    fn on_container_created(&mut self, e: &ContainerEvent) {
        self.instant(
            "ContainerCreated",
            "Container",
            self.last_ts,
            json!({
                "frame_index": e.frame_index,
                "container": format!("{:?}", e.container),
                "resolution": e.resolution,
                "bbox": [e.bbox.x0, e.bbox.y0, e.bbox.x1, e.bbox.y1],
            }),
        );
    }

    fn on_container_destroyed(&mut self, e: &ContainerEvent) {
        self.instant(
            "ContainerDestroyed",
            "Container",
            self.last_ts,
            json!({
                "frame_index": e.frame_index,
                "container": format!("{:?}", e.container),
                "resolution": e.resolution,
            }),
        );
    }

    fn on_layer_rendered(&mut self, e: &LayerRenderEvent) {
        self.instant(
            "LayerRendered",
            "Layer",
            self.last_ts,
            json!({
                "frame_index": e.frame_index,
                "layer": e.layer.raw(),
                "primitives": e.primitives,
                "nodes_built": e.nodes_built,
                "nodes_removed": e.nodes_removed,
            }),
        );
    }

    fn on_layer_failed(&mut self, e: &LayerFailedEvent<'_>) {
        self.instant(
            "LayerFailed",
            "Layer",
            self.last_ts,
            json!({
                "frame_index": e.frame_index,
                "layer": e.layer.raw(),
                "error": e.error.message(),
            }),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.instant(
            "FrameSummary",
            "Summary",
            s.now.micros(),
            json!({
                "frame_index": s.frame_index,
                "containers": s.containers,
                "containers_created": s.containers_created,
                "containers_destroyed": s.containers_destroyed,
                "layers_rendered": s.layers_rendered,
                "layers_failed": s.layers_failed,
                "layers_migrated": s.layers_migrated,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Rect, Size};
    use meridian_core::config::MapConfig;
    use meridian_core::map::Map;
    use meridian_core::primitive::RenderPrimitive;
    use meridian_core::surface::{NodeKey, PendingNode, RasterSurface, Surfaces};
    use meridian_core::time::{Duration, FrameTick, HostTime};
    use meridian_core::trace::{PhaseKind, Tracer};

    #[derive(Default)]
    struct Raster {
        drawn: bool,
    }

    impl RasterSurface for Raster {
        fn reset(&mut self, _bbox: Rect, _resolution: f64, _size: Size) {
            self.drawn = false;
        }

        fn draw(&mut self, _primitive: &RenderPrimitive) {
            self.drawn = true;
        }

        fn is_empty(&self) -> bool {
            !self.drawn
        }
    }

    struct NoSurfaces;

    impl Surfaces for NoSurfaces {
        fn create_raster(&mut self, _key: NodeKey) -> Box<dyn RasterSurface> {
            Box::new(Raster::default())
        }

        fn build_node(
            &mut self,
            _key: NodeKey,
            _primitive: &RenderPrimitive,
            _transition: Duration,
        ) -> PendingNode {
            PendingNode::ready()
        }

        fn discard_node(&mut self, _key: NodeKey) {}
    }

    #[test]
    fn phases_pair_up() {
        let mut sink = ChromeTraceSink::new();
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Render,
            timestamp: HostTime(1_000),
        });
        sink.on_phase_end(&PhaseEndEvent {
            frame_index: 0,
            phase: PhaseKind::Render,
            timestamp: HostTime(1_100),
        });

        let mut out = Vec::new();
        sink.write_to(&mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["ph"], "B");
        assert_eq!(parsed[0]["name"], "Render");
        assert_eq!(parsed[1]["ph"], "E");
        assert_eq!(parsed[1]["ts"], 1_100);
    }

    #[test]
    fn records_a_real_frame() {
        let mut map = Map::new(MapConfig::default()).unwrap();
        let mut sink = ChromeTraceSink::new();
        let mut tracer = Tracer::new(&mut sink);
        map.tick(
            &FrameTick::new(HostTime(16_000), 0),
            Size::new(256.0, 256.0),
            &mut NoSurfaces,
            &mut tracer,
        );

        let mut out = Vec::new();
        sink.write_to(&mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["name"], "FrameTick");
        assert_eq!(parsed[0]["ts"], 16_000);
        assert!(parsed.iter().any(|e| e["name"] == "ContainerCreated"));
        let last = parsed.last().unwrap();
        assert_eq!(last["name"], "FrameSummary");
        assert_eq!(last["args"]["containers"], 1);
    }

    #[test]
    fn empty_sink_writes_an_empty_array() {
        let mut out = Vec::new();
        ChromeTraceSink::new().write_to(&mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert!(parsed.is_empty());
    }
}

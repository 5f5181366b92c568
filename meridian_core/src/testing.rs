// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles shared by the unit tests.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;

use kurbo::{Rect, Size};

use crate::error::LayerError;
use crate::layer::{Layer, LayerRender};
use crate::primitive::{RenderPrimitive, SurfaceKind};
use crate::surface::{NodeCompleter, NodeKey, PendingNode, RasterSurface, Surfaces};
use crate::time::Duration;

/// Counts draws; shares the total with its [`TestSurfaces`].
struct CountingRaster {
    drawn: usize,
    total: Rc<Cell<usize>>,
}

impl RasterSurface for CountingRaster {
    fn reset(&mut self, _bbox: Rect, _resolution: f64, _size: Size) {
        self.drawn = 0;
    }

    fn draw(&mut self, primitive: &RenderPrimitive) {
        if primitive.surface_kind() == SurfaceKind::Raster {
            self.drawn += 1;
            self.total.set(self.total.get() + 1);
        }
    }

    fn is_empty(&self) -> bool {
        self.drawn == 0
    }
}

/// Records node traffic. Builds resolve immediately unless `deferred`, in
/// which case the completers are kept for the test to resolve.
#[derive(Default)]
pub(crate) struct TestSurfaces {
    pub(crate) rasters: Vec<NodeKey>,
    pub(crate) built: Vec<NodeKey>,
    pub(crate) discarded: Vec<NodeKey>,
    pub(crate) deferred: bool,
    pub(crate) completers: Vec<(NodeKey, NodeCompleter)>,
    draws: Rc<Cell<usize>>,
}

impl TestSurfaces {
    /// Raster draw calls across all surfaces.
    pub(crate) fn raster_draws(&self) -> usize {
        self.draws.get()
    }
}

impl Surfaces for TestSurfaces {
    fn create_raster(&mut self, key: NodeKey) -> Box<dyn RasterSurface> {
        self.rasters.push(key);
        Box::new(CountingRaster {
            drawn: 0,
            total: self.draws.clone(),
        })
    }

    fn build_node(
        &mut self,
        key: NodeKey,
        _primitive: &RenderPrimitive,
        _transition: Duration,
    ) -> PendingNode {
        self.built.push(key);
        if self.deferred {
            let (pending, completer) = PendingNode::channel();
            self.completers.push((key, completer));
            pending
        } else {
            PendingNode::ready()
        }
    }

    fn discard_node(&mut self, key: NodeKey) {
        self.discarded.push(key);
    }
}

/// A layer whose every render fails.
#[derive(Debug, Default)]
pub(crate) struct FailingLayer {
    pub(crate) revision: u64,
}

impl Layer for FailingLayer {
    fn renders(&self, _bbox: Rect, _resolution: f64) -> Result<Vec<LayerRender>, LayerError> {
        Err(LayerError::new("tile source unavailable"))
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layers: the source of render primitives.
//!
//! The compositor only sees the [`Layer`] trait. A layer answers "what is
//! visible in this bbox at this resolution" with a list of [`LayerRender`]s and
//! reports changes by bumping its [`revision`](Layer::revision). The layer
//! renderer compares revisions every frame; there is no callback
//! registration.
//!
//! [`FeatureLayer`] is the stock implementation backed by a list of
//! [`Feature`]s. It caches each feature's primitives per resolution, so
//! unchanged features keep primitive identity across frames and the renderer
//! does no work for them.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashMap;
use kurbo::Rect;

use crate::error::{LayerError, SetupError};
use crate::feature::{Crs, Feature, FeatureId};
use crate::input::EventMask;
use crate::primitive::Primitive;
use crate::time::Duration;

/// Identifies a layer within a map. Assigned when the layer is added.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerKey(pub(crate) u32);

impl LayerKey {
    /// Returns the raw key value (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerKey({})", self.0)
    }
}

/// One primitive a layer wants on screen, with the feature it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerRender {
    /// The owning feature.
    pub feature: FeatureId,
    /// The primitive.
    pub primitive: Primitive,
    /// Event kinds the feature wants to receive.
    pub interest: EventMask,
}

/// A source of render primitives.
pub trait Layer {
    /// Returns the primitives visible in `bbox` at `resolution`, bottom to top.
    ///
    /// Must be side-effect-free from the caller's point of view and fast
    /// enough to call once per frame.
    fn renders(&self, bbox: Rect, resolution: f64) -> Result<Vec<LayerRender>, LayerError>;

    /// Monotonically increasing change counter. Any change visible through
    /// [`renders`](Self::renders) must bump it.
    fn revision(&self) -> u64;

    /// Whether successive changes should be coalesced into one rerender after
    /// a quiet period.
    fn delayed_update(&self) -> bool {
        false
    }

    /// Fade-in hint for new retained nodes.
    fn transition_time(&self) -> Duration {
        Duration::ZERO
    }

    /// Whether the layer is shown at all.
    fn is_displayed(&self) -> bool {
        true
    }
}

/// Shared handle to a layer.
pub type LayerHandle = Rc<RefCell<dyn Layer>>;

/// Margin around the viewport, in screen pixels, in which features are still
/// rendered so that strokes and markers at the edge are not clipped.
const VISIBILITY_MARGIN_PX: f64 = 64.0;

#[derive(Debug)]
struct CacheEntry {
    resolution: f64,
    primitives: Vec<Primitive>,
}

/// A layer holding an ordered list of features.
#[derive(Debug)]
pub struct FeatureLayer {
    crs: Crs,
    features: Vec<Feature>,
    cache: RefCell<HashMap<FeatureId, CacheEntry>>,
    revision: u64,
    delayed_update: bool,
    transition_time: Duration,
    displayed: bool,
}

impl FeatureLayer {
    /// Creates an empty layer in the given coordinate system.
    #[must_use]
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            features: Vec::new(),
            cache: RefCell::new(HashMap::new()),
            revision: 0,
            delayed_update: false,
            transition_time: Duration::ZERO,
            displayed: true,
        }
    }

    /// Coordinate system of the layer.
    #[must_use]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Appends a feature on top of the existing ones.
    ///
    /// A feature with an id already present replaces the old one in place.
    pub fn add(&mut self, feature: Feature) -> Result<(), SetupError> {
        if feature.crs != self.crs {
            return Err(SetupError::CrsMismatch {
                expected: self.crs,
                found: feature.crs,
            });
        }
        self.cache.get_mut().remove(&feature.id);
        if let Some(slot) = self.features.iter_mut().find(|f| f.id == feature.id) {
            *slot = feature;
        } else {
            self.features.push(feature);
        }
        self.bump();
        Ok(())
    }

    /// Removes a feature.
    pub fn remove(&mut self, id: FeatureId) -> Option<Feature> {
        let pos = self.features.iter().position(|f| f.id == id)?;
        self.cache.get_mut().remove(&id);
        self.bump();
        Some(self.features.remove(pos))
    }

    /// Returns a feature by id.
    #[must_use]
    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Mutates a feature in place and schedules its redraw.
    ///
    /// Returns `false` if no feature has that id.
    pub fn update(&mut self, id: FeatureId, f: impl FnOnce(&mut Feature)) -> bool {
        let Some(feature) = self.features.iter_mut().find(|feat| feat.id == id) else {
            return false;
        };
        f(feature);
        self.redraw(id);
        true
    }

    /// Invalidates all cached primitives of one feature.
    pub fn redraw(&mut self, id: FeatureId) {
        self.cache.get_mut().remove(&id);
        self.bump();
    }

    /// Features in draw order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Enables or disables delayed-update mode.
    pub fn set_delayed_update(&mut self, delayed: bool) {
        self.delayed_update = delayed;
    }

    /// Sets the fade-in hint for new nodes.
    pub fn set_transition_time(&mut self, time: Duration) {
        self.transition_time = time;
    }

    /// Shows or hides the layer.
    pub fn set_displayed(&mut self, displayed: bool) {
        if self.displayed != displayed {
            self.displayed = displayed;
            self.bump();
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

impl Layer for FeatureLayer {
    fn renders(&self, bbox: Rect, resolution: f64) -> Result<Vec<LayerRender>, LayerError> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(LayerError::new("resolution must be positive"));
        }
        let margin = VISIBILITY_MARGIN_PX * resolution;
        let window = bbox.inflate(margin, margin);
        let mut cache = self.cache.borrow_mut();
        let mut out = Vec::new();
        for feature in &self.features {
            if !touches(window, feature.geometry.bbox()) {
                continue;
            }
            let entry = cache.entry(feature.id).or_insert_with(|| CacheEntry {
                resolution: f64::NAN,
                primitives: Vec::new(),
            });
            if entry.resolution != resolution {
                entry.resolution = resolution;
                entry.primitives = feature
                    .render(resolution, self.crs)
                    .into_iter()
                    .map(Primitive::new)
                    .collect();
            }
            out.extend(entry.primitives.iter().map(|primitive| LayerRender {
                feature: feature.id,
                primitive: primitive.clone(),
                interest: feature.interest,
            }));
        }
        Ok(out)
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn delayed_update(&self) -> bool {
        self.delayed_update
    }

    fn transition_time(&self) -> Duration {
        self.transition_time
    }

    fn is_displayed(&self) -> bool {
        self.displayed
    }
}

/// Closed-interval overlap, so zero-area point boxes still count.
fn touches(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Geometry, PointSymbol};
    use crate::primitive::{Color, Style};
    use kurbo::Point;

    fn dot(id: u64, x: f64, y: f64) -> Feature {
        let symbol = PointSymbol {
            size: 10.0,
            style: Style {
                stroke: None,
                fill: Some(Color::BLACK),
            },
        };
        Feature::new(
            FeatureId(id),
            Geometry::Point(Point::new(x, y)),
            Rc::new(symbol),
            Crs::PLAIN,
        )
    }

    const VIEW: Rect = Rect::new(-128.0, -128.0, 128.0, 128.0);

    #[test]
    fn unchanged_features_keep_primitive_identity() {
        let mut layer = FeatureLayer::new(Crs::PLAIN);
        layer.add(dot(1, 0.0, 0.0)).unwrap();
        let a = layer.renders(VIEW, 1.0).unwrap();
        let b = layer.renders(VIEW, 1.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn redraw_replaces_primitives_and_bumps_revision() {
        let mut layer = FeatureLayer::new(Crs::PLAIN);
        layer.add(dot(1, 0.0, 0.0)).unwrap();
        layer.add(dot(2, 5.0, 5.0)).unwrap();
        let before = layer.renders(VIEW, 1.0).unwrap();
        let rev = layer.revision();
        layer.redraw(FeatureId(1));
        assert!(layer.revision() > rev);
        let after = layer.renders(VIEW, 1.0).unwrap();
        assert_ne!(before[0].primitive, after[0].primitive);
        assert_eq!(before[1].primitive, after[1].primitive);
    }

    #[test]
    fn resolution_change_rerenders() {
        let mut layer = FeatureLayer::new(Crs::PLAIN);
        layer.add(dot(1, 0.0, 0.0)).unwrap();
        let a = layer.renders(VIEW, 1.0).unwrap();
        let b = layer.renders(VIEW, 2.0).unwrap();
        assert_ne!(a[0].primitive, b[0].primitive);
    }

    #[test]
    fn features_far_outside_are_culled() {
        let mut layer = FeatureLayer::new(Crs::PLAIN);
        layer.add(dot(1, 0.0, 0.0)).unwrap();
        // Within the 64 px margin.
        layer.add(dot(2, 150.0, 0.0)).unwrap();
        layer.add(dot(3, 1000.0, 0.0)).unwrap();
        let ids: Vec<FeatureId> = layer
            .renders(VIEW, 1.0)
            .unwrap()
            .iter()
            .map(|r| r.feature)
            .collect();
        assert_eq!(ids, [FeatureId(1), FeatureId(2)]);
    }

    #[test]
    fn crs_mismatch_is_rejected() {
        let mut layer = FeatureLayer::new(Crs::WEB_MERCATOR);
        let err = layer.add(dot(1, 0.0, 0.0)).unwrap_err();
        assert_eq!(
            err,
            SetupError::CrsMismatch {
                expected: Crs::WEB_MERCATOR,
                found: Crs::PLAIN,
            }
        );
    }

    #[test]
    fn hidden_toggle_bumps_revision_once() {
        let mut layer = FeatureLayer::new(Crs::PLAIN);
        let rev = layer.revision();
        layer.set_displayed(false);
        layer.set_displayed(false);
        assert_eq!(layer.revision(), rev + 1);
        assert!(!layer.is_displayed());
    }
}

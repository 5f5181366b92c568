// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Three failure domains exist, and each gets its own type because each is
//! handled at a different place:
//!
//! - [`SetupError`] is returned from configuration calls (mounting, adding
//!   layers, setting the resolution). It is never swallowed.
//! - [`LayerError`] is returned by [`Layer::renders`](crate::layer::Layer::renders)
//!   and caught by the layer renderer, which logs it and skips the layer for
//!   the frame.
//! - [`NodeError`] is the failure side of a [`PendingNode`](crate::surface::PendingNode).
//!   A failed node is treated as "no node".
//!
//! Input handling has no error type: inconsistent event sequences are no-ops.

use alloc::string::String;

use crate::feature::Crs;

/// Configuration errors, reported at setup time.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SetupError {
    /// The mount target is missing or not attached to a document.
    #[error("invalid mount target: {0}")]
    InvalidMountTarget(String),
    /// The same layer handle was added to the map twice.
    #[error("layer is already part of this map")]
    DuplicateLayer,
    /// The layer key does not name a layer of this map.
    #[error("unknown layer {0:?}")]
    UnknownLayer(crate::layer::LayerKey),
    /// A resolution was zero, negative or not finite.
    #[error("invalid resolution {0}")]
    InvalidResolution(f64),
    /// A feature was added to a layer using a different coordinate system.
    #[error("feature uses {found} but the layer expects {expected}")]
    CrsMismatch {
        /// The coordinate system of the layer.
        expected: Crs,
        /// The coordinate system of the offending feature.
        found: Crs,
    },
}

/// A failure while producing the primitives of one layer for one frame.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("layer render failed: {message}")]
pub struct LayerError {
    message: String,
}

impl LayerError {
    /// Creates a layer error with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A failure while constructing a retained node.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    /// The node's resource could not be decoded (for example a broken image).
    #[error("failed to decode node source: {0}")]
    Decode(String),
    /// The host cannot build nodes of this kind.
    #[error("node kind is not supported by this host")]
    Unsupported,
    /// The builder was dropped before it reported a result.
    #[error("node construction was abandoned")]
    Abandoned,
}

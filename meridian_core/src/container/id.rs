// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Container identity.

use core::fmt;

/// A handle to a container in a [`ContainerStore`](super::ContainerStore).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a container is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId {
    /// Slot index into the store's arrays.
    pub(crate) idx: u32,
    /// Generation counter, must match the store's generation for this slot.
    pub(crate) generation: u32,
}

impl ContainerId {
    /// Returns the raw slot index.
    ///
    /// Presenters use it to index their own per-container state in step with
    /// [`ContainerChanges`](super::ContainerChanges).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerId({}@gen{})", self.idx, self.generation)
    }
}

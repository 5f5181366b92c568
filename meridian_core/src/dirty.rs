// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The container store uses multi-channel dirty tracking (via
//! [`understory_dirty`]) keyed by container slot. Containers have no
//! hierarchy, so every channel is local-only: marking a container never
//! dirties another one.
//!
//! [`ContainerStore::evaluate`](crate::container::ContainerStore::evaluate)
//! drains every channel and reports the result as
//! [`ContainerChanges`](crate::container::ContainerChanges).

use understory_dirty::Channel;

/// Screen transform changed (the viewport moved or zoomed).
pub const TRANSFORM: Channel = Channel::new(0);

/// Child list or child stacking changed.
pub const CONTENT: Channel = Channel::new(1);

/// A container was created or destroyed.
pub const TOPOLOGY: Channel = Channel::new(2);

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Output surfaces.
//!
//! Primitives end up on one of two kinds of surface:
//!
//! - A [`RasterSurface`], one per layer, sized to the viewport. It is reset
//!   and fully repainted on every rerender; raster content is never erased
//!   piecemeal.
//! - A retained node, one per image or markup primitive. Nodes are built once
//!   through [`Surfaces::build_node`], which returns a [`PendingNode`] because
//!   building may be asynchronous (image decode). The caller polls the pending
//!   node from later frames and decides whether the result is still wanted;
//!   dropping the [`PendingNode`] tells the builder the node is no longer
//!   needed.
//!
//! Every surface is addressed by a [`NodeKey`]. The host keeps the actual
//! visual objects (canvas elements, DOM nodes) keyed by it, and a presenter
//! moves them between containers as the
//! [`ContainerStore`](crate::container::ContainerStore) reports changes.

use alloc::boxed::Box;
use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::FusedFuture;
use kurbo::{Rect, Size};

use crate::error::NodeError;
use crate::primitive::RenderPrimitive;
use crate::time::Duration;

/// Identifies one visual node owned by the host.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(pub u64);

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey({})", self.0)
    }
}

/// Hands out unique [`NodeKey`]s.
#[derive(Debug, Default)]
pub struct NodeKeys {
    next: u64,
}

impl NodeKeys {
    /// Returns a fresh key.
    pub fn next_key(&mut self) -> NodeKey {
        let key = NodeKey(self.next);
        self.next += 1;
        key
    }
}

/// An immediate-mode bitmap shared by all raster primitives of one layer.
pub trait RasterSurface {
    /// Clears the surface and anchors it at the top-left of `bbox`.
    ///
    /// `size` is the pixel size of the bitmap. Primitives drawn afterwards
    /// use pixel coordinates at `resolution`.
    fn reset(&mut self, bbox: Rect, resolution: f64, size: Size);

    /// Paints one primitive. Retained-kind primitives are ignored.
    fn draw(&mut self, primitive: &RenderPrimitive);

    /// Whether nothing was drawn since the last reset.
    fn is_empty(&self) -> bool;
}

/// The host side of surface creation.
pub trait Surfaces {
    /// Creates the raster surface identified by `key`.
    fn create_raster(&mut self, key: NodeKey) -> Box<dyn RasterSurface>;

    /// Starts building the retained node `key` for `primitive`.
    ///
    /// `transition` is a fade-in hint.
    fn build_node(
        &mut self,
        key: NodeKey,
        primitive: &RenderPrimitive,
        transition: Duration,
    ) -> PendingNode;

    /// Releases every resource behind `key`. The node is already detached.
    fn discard_node(&mut self, key: NodeKey);
}

/// State of a [`PendingNode`] when polled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodePoll {
    /// Construction is still running.
    Pending,
    /// The node is built and can be attached.
    Ready,
    /// Construction failed; the node must not be attached.
    Failed(NodeError),
}

/// Result channel of an in-flight retained-node build.
///
/// Created in pairs with a [`NodeCompleter`] by [`PendingNode::channel`].
/// Also a [`Future`] for hosts that prefer to await it.
pub struct PendingNode {
    state: PendingState,
}

enum PendingState {
    Waiting(oneshot::Receiver<Result<(), NodeError>>),
    Done(Option<Result<(), NodeError>>),
}

impl fmt::Debug for PendingNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            PendingState::Waiting(_) => "waiting",
            PendingState::Done(Some(Ok(()))) => "ready",
            PendingState::Done(Some(Err(_))) => "failed",
            PendingState::Done(None) => "consumed",
        };
        f.debug_struct("PendingNode").field("state", &state).finish()
    }
}

impl PendingNode {
    /// Creates a pending node and the completer that resolves it.
    #[must_use]
    pub fn channel() -> (Self, NodeCompleter) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                state: PendingState::Waiting(rx),
            },
            NodeCompleter { tx },
        )
    }

    /// A node that was built synchronously.
    #[must_use]
    pub fn ready() -> Self {
        Self {
            state: PendingState::Done(Some(Ok(()))),
        }
    }

    /// A node whose construction failed synchronously.
    #[must_use]
    pub fn failed(error: NodeError) -> Self {
        Self {
            state: PendingState::Done(Some(Err(error))),
        }
    }

    /// Checks for a result without blocking.
    ///
    /// A completer dropped without reporting counts as
    /// [`NodeError::Abandoned`].
    pub fn poll_node(&mut self) -> NodePoll {
        if let PendingState::Waiting(rx) = &mut self.state {
            let result = match rx.try_recv() {
                Ok(None) => return NodePoll::Pending,
                Ok(Some(result)) => result,
                Err(oneshot::Canceled) => Err(NodeError::Abandoned),
            };
            self.state = PendingState::Done(Some(result));
        }
        match &self.state {
            PendingState::Done(Some(Ok(()))) => NodePoll::Ready,
            PendingState::Done(Some(Err(e))) => NodePoll::Failed(e.clone()),
            PendingState::Done(None) => NodePoll::Failed(NodeError::Abandoned),
            PendingState::Waiting(_) => NodePoll::Pending,
        }
    }
}

impl Future for PendingNode {
    type Output = Result<(), NodeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match &mut this.state {
            PendingState::Waiting(rx) => match Pin::new(rx).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(result) => {
                    this.state = PendingState::Done(None);
                    Poll::Ready(result.unwrap_or(Err(NodeError::Abandoned)))
                }
            },
            PendingState::Done(result) => {
                Poll::Ready(result.take().unwrap_or(Err(NodeError::Abandoned)))
            }
        }
    }
}

impl FusedFuture for PendingNode {
    fn is_terminated(&self) -> bool {
        matches!(self.state, PendingState::Done(None))
    }
}

/// The builder's end of a [`PendingNode`].
#[derive(Debug)]
pub struct NodeCompleter {
    tx: oneshot::Sender<Result<(), NodeError>>,
}

impl NodeCompleter {
    /// Whether the pending node was dropped, i.e. the result is unwanted.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.tx.is_canceled()
    }

    /// Reports the build result. Returns `false` if nobody is listening any
    /// more, in which case the builder should release the node.
    pub fn complete(self, result: Result<(), NodeError>) -> bool {
        self.tx.send(result).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn completes_after_send() {
        let (mut pending, completer) = PendingNode::channel();
        assert_eq!(pending.poll_node(), NodePoll::Pending);
        assert!(completer.complete(Ok(())));
        assert_eq!(pending.poll_node(), NodePoll::Ready);
        // Stays resolved.
        assert_eq!(pending.poll_node(), NodePoll::Ready);
    }

    #[test]
    fn reports_failure() {
        let (mut pending, completer) = PendingNode::channel();
        completer.complete(Err(NodeError::Decode(String::from("bad png"))));
        assert_eq!(
            pending.poll_node(),
            NodePoll::Failed(NodeError::Decode(String::from("bad png")))
        );
    }

    #[test]
    fn dropped_completer_is_abandoned() {
        let (mut pending, completer) = PendingNode::channel();
        drop(completer);
        assert_eq!(pending.poll_node(), NodePoll::Failed(NodeError::Abandoned));
    }

    #[test]
    fn dropped_pending_cancels_completer() {
        let (pending, completer) = PendingNode::channel();
        assert!(!completer.is_canceled());
        drop(pending);
        assert!(completer.is_canceled());
        assert!(!completer.complete(Ok(())));
    }

    #[test]
    fn awaitable() {
        let (pending, completer) = PendingNode::channel();
        completer.complete(Ok(()));
        assert_eq!(futures::executor::block_on(pending), Ok(()));
    }

    #[test]
    fn node_keys_are_unique() {
        let mut keys = NodeKeys::default();
        let a = keys.next_key();
        let b = keys.next_key();
        assert_ne!(a, b);
    }
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM presentation of the container store.
//!
//! Each container becomes an absolutely positioned `<div>` under the root
//! element, stacked in creation order. Node elements from the shared
//! [`NodeTable`] are appended to their container's `<div>` in stacking order
//! and positioned from the container-local child rectangle.

use alloc::vec::Vec;

use meridian_core::container::{Child, ContainerChanges, ContainerStore, Placement};
use meridian_core::presenter::Presenter;
use wasm_bindgen::JsCast as _;
use web_sys::HtmlElement;

use crate::css;
use crate::surfaces::NodeTable;

/// Class given to every container element.
const CONTAINER_CLASS: &str = "meridian-container";

/// Mirrors a [`ContainerStore`] into DOM elements.
pub struct DomPresenter {
    root: HtmlElement,
    nodes: NodeTable,
    containers: Vec<Option<HtmlElement>>,
}

impl core::fmt::Debug for DomPresenter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomPresenter")
            .field("root", &"HtmlElement")
            .field("nodes", &self.nodes)
            .field("containers", &self.containers.iter().flatten().count())
            .finish()
    }
}

impl DomPresenter {
    /// Creates a presenter managing container elements under `root`.
    #[must_use]
    pub fn new(root: HtmlElement, nodes: NodeTable) -> Self {
        Self {
            root,
            nodes,
            containers: Vec::new(),
        }
    }

    /// The element holding all containers.
    #[must_use]
    pub fn root(&self) -> &HtmlElement {
        &self.root
    }

    /// The element of the container in slot `idx`.
    #[must_use]
    pub fn container_element(&self, idx: u32) -> Option<&HtmlElement> {
        self.containers
            .get(idx as usize)
            .and_then(|slot| slot.as_ref())
    }

    fn take_container(&mut self, idx: u32) -> Option<HtmlElement> {
        self.containers.get_mut(idx as usize)?.take()
    }

    fn put_container(&mut self, idx: u32, el: HtmlElement) {
        let slot = idx as usize;
        if self.containers.len() <= slot {
            self.containers.resize_with(slot + 1, || None);
        }
        self.containers[slot] = Some(el);
    }

    fn create_container(&self) -> Option<HtmlElement> {
        let doc = self.root.owner_document()?;
        let el: HtmlElement = doc.create_element("div").ok()?.unchecked_into();
        el.set_class_name(CONTAINER_CLASS);
        Some(el)
    }

    /// Positions and re-appends every child of `idx` in stacking order.
    fn layout_children(&self, store: &ContainerStore, idx: u32) {
        let Some(container) = self.container_element(idx) else {
            return;
        };
        let scale = store.transform_at(idx).scale;
        for child in store.children_at(idx) {
            let Some(el) = self.nodes.get(child.key) else {
                continue;
            };
            place(&el, store.child_rect_at(idx, child));
            if is_fixed(child) {
                css::set_property(&el.style(), "transform", &css::counter_scale(scale));
            }
            // Re-appending an existing child moves it to the end.
            if let Err(err) = container.append_child(&el) {
                log::debug!("cannot append node {:?}: {err:?}", child.key);
            }
        }
    }

    fn update_counter_scale(&self, store: &ContainerStore, idx: u32) {
        let scale = store.transform_at(idx).scale;
        let counter = css::counter_scale(scale);
        for child in store.children_at(idx).iter().filter(|c| is_fixed(c)) {
            if let Some(el) = self.nodes.get(child.key) {
                css::set_property(&el.style(), "transform", &counter);
            }
        }
    }
}

impl Presenter for DomPresenter {
    fn apply(&mut self, store: &ContainerStore, changes: &ContainerChanges) {
        // 1. Detached nodes leave the tree; surfaces discard them later.
        for &key in &changes.detached {
            if let Some(el) = self.nodes.get(key) {
                el.remove();
            }
        }

        // 2. Removals
        for &idx in &changes.removed {
            if let Some(el) = self.take_container(idx) {
                el.remove();
            }
        }

        // 3. Additions, appended on top in creation order.
        for &idx in &changes.added {
            let Some(el) = self.create_container() else {
                log::warn!("cannot create a container element");
                continue;
            };
            css::set_property(
                &el.style(),
                "transform",
                &css::transform(store.transform_at(idx)),
            );
            if let Err(err) = self.root.append_child(&el) {
                log::debug!("cannot append container {idx}: {err:?}");
            }
            self.put_container(idx, el);
        }

        // 4. Transforms
        for &idx in &changes.transforms {
            if let Some(el) = self.container_element(idx) {
                css::set_property(
                    &el.style(),
                    "transform",
                    &css::transform(store.transform_at(idx)),
                );
                self.update_counter_scale(store, idx);
            }
        }

        // 5. Content
        for &idx in &changes.content {
            self.layout_children(store, idx);
        }
    }
}

fn is_fixed(child: &Child) -> bool {
    matches!(child.placement, Placement::FixedSize { .. })
}

fn place(el: &HtmlElement, rect: kurbo::Rect) {
    let p = css::placement(rect);
    let s = el.style();
    css::set_property(&s, "left", &p.left);
    css::set_property(&s, "top", &p.top);
    css::set_property(&s, "width", &p.width);
    css::set_property(&s, "height", &p.height);
}

// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Explicit stylesheet registration.
//!
//! Each named stylesheet becomes one `<style>` element in the document head,
//! tagged with an id derived from its name. Registering a name that is
//! already present in the document does nothing, so independent maps on one
//! page share their styles.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use wasm_bindgen::JsValue;
use web_sys::{Document, Element};

/// Styles every mounted map needs.
pub const MAP_STYLE: &str = "\
.meridian-map { position: relative; overflow: hidden; width: 100%; height: 100%; \
touch-action: none; user-select: none; -webkit-user-select: none; }
.meridian-viewport { position: absolute; left: 0; top: 0; width: 100%; height: 100%; \
transform-origin: 0 0; }
.meridian-container { position: absolute; left: 0; top: 0; transform-origin: 0 0; }
.meridian-node { position: absolute; transform-origin: 0 0; }
";

/// Name under which [`MAP_STYLE`] is registered.
pub const MAP_STYLE_NAME: &str = "map";

/// Tracks the stylesheets this process registered.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    registered: Vec<String>,
}

impl StyleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `css` under `name` unless the document already has it.
    ///
    /// Returns whether a new `<style>` element was inserted.
    pub fn register(&mut self, document: &Document, name: &str, css: &str) -> Result<bool, JsValue> {
        let id = element_id(name);
        if document.get_element_by_id(&id).is_some() {
            self.remember(name);
            return Ok(false);
        }
        let style = document.create_element("style")?;
        style.set_id(&id);
        style.set_text_content(Some(css));
        let parent: Element = match document.head() {
            Some(head) => head.into(),
            None => document
                .document_element()
                .ok_or_else(|| JsValue::from_str("document has no root element"))?,
        };
        parent.append_child(&style)?;
        self.remember(name);
        log::debug!("registered stylesheet {name:?}");
        Ok(true)
    }

    /// Whether `name` was registered through this registry.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.iter().any(|n| n == name)
    }

    fn remember(&mut self, name: &str) {
        if !self.is_registered(name) {
            self.registered.push(String::from(name));
        }
    }
}

/// Element id for a stylesheet name. Characters outside `[A-Za-z0-9_-]` are
/// replaced so the id stays a valid selector.
pub(crate) fn element_id(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("meridian-style-{sanitized}")
}

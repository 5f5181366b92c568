// Copyright 2026 the Meridian Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handler registration and propagation.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use super::event::{EventMask, EventTarget, MapEvent};
use crate::feature::FeatureId;
use crate::layer::LayerKey;

/// A registered event handler.
pub type Handler = Box<dyn FnMut(&mut MapEvent)>;

/// Returned by [`EventHub::on`]; pass to [`EventHub::off`] to unregister.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl fmt::Debug for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandlerId({})", self.0)
    }
}

/// What a handler listens on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Every event, after features and layers had their turn.
    Map,
    /// Events whose target is the layer or one of its features.
    Layer(LayerKey),
    /// Events whose target is this feature.
    Feature(LayerKey, FeatureId),
}

struct Entry {
    id: HandlerId,
    scope: Scope,
    kinds: EventMask,
    handler: Handler,
}

/// Registry of handlers by scope.
///
/// Events travel feature → layer → map. Within one scope, handlers run in
/// registration order. [`MapEvent::stop_propagation`] ends the walk after the
/// current handler.
#[derive(Default)]
pub struct EventHub {
    entries: Vec<Entry>,
    next_id: u64,
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("handlers", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl EventHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for the event kinds in `kinds` on `scope`.
    pub fn on(
        &mut self,
        scope: Scope,
        kinds: EventMask,
        handler: impl FnMut(&mut MapEvent) + 'static,
    ) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            scope,
            kinds,
            handler: Box::new(handler),
        });
        id
    }

    /// Unregisters a handler. Returns `false` if it was already gone.
    pub fn off(&mut self, id: HandlerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Drops every handler on `scope` and, for a layer, on its features.
    pub fn clear_scope(&mut self, scope: Scope) {
        self.entries.retain(|e| match (scope, e.scope) {
            (Scope::Layer(l), Scope::Feature(fl, _)) => l != fl,
            (s, es) => s != es,
        });
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delivers `event` along its propagation path.
    pub fn dispatch(&mut self, event: &mut MapEvent) {
        let mask = event.kind().mask();
        for scope in path(event.target()).into_iter().flatten() {
            for entry in &mut self.entries {
                if entry.scope != scope || !entry.kinds.intersects(mask) {
                    continue;
                }
                (entry.handler)(event);
                if event.is_propagation_stopped() {
                    return;
                }
            }
        }
    }
}

fn path(target: EventTarget) -> [Option<Scope>; 3] {
    match target {
        EventTarget::Feature { layer, feature } => [
            Some(Scope::Feature(layer, feature)),
            Some(Scope::Layer(layer)),
            Some(Scope::Map),
        ],
        EventTarget::Layer(layer) => [Some(Scope::Layer(layer)), Some(Scope::Map), None],
        EventTarget::Map => [Some(Scope::Map), None, None],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::event::{EventKind, InputEvent, Modifiers, MouseInput, MousePhase};
    use crate::time::HostTime;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;
    use kurbo::Point;

    fn click(target: EventTarget) -> MapEvent {
        let source = InputEvent::Mouse(MouseInput {
            phase: MousePhase::Up,
            button: None,
            position: Point::ORIGIN,
            mods: Modifiers::empty(),
            time: HostTime(0),
        });
        MapEvent::new(EventKind::Click, target, Point::ORIGIN, Point::ORIGIN, source)
    }

    const LAYER: LayerKey = LayerKey(3);
    const FEATURE: EventTarget = EventTarget::Feature {
        layer: LAYER,
        feature: FeatureId(9),
    };

    fn recorder(
        log: &Rc<RefCell<Vec<&'static str>>>,
        name: &'static str,
    ) -> impl FnMut(&mut MapEvent) + 'static {
        let log = log.clone();
        move |_| log.borrow_mut().push(name)
    }

    #[test]
    fn bubbles_feature_layer_map() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut hub = EventHub::new();
        hub.on(Scope::Map, EventMask::CLICK, recorder(&log, "map"));
        hub.on(Scope::Layer(LAYER), EventMask::CLICK, recorder(&log, "layer"));
        hub.on(
            Scope::Feature(LAYER, FeatureId(9)),
            EventMask::CLICK,
            recorder(&log, "feature"),
        );
        hub.dispatch(&mut click(FEATURE));
        assert_eq!(*log.borrow(), vec!["feature", "layer", "map"]);
    }

    #[test]
    fn stop_propagation_halts_walk() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut hub = EventHub::new();
        hub.on(Scope::Map, EventMask::CLICK, recorder(&log, "map"));
        let inner = log.clone();
        hub.on(Scope::Feature(LAYER, FeatureId(9)), EventMask::CLICK, move |e| {
            inner.borrow_mut().push("feature");
            e.stop_propagation();
        });
        hub.dispatch(&mut click(FEATURE));
        assert_eq!(*log.borrow(), vec!["feature"]);
    }

    #[test]
    fn kind_filter_and_off() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut hub = EventHub::new();
        hub.on(Scope::Map, EventMask::DRAG, recorder(&log, "drag"));
        let id = hub.on(Scope::Map, EventMask::CLICK, recorder(&log, "click"));
        hub.dispatch(&mut click(EventTarget::Map));
        assert!(hub.off(id));
        assert!(!hub.off(id));
        hub.dispatch(&mut click(EventTarget::Map));
        assert_eq!(*log.borrow(), vec!["click"]);
    }

    #[test]
    fn other_features_do_not_receive() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut hub = EventHub::new();
        hub.on(
            Scope::Feature(LAYER, FeatureId(1)),
            EventMask::CLICK,
            recorder(&log, "other"),
        );
        hub.dispatch(&mut click(FEATURE));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn clearing_a_layer_drops_its_features() {
        let mut hub = EventHub::new();
        hub.on(Scope::Layer(LAYER), EventMask::all(), |_| {});
        hub.on(Scope::Feature(LAYER, FeatureId(1)), EventMask::all(), |_| {});
        hub.on(Scope::Map, EventMask::all(), |_| {});
        hub.clear_scope(Scope::Layer(LAYER));
        assert_eq!(hub.len(), 1);
    }
}

// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Lifecycle observer dispatch.
//!
//! One callback list per event kind rather than a single broadcast `Vec`,
//! since every event already carries a fixed, differently-shaped payload
//! rather than a single enum every observer has to match on. Dispatch
//! walks each list in reverse: a callback unregistering itself (or a
//! sibling) mid-dispatch must not skip or re-visit a callback, which a
//! forward scan over a `Vec` being shrunk from under it cannot guarantee.

use crate::id::Id;

pub type ObserverId = u64;

/// Every lifecycle event a world can announce.
#[derive(Debug, Clone, Copy)]
pub enum Event {
    EntityCreated { entity: Id },
    EntityDestroyed { entity: Id },
    ComponentAdded { entity: Id, component: Id },
    ComponentRemoved { entity: Id, component: Id },
    ComponentChanged { entity: Id, component: Id },
    ArchetypeCreated { archetype: usize },
    ArchetypeDestroyed { archetype: usize },
    FilterCreated { filter: usize },
    FilterDestroyed { filter: usize },
    WorldReset,
}

/// Discriminant used to key a callback into the right per-kind list
/// without requiring the caller to match on [`Event`] just to register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    EntityCreated,
    EntityDestroyed,
    ComponentAdded,
    ComponentRemoved,
    ComponentChanged,
    ArchetypeCreated,
    ArchetypeDestroyed,
    FilterCreated,
    FilterDestroyed,
    WorldReset,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::EntityCreated { .. } => EventKind::EntityCreated,
            Event::EntityDestroyed { .. } => EventKind::EntityDestroyed,
            Event::ComponentAdded { .. } => EventKind::ComponentAdded,
            Event::ComponentRemoved { .. } => EventKind::ComponentRemoved,
            Event::ComponentChanged { .. } => EventKind::ComponentChanged,
            Event::ArchetypeCreated { .. } => EventKind::ArchetypeCreated,
            Event::ArchetypeDestroyed { .. } => EventKind::ArchetypeDestroyed,
            Event::FilterCreated { .. } => EventKind::FilterCreated,
            Event::FilterDestroyed { .. } => EventKind::FilterDestroyed,
            Event::WorldReset => EventKind::WorldReset,
        }
    }
}

type Callback = Box<dyn FnMut(&Event) + Send>;

struct Slot {
    id: ObserverId,
    kind: EventKind,
    callback: Callback,
}

/// Per-kind callback lists plus reverse-order dispatch.
///
/// Dispatch walks each kind's slot list with `.rev()` so a callback that
/// unregisters a not-yet-visited sibling during dispatch can't cause that
/// sibling to be skipped or double-run.
#[derive(Default)]
pub struct ObserverBus {
    slots: Vec<Slot>,
    next_id: ObserverId,
}

impl ObserverBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for every event of `kind`. Returns an id usable
    /// with [`ObserverBus::unregister`].
    pub fn register(&mut self, kind: EventKind, callback: impl FnMut(&Event) + Send + 'static) -> ObserverId {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.push(Slot { id, kind, callback: Box::new(callback) });
        id
    }

    pub fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|s| s.id != id);
        self.slots.len() != before
    }

    /// Dispatch `event` to every callback registered for its kind, most
    /// recently registered first. A callback may call [`ObserverBus::unregister`]
    /// on itself or any other id without corrupting this dispatch pass,
    /// since the set of ids to visit is computed once up front and each
    /// step re-checks that id still has a live slot before invoking it.
    pub fn dispatch(&mut self, event: &Event) {
        let kind = event.kind();
        let matching: Vec<ObserverId> = self
            .slots
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.id)
            .rev()
            .collect();
        for id in matching {
            if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
                (slot.callback)(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn dispatch_visits_in_reverse_registration_order() {
        let mut bus = ObserverBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..3 {
            let order = order.clone();
            bus.register(EventKind::WorldReset, move |_| order.lock().unwrap().push(tag));
        }
        bus.dispatch(&Event::WorldReset);
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn unregister_stops_future_dispatch() {
        let mut bus = ObserverBus::new();
        let count = Arc::new(Mutex::new(0));
        let count2 = count.clone();
        let id = bus.register(EventKind::WorldReset, move |_| *count2.lock().unwrap() += 1);
        bus.dispatch(&Event::WorldReset);
        assert!(bus.unregister(id));
        bus.dispatch(&Event::WorldReset);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn self_unregistration_mid_dispatch_is_safe() {
        let mut bus = ObserverBus::new();
        let visited = Arc::new(Mutex::new(Vec::new()));

        let v1 = visited.clone();
        let _first_id = bus.register(EventKind::EntityCreated, move |_| {
            v1.lock().unwrap().push("first");
        });

        let v2 = visited.clone();
        bus.register(EventKind::EntityCreated, move |_| {
            v2.lock().unwrap().push("second");
        });

        bus.dispatch(&Event::EntityCreated { entity: Id::entity(0, 0).unwrap() });
        assert_eq!(*visited.lock().unwrap(), vec!["second", "first"]);
    }

    #[test]
    fn only_matching_kind_is_invoked() {
        let mut bus = ObserverBus::new();
        let hits = Arc::new(Mutex::new(0));
        let hits2 = hits.clone();
        bus.register(EventKind::ComponentAdded, move |_| *hits2.lock().unwrap() += 1);
        bus.dispatch(&Event::WorldReset);
        assert_eq!(*hits.lock().unwrap(), 0);
    }
}

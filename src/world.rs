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

//! The world: owns every archetype, the entity free list, the filter and
//! query caches, and the observer bus, and wires them together into the
//! external operations an application actually calls.
//!
//! State is an entity free list, a `Vec<Archetype>`, and a reverse index
//! from type id to the archetypes that carry it (`type_records`, called
//! `meta.records` in the design notes) so a component add/remove or
//! relation change only touches the archetypes it actually affects -
//! relation pair ids and their wildcard companions live in the same
//! index, not a separate one.

use rustc_hash::FxHashMap;
#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::archetype::{self, Archetype, ArchetypeId};
use crate::entity::{EntityRecord, EntityStore};
use crate::error::{EcsError, Result};
use crate::filter::FilterIndex;
use crate::id::{Id, Kind};
use crate::observer::{Event, EventKind, ObserverBus, ObserverId};
use crate::query::{self, QueryCache, QueryDef, QueryId, QueryIter, Term};
use crate::registry;
use crate::relation;
use crate::schema::{Schema, Value};
use crate::system::SystemId;

const ROOT: ArchetypeId = 0;

/// Resolve a type id's storage schema from the process-global registry. A
/// free function rather than a `World` method: schema lookup never needs
/// a `World`, only the id itself and whatever was `defineComponent`'d or
/// `defineRelation`'d with a payload.
fn schema_for_type(id: Id) -> Option<Schema> {
    if id.is_pair() {
        let relation_raw = id.pair_relation_raw()?;
        let relation_id = Id::relation(relation_raw).ok()?;
        registry::relation_meta(relation_id).and_then(|m| m.schema)
    } else {
        match id.kind().ok()? {
            Kind::Component => registry::component_meta(id).map(|m| m.schema),
            _ => None,
        }
    }
}

/// Borrow two distinct elements of the same slice mutably at once.
fn index_two_mut<T>(slice: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b, "cannot borrow the same archetype as both source and destination");
    if a < b {
        let (left, right) = slice.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = slice.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// The in-memory data engine core: entities, archetypes, filters, queries,
/// and lifecycle observers for a single simulation.
pub struct World {
    entities: EntityStore,
    archetypes: Vec<Archetype>,
    archetype_by_key: FxHashMap<String, ArchetypeId>,
    /// Reverse index: for every type id currently present in at least one
    /// archetype's signature, the archetypes that carry it. Covers
    /// relation pairs and their wildcard companions, not just plain
    /// component types.
    type_records: FxHashMap<Id, Vec<ArchetypeId>>,
    filters: FilterIndex,
    queries: QueryCache,
    observers: ObserverBus,
    tick: u32,
    current_system: Option<SystemId>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        let mut world = World {
            entities: EntityStore::new(),
            archetypes: Vec::new(),
            archetype_by_key: FxHashMap::default(),
            type_records: FxHashMap::default(),
            filters: FilterIndex::new(),
            queries: QueryCache::new(),
            observers: ObserverBus::new(),
            tick: 0,
            current_system: None,
        };
        world.push_root_archetype();
        world
    }

    fn push_root_archetype(&mut self) {
        let root = Archetype::new(ROOT, Vec::new(), schema_for_type);
        self.archetypes.push(root);
        self.archetype_by_key.insert(archetype::signature_key(&[]), ROOT);
    }

    /// Tear down every entity, archetype, filter, and query, and fire
    /// `WorldReset` so subsystems that cache archetype/query ids know to
    /// re-derive them. Registered observer callbacks themselves stay
    /// registered across a reset - only the state they were watching is
    /// wiped.
    pub fn reset(&mut self) {
        self.entities.reset();
        self.archetypes.clear();
        self.archetype_by_key.clear();
        self.type_records.clear();
        self.filters.clear();
        self.queries.clear();
        self.tick = 0;
        self.current_system = None;
        self.push_root_archetype();
        self.observers.dispatch(&Event::WorldReset);
    }

    // ---- entity lifecycle -------------------------------------------

    pub fn create_entity(&mut self) -> Result<Id> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.create_entity", archetype_count = self.archetypes.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let entity = self.entities.allocate()?;
        let tick = self.tick;
        let row = self.archetypes[ROOT].allocate_row(entity, tick);
        self.entities.set_record(entity, EntityRecord { archetype: ROOT, row });
        self.observers.dispatch(&Event::EntityCreated { entity });
        Ok(entity)
    }

    pub fn is_entity_alive(&self, entity: Id) -> bool {
        self.entities.is_alive(entity)
    }

    /// Idempotent registration for a non-entity id (tag/component/
    /// relation/pair) used for the first time as a component key. Plain
    /// `Entity` ids must already be alive; every other kind has no
    /// eager bookkeeping to perform beyond recursing into a pair's
    /// relation, since their metadata already lives in the registry.
    pub fn ensure_entity(&mut self, id: Id) -> Result<()> {
        match id.decode()? {
            crate::id::Decoded::Entity { .. } => {
                if self.entities.is_alive(id) {
                    Ok(())
                } else {
                    Err(EcsError::NotFound(format!("{id:?} is not a live entity")))
                }
            }
            crate::id::Decoded::Tag { .. } | crate::id::Decoded::Component { .. } | crate::id::Decoded::Relation { .. } => Ok(()),
            crate::id::Decoded::Pair { relation_raw, .. } => {
                let relation_id = Id::relation(relation_raw)?;
                self.ensure_entity(relation_id)
            }
        }
    }

    /// Destroy `entity` following a fixed six-step order: mark it
    /// destroying (reentrancy guard), cascade relation cleanup,
    /// cascade-remove it as a component from anything holding it, swap-
    /// remove its row, fire `entityDestroyed`, then free its raw id and
    /// bump its generation. A no-op (not an error) on an already-dead or
    /// already-destroying id, since both are reachable from recursive
    /// cascades.
    pub fn destroy_entity(&mut self, entity: Id) -> Result<()> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.destroy_entity", entity = ?entity);
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        if !self.entities.is_alive(entity) || self.entities.is_destroying(entity) {
            return Ok(());
        }
        self.entities.mark_destroying(entity);

        self.cascade_relation_cleanup(entity)?;

        // Every archetype that lists `entity` itself as a component type
        // is destroyed outright, not merely left empty - snapshot before
        // migrating holders, since
        // `type_records` only grows while holders are moved off of it.
        let archetypes_using_entity_as_component = self.type_records.get(&entity).cloned().unwrap_or_default();

        for holder in self.entities_holding(entity) {
            if self.entities.is_alive(holder) {
                self.remove_component(holder, entity)?;
            }
        }

        for aid in archetypes_using_entity_as_component {
            self.destroy_archetype(aid)?;
        }

        let record = self.entities.record(entity).ok_or(EcsError::EntityNotFound)?;
        let swapped = self.archetypes[record.archetype].remove_row(record.row);
        if let Some(swapped_entity) = swapped {
            self.entities.set_record(swapped_entity, record);
        }

        self.observers.dispatch(&Event::EntityDestroyed { entity });
        self.entities.free(entity);
        Ok(())
    }

    /// Entities currently holding `type_id` as a component, snapshotted
    /// from `type_records` before any mutation (callers strip the type
    /// from each one, which would otherwise invalidate the list mid-walk).
    fn entities_holding(&self, type_id: Id) -> Vec<Id> {
        self.type_records
            .get(&type_id)
            .map(|archetypes| {
                archetypes
                    .iter()
                    .flat_map(|&aid| self.archetypes[aid].entities().iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Cascade on target destruction: every `(relation, target)` pair targeting `target`
    /// either gets stripped from its holders (`OnDeleteTarget::Remove`) or
    /// marks its holders for recursive destruction
    /// (`OnDeleteTarget::Delete`). Subjects are collected before any pair
    /// is actually removed, so a subject isn't lost if stripping its pair
    /// changes which archetype it lives in.
    fn cascade_relation_cleanup(&mut self, target: Id) -> Result<()> {
        let wildcard = relation::wildcard_relation_pair(target)?;
        let archetype_ids = self.type_records.get(&wildcard).cloned().unwrap_or_default();

        let mut remove_pairs: Vec<Id> = Vec::new();
        let mut delete_pairs: Vec<Id> = Vec::new();
        for aid in archetype_ids {
            for &t in self.archetypes[aid].types() {
                if !relation::matches_pair_filter(t, wildcard) {
                    continue;
                }
                let relation_id = Id::relation(t.pair_relation_raw().unwrap())?;
                let bucket = match relation::on_delete_target(relation_id) {
                    registry::OnDeleteTarget::Delete => &mut delete_pairs,
                    registry::OnDeleteTarget::Remove => &mut remove_pairs,
                };
                if !bucket.contains(&t) {
                    bucket.push(t);
                }
            }
        }

        let mut subjects: Vec<Id> = Vec::new();
        for &pair_id in &delete_pairs {
            for e in self.entities_holding(pair_id) {
                if !subjects.contains(&e) {
                    subjects.push(e);
                }
            }
        }

        for pair_id in remove_pairs.into_iter().chain(delete_pairs) {
            for holder in self.entities_holding(pair_id) {
                self.remove_component(holder, pair_id)?;
            }
        }

        for subject in subjects {
            if self.entities.is_alive(subject) && !self.entities.is_destroying(subject) {
                self.destroy_entity(subject)?;
            }
        }
        Ok(())
    }

    // ---- archetype graph ----------------------------------------------

    fn get_or_create_archetype(&mut self, mut types: Vec<Id>) -> ArchetypeId {
        types.sort_unstable();
        types.dedup();
        let key = archetype::signature_key(&types);
        if let Some(&id) = self.archetype_by_key.get(&key) {
            return id;
        }
        #[cfg(feature = "profiling")]
        let span = info_span!("world.create_archetype", component_count = types.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let id = self.archetypes.len();
        let arch = Archetype::new(id, types.clone(), schema_for_type);
        self.archetypes.push(arch);
        self.archetype_by_key.insert(key, id);
        for &t in &types {
            self.type_records.entry(t).or_default().push(id);
        }
        self.filters.on_archetype_created(&self.archetypes[id]);
        self.observers.dispatch(&Event::ArchetypeCreated { archetype: id });
        id
    }

    /// Destroy an archetype: protected for the root archetype; otherwise remove
    /// it from every index (`archetype_by_key`, `type_records`, the filter
    /// cache), fire `archetypeDestroyed` *before* that removal so callbacks
    /// can still look it up, then clear every other
    /// archetype's edges that pointed here and tombstone the storage.
    /// Idempotent; a no-op if `aid` is already destroyed. Callers are
    /// responsible for migrating any live rows out first - this does not
    /// touch `entities`/`EntityRecord`s.
    fn destroy_archetype(&mut self, aid: ArchetypeId) -> Result<()> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.destroy_archetype", archetype = aid);
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        if self.archetypes[aid].destroy_protected() || self.archetypes[aid].is_destroyed() {
            return Ok(());
        }
        self.observers.dispatch(&Event::ArchetypeDestroyed { archetype: aid });

        let key = self.archetypes[aid].key();
        self.archetype_by_key.remove(&key);
        for t in self.archetypes[aid].types().to_vec() {
            if let Some(list) = self.type_records.get_mut(&t) {
                list.retain(|&id| id != aid);
            }
        }
        for arch in self.archetypes.iter_mut() {
            arch.clear_edges_to(aid);
        }
        self.filters.on_archetype_destroyed(aid);
        self.archetypes[aid].mark_destroyed();
        Ok(())
    }

    fn traverse_add(&mut self, from: ArchetypeId, c: Id) -> ArchetypeId {
        if self.archetypes[from].has(c) {
            return from;
        }
        if let Some(to) = self.archetypes[from].edge_add(c) {
            return to;
        }
        let types: Vec<Id> = self.archetypes[from].types().iter().copied().chain(std::iter::once(c)).collect();
        let to = self.get_or_create_archetype(types);
        self.archetypes[from].set_edge_add(c, to);
        self.archetypes[to].set_edge_remove(c, from);
        to
    }

    fn traverse_remove(&mut self, from: ArchetypeId, c: Id) -> ArchetypeId {
        if !self.archetypes[from].has(c) {
            return from;
        }
        if let Some(to) = self.archetypes[from].edge_remove(c) {
            return to;
        }
        let types: Vec<Id> = self.archetypes[from].types().iter().copied().filter(|&t| t != c).collect();
        let to = self.get_or_create_archetype(types);
        self.archetypes[from].set_edge_remove(c, to);
        self.archetypes[to].set_edge_add(c, from);
        to
    }

    fn transfer_entity(&mut self, entity: Id, dest: ArchetypeId) -> Result<()> {
        let record = self.entities.record(entity).ok_or(EcsError::EntityNotFound)?;
        if record.archetype == dest {
            return Ok(());
        }
        let tick = self.tick;
        let (src, dst) = index_two_mut(&mut self.archetypes, record.archetype, dest);
        let swapped = src.transfer_row(record.row, dst, entity, tick);
        let new_row = dst.len() - 1;
        self.entities.set_record(entity, EntityRecord { archetype: dest, row: new_row });
        if let Some(swapped_entity) = swapped {
            self.entities.set_record(swapped_entity, EntityRecord { archetype: record.archetype, row: record.row });
        }
        Ok(())
    }

    fn find_pair_with_relation(&self, entity: Id, relation_id: Id) -> Option<Id> {
        let record = self.entities.record(entity)?;
        let relation_raw = relation_id.raw().min(u8::MAX as u32) as u8;
        self.archetypes[record.archetype]
            .types()
            .iter()
            .copied()
            .find(|&t| t.is_pair() && t.pair_relation_raw() == Some(relation_raw) && !relation::is_wildcard_target(t))
    }

    // ---- components ----------------------------------------------------

    pub fn has_component(&self, entity: Id, component: Id) -> bool {
        self.entities.record(entity).map(|r| self.archetypes[r.archetype].has(component)).unwrap_or(false)
    }

    /// Add `component` to `entity`, optionally seeding named fields with
    /// `values`. Exclusive relations reparent (any previous pair sharing
    /// the relation is removed first); any relation pair also brings its
    /// two wildcard companions (`relation.rs::companions`) along for the
    /// ride. A no-op, not an error, if `entity` already carries
    /// `component` - `values`, if given, still apply.
    pub fn add_component(&mut self, entity: Id, component: Id, values: &[(&str, Value)]) -> Result<()> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.add_component", entity = ?entity, component = ?component);
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        if !self.entities.is_alive(entity) {
            return Err(EcsError::NotFound(format!("{entity:?} is not alive")));
        }
        self.ensure_entity(component)?;

        let record = self.entities.record(entity).ok_or(EcsError::EntityNotFound)?;
        if self.archetypes[record.archetype].has(component) {
            for &(field, ref value) in values {
                self.set_component_value(entity, component, field, value.clone())?;
            }
            return Ok(());
        }

        if component.is_pair() {
            let relation_id = Id::relation(component.pair_relation_raw().unwrap())?;
            if registry::is_exclusive(relation_id) {
                if let Some(existing) = self.find_pair_with_relation(entity, relation_id) {
                    if existing != component {
                        self.remove_component(entity, existing)?;
                    }
                }
            }
        }

        let mut to_add = vec![component];
        if component.is_pair() {
            for companion in relation::companions(component)? {
                if !to_add.contains(&companion) {
                    to_add.push(companion);
                }
            }
        }

        let record = self.entities.record(entity).ok_or(EcsError::EntityNotFound)?;
        let mut dest = record.archetype;
        for &c in &to_add {
            dest = self.traverse_add(dest, c);
        }
        self.transfer_entity(entity, dest)?;

        for &(field, ref value) in values {
            self.set_component_value(entity, component, field, value.clone())?;
        }
        self.observers.dispatch(&Event::ComponentAdded { entity, component });
        Ok(())
    }

    /// Remove `component` from `entity`. For a pair, a wildcard companion
    /// is only dropped once no sibling pair still needs it (another pair
    /// sharing the relation, or another sharing the target). A no-op if
    /// `entity` never had `component`.
    pub fn remove_component(&mut self, entity: Id, component: Id) -> Result<()> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.remove_component", entity = ?entity, component = ?component);
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        if !self.entities.is_alive(entity) {
            return Err(EcsError::NotFound(format!("{entity:?} is not alive")));
        }
        let record = self.entities.record(entity).ok_or(EcsError::EntityNotFound)?;
        if !self.archetypes[record.archetype].has(component) {
            return Ok(());
        }

        let mut to_remove = vec![component];
        if component.is_pair() {
            let relation_raw = component.pair_relation_raw().unwrap();
            let target_raw = component.pair_target_raw().unwrap();
            let target_kind = component.pair_target_kind().unwrap();
            let [wildcard_target, wildcard_relation] = relation::companions(component)?;

            let types = self.archetypes[record.archetype].types();
            let other_shares_target = types.iter().any(|&t| {
                t != component
                    && t.is_pair()
                    && t.pair_target_raw() == Some(target_raw)
                    && t.pair_target_kind() == Some(target_kind)
                    && !relation::is_wildcard_relation(t)
            });
            if !other_shares_target {
                to_remove.push(wildcard_relation);
            }
            let other_shares_relation = types
                .iter()
                .any(|&t| t != component && t.is_pair() && t.pair_relation_raw() == Some(relation_raw) && !relation::is_wildcard_target(t));
            if !other_shares_relation {
                to_remove.push(wildcard_target);
            }
        }

        let mut dest = record.archetype;
        for &c in &to_remove {
            dest = self.traverse_remove(dest, c);
        }
        self.transfer_entity(entity, dest)?;
        self.observers.dispatch(&Event::ComponentRemoved { entity, component });
        Ok(())
    }

    pub fn get_component_value(&self, entity: Id, component: Id, field: &str) -> Result<Value> {
        let record = self.entities.record(entity).ok_or(EcsError::EntityNotFound)?;
        let field_idx = self.archetypes[record.archetype].field_index(component, field).ok_or(EcsError::ComponentNotFound)?;
        self.archetypes[record.archetype].get_value(record.row, component, field_idx).ok_or(EcsError::ComponentNotFound)
    }

    pub fn set_component_value(&mut self, entity: Id, component: Id, field: &str, value: Value) -> Result<()> {
        let record = self.entities.record(entity).ok_or(EcsError::EntityNotFound)?;
        let field_idx = self.archetypes[record.archetype].field_index(component, field).ok_or(EcsError::ComponentNotFound)?;
        let tick = self.tick;
        self.archetypes[record.archetype].set_value(record.row, component, field_idx, value, tick)?;
        self.observers.dispatch(&Event::ComponentChanged { entity, component });
        Ok(())
    }

    /// Stamp `component`'s `changed` tick on `entity` without touching its
    /// value, for callers that mutated a value in place (e.g. through
    /// `get_boxed_mut`) and need to announce the change manually.
    pub fn emit_component_changed(&mut self, entity: Id, component: Id) -> Result<()> {
        let record = self.entities.record(entity).ok_or(EcsError::EntityNotFound)?;
        let tick = self.tick;
        self.archetypes[record.archetype].mark_changed(record.row, component, tick);
        self.observers.dispatch(&Event::ComponentChanged { entity, component });
        Ok(())
    }

    // ---- relations ------------------------------------------------------

    pub fn pair(&self, relation: Id, target: Id) -> Result<Id> {
        relation::pair(relation, target)
    }

    pub fn get_pair_relation(&self, pair: Id) -> Result<Id> {
        let raw = pair.pair_relation_raw().ok_or_else(|| EcsError::InvalidArgument("not a pair id".into()))?;
        Id::relation(raw)
    }

    /// Reconstruct a live, correctly-generationed target id from a pair.
    /// A weak reference: if the original target entity has since been
    /// recycled, this returns whatever currently occupies that raw slot.
    pub fn get_pair_target(&self, pair: Id) -> Result<Id> {
        let target_raw = pair.pair_target_raw().ok_or_else(|| EcsError::InvalidArgument("not a pair id".into()))?;
        let target_kind = pair.pair_target_kind().ok_or_else(|| EcsError::InvalidArgument("not a pair id".into()))?;
        match target_kind {
            Kind::Entity => {
                let generation = self.entities.current_generation(target_raw).unwrap_or(0);
                Id::entity(target_raw, generation)
            }
            Kind::Tag => Id::tag(target_raw),
            Kind::Component => Id::component(target_raw),
            Kind::Relation => Err(EcsError::InvalidState("a pair cannot target a relation".into())),
        }
    }

    pub fn get_relation_targets(&self, entity: Id, relation: Id) -> Result<Vec<Id>> {
        let record = self.entities.record(entity).ok_or(EcsError::EntityNotFound)?;
        let wildcard = relation::wildcard_target_pair(relation)?;
        let mut out = Vec::new();
        for &t in self.archetypes[record.archetype].types() {
            if t.is_pair() && relation::matches_pair_filter(t, wildcard) && !relation::is_wildcard_target(t) {
                out.push(self.get_pair_target(t)?);
            }
        }
        Ok(out)
    }

    // ---- filters and queries --------------------------------------------

    pub fn ensure_query(&mut self, terms: &[Term]) -> QueryId {
        let def = QueryDef::from_terms(terms);
        let (query_id, _query_created, filter_id, filter_created) = self.queries.ensure(&mut self.filters, &self.archetypes, def);
        if filter_created {
            self.observers.dispatch(&Event::FilterCreated { filter: filter_id });
        }
        query_id
    }

    pub fn destroy_query(&mut self, query_id: QueryId) -> Result<()> {
        let filter_id = self.queries.destroy(query_id).ok_or_else(|| EcsError::NotFound("query not found".into()))?;
        if !self.queries.filter_in_use(filter_id) && self.filters.destroy(filter_id) {
            self.observers.dispatch(&Event::FilterDestroyed { filter: filter_id });
        }
        Ok(())
    }

    pub fn fetch_entities_with_query(&self, query_id: QueryId) -> Result<QueryIter<'_>> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.fetch_entities_with_query", query = query_id);
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let q = self.queries.get(query_id).ok_or_else(|| EcsError::NotFound("query not found".into()))?;
        let filter = self.filters.get(q.filter_id).ok_or(EcsError::NotFound("filter not found".into()))?;
        let system = self.current_system.map(|s| s.0);
        Ok(query::fetch(q, filter, &self.archetypes, self.tick, system))
    }

    pub fn fetch_entities(&mut self, terms: &[Term]) -> Result<Vec<Id>> {
        let id = self.ensure_query(terms);
        Ok(self.fetch_entities_with_query(id)?.collect())
    }

    pub fn fetch_first_entity(&mut self, terms: &[Term]) -> Result<Option<Id>> {
        let id = self.ensure_query(terms);
        Ok(self.fetch_entities_with_query(id)?.next())
    }

    // ---- observers --------------------------------------------------------

    pub fn register_observer_callback(&mut self, kind: EventKind, callback: impl FnMut(&Event) + Send + 'static) -> ObserverId {
        self.observers.register(kind, callback)
    }

    pub fn unregister_observer_callback(&mut self, id: ObserverId) -> bool {
        self.observers.unregister(id)
    }

    // ---- execution context, published by the scheduler -------------------

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn advance_tick(&mut self) -> u32 {
        self.tick += 1;
        self.tick
    }

    pub fn set_execution_context(&mut self, system: Option<SystemId>, tick: u32) {
        self.current_system = system;
        self.tick = tick;
    }

    pub fn clear_execution_context(&mut self) {
        self.current_system = None;
    }

    // ---- inspection, used by debug.rs ------------------------------------

    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub fn entity_count(&self) -> usize {
        self.entities.live_count()
    }

    pub fn entity_location(&self, entity: Id) -> Option<EntityRecord> {
        self.entities.record(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{reset_for_tests, OnDeleteTarget};
    use crate::schema::FieldKind;
    use std::sync::Mutex;

    // Registry is process-global; serialize tests that define types.
    static LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn create_and_destroy_entity_round_trips() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        assert!(world.is_entity_alive(e));
        world.destroy_entity(e).unwrap();
        assert!(!world.is_entity_alive(e));
    }

    #[test]
    fn add_and_remove_component_transitions_archetypes() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let position = registry::define_component("Position", Schema::new(vec![("x", FieldKind::F32), ("y", FieldKind::F32)]).unwrap()).unwrap();
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        world.add_component(e, position, &[("x", Value::F32(1.0)), ("y", Value::F32(2.0))]).unwrap();
        assert!(world.has_component(e, position));
        assert_eq!(world.get_component_value(e, position, "x").unwrap(), Value::F32(1.0));
        world.remove_component(e, position).unwrap();
        assert!(!world.has_component(e, position));
    }

    #[test]
    fn exclusive_relation_reparents() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let child_of = registry::define_relation("ChildOf", true, OnDeleteTarget::Remove, None).unwrap();
        let mut world = World::new();
        let parent_a = world.create_entity().unwrap();
        let parent_b = world.create_entity().unwrap();
        let child = world.create_entity().unwrap();

        let pair_a = world.pair(child_of, parent_a).unwrap();
        world.add_component(child, pair_a, &[]).unwrap();
        assert!(world.has_component(child, pair_a));

        let pair_b = world.pair(child_of, parent_b).unwrap();
        world.add_component(child, pair_b, &[]).unwrap();
        assert!(!world.has_component(child, pair_a));
        assert!(world.has_component(child, pair_b));
    }

    #[test]
    fn cascade_delete_destroys_children_when_target_destroyed() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let child_of = registry::define_relation("ChildOf", true, OnDeleteTarget::Delete, None).unwrap();
        let mut world = World::new();
        let parent = world.create_entity().unwrap();
        let child = world.create_entity().unwrap();
        let pair = world.pair(child_of, parent).unwrap();
        world.add_component(child, pair, &[]).unwrap();

        world.destroy_entity(parent).unwrap();
        assert!(!world.is_entity_alive(parent));
        assert!(!world.is_entity_alive(child));
    }

    #[test]
    fn remove_policy_strips_pair_but_keeps_holder_alive() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let likes = registry::define_relation("Likes", false, OnDeleteTarget::Remove, None).unwrap();
        let mut world = World::new();
        let target = world.create_entity().unwrap();
        let holder = world.create_entity().unwrap();
        let pair = world.pair(likes, target).unwrap();
        world.add_component(holder, pair, &[]).unwrap();

        world.destroy_entity(target).unwrap();
        assert!(world.is_entity_alive(holder));
        assert!(!world.has_component(holder, pair));
    }

    #[test]
    fn destroying_entity_used_as_component_destroys_its_archetype() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let mut world = World::new();
        // `tag_entity` stands in as a component type on `holder` - an
        // entity id can be used as a component, not just tags/components
        // defined through the registry.
        let tag_entity = world.create_entity().unwrap();
        let holder = world.create_entity().unwrap();
        world.add_component(holder, tag_entity, &[]).unwrap();
        let arch_id = world.entity_location(holder).unwrap().archetype;
        assert!(world.archetypes()[arch_id].has(tag_entity));

        world.destroy_entity(tag_entity).unwrap();

        assert!(world.is_entity_alive(holder));
        assert!(!world.has_component(holder, tag_entity));
        assert!(world.archetypes()[arch_id].is_destroyed());
        assert!(world.archetypes()[arch_id].is_empty());
    }

    #[test]
    fn fetch_entities_matches_include_and_exclude() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let a = registry::define_tag("A").unwrap();
        let b = registry::define_tag("B").unwrap();
        let mut world = World::new();
        let e1 = world.create_entity().unwrap();
        world.add_component(e1, a, &[]).unwrap();
        let e2 = world.create_entity().unwrap();
        world.add_component(e2, a, &[]).unwrap();
        world.add_component(e2, b, &[]).unwrap();

        let matches = world.fetch_entities(&[Term::Has(a), Term::Not(b)]).unwrap();
        assert_eq!(matches, vec![e1]);
    }

    #[test]
    fn added_query_sees_new_entities_once() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let a = registry::define_tag("Marker").unwrap();
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        world.add_component(e, a, &[]).unwrap();

        world.set_execution_context(Some(SystemId(0)), 1);
        let first: Vec<Id> = world.fetch_entities(&[Term::Added(a)]).unwrap();
        assert_eq!(first, vec![e]);
        let second: Vec<Id> = world.fetch_entities(&[Term::Added(a)]).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn reset_clears_entities_and_archetypes() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        world.reset();
        assert!(!world.is_entity_alive(e));
        assert_eq!(world.archetypes.len(), 1);
    }
}

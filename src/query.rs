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

//! Query engine: a cached filter plus added/changed tick modifiers, with
//! a tick channel that advances on every exit path from iteration.
//!
//! A query filters archetypes first via the cached [`crate::filter::Filter`],
//! then iterates matching rows in reverse order so a row removed mid-iteration
//! (a swap-remove pulling a not-yet-visited row backward) is never skipped or
//! revisited. Tick advancement rides a `Drop` guard standing in for a
//! `finally` block - folded directly into `QueryIter`'s own `Drop` impl
//! rather than a separate guard type, since the iterator already owns
//! everything the guard would need - so every exit path (normal
//! exhaustion, early `break`, or panic unwind) still advances the query's
//! last-seen tick exactly once.

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;

use crate::archetype::Archetype;
use crate::filter::{Filter, FilterId, FilterIndex};
use crate::id::Id;

pub type QueryId = usize;
pub type SystemId = u32;

/// One term of a query. `Has(pair_id)`/`Not(pair_id)` work for wildcard pair ids
/// (`relation::wildcard_target_pair`/`wildcard_relation_pair`) exactly
/// like any other id, since a wildcard pair is itself an ordinary `Id`.
#[derive(Debug, Clone, Copy)]
pub enum Term {
    Has(Id),
    Not(Id),
    Added(Id),
    Changed(Id),
}

/// Split a term list into the four sets a [`Query`] is built from.
#[derive(Debug, Clone, Default)]
pub struct QueryDef {
    pub include: Vec<Id>,
    pub exclude: Vec<Id>,
    pub added: Vec<Id>,
    pub changed: Vec<Id>,
}

impl QueryDef {
    pub fn from_terms(terms: &[Term]) -> Self {
        let mut def = QueryDef::default();
        for term in terms {
            match *term {
                Term::Has(id) => push_unique(&mut def.include, id),
                Term::Not(id) => push_unique(&mut def.exclude, id),
                Term::Added(id) => push_unique(&mut def.added, id),
                Term::Changed(id) => push_unique(&mut def.changed, id),
            }
        }
        def
    }

    /// The include set a backing [`Filter`] must use: the explicit
    /// `include` terms plus every `added`/`changed` component, since a row
    /// can only be matched against its tick arrays if the archetype
    /// already carries that component.
    pub fn filter_include(&self) -> Vec<Id> {
        let mut out = self.include.clone();
        for &id in self.added.iter().chain(self.changed.iter()) {
            push_unique(&mut out, id);
        }
        out
    }

    fn signature(&self) -> String {
        let fmt = |ids: &[Id]| {
            let mut bits: Vec<u32> = ids.iter().map(|i| i.bits()).collect();
            bits.sort_unstable();
            bits.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
        };
        format!(
            "{}/{}/{}/{}",
            fmt(&self.include),
            fmt(&self.exclude),
            fmt(&self.added),
            fmt(&self.changed)
        )
    }
}

fn push_unique(ids: &mut Vec<Id>, id: Id) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

/// Which `lastTick` channel a fetch call reads/advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickChannel {
    /// Tracked for callers fetching outside any scheduled system.
    SelfCaller,
    /// Tracked per-system, published by the external scheduler.
    System(SystemId),
}

/// A cached query: a filter id plus added/changed modifiers and the dual
/// `lastTick` channels. Tick state lives behind `Cell`/`RefCell` so a
/// fetch can advance it through a shared `&Query` - iteration only ever
/// needs read access to the rest of the world's archetype data, and
/// forcing `&mut World` for every fetch would rule out fetching from
/// within an observer callback that only holds `&World`.
pub struct Query {
    id: QueryId,
    pub filter_id: FilterId,
    pub added: Vec<Id>,
    pub changed: Vec<Id>,
    last_tick_self: Cell<u32>,
    last_tick_by_system: RefCell<FxHashMap<SystemId, u32>>,
}

impl Query {
    fn new(id: QueryId, filter_id: FilterId, added: Vec<Id>, changed: Vec<Id>) -> Self {
        Query {
            id,
            filter_id,
            added,
            changed,
            last_tick_self: Cell::new(0),
            last_tick_by_system: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn has_change_modifiers(&self) -> bool {
        !self.added.is_empty() || !self.changed.is_empty()
    }

    pub fn last_tick(&self, channel: TickChannel) -> u32 {
        match channel {
            TickChannel::SelfCaller => self.last_tick_self.get(),
            TickChannel::System(id) => self.last_tick_by_system.borrow().get(&id).copied().unwrap_or(0),
        }
    }

    fn advance(&self, channel: TickChannel, tick: u32) {
        match channel {
            TickChannel::SelfCaller => self.last_tick_self.set(tick),
            TickChannel::System(id) => {
                self.last_tick_by_system.borrow_mut().insert(id, tick);
            }
        }
    }
}

/// Owns every live [`Query`], deduplicated by `(include, exclude, added,
/// changed)` signature, and the [`FilterIndex`] that backs them.
#[derive(Default)]
pub struct QueryCache {
    queries: FxHashMap<QueryId, Query>,
    by_signature: FxHashMap<String, QueryId>,
    next_id: QueryId,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the query for `def`, creating its backing filter
    /// through `filter_index` if needed. Returns `(query_id,
    /// query_created, filter_id, filter_created)` so the caller can fire
    /// `filterCreated`/queries don't need their own lifecycle event.
    pub fn ensure(
        &mut self,
        filter_index: &mut FilterIndex,
        archetypes: &[Archetype],
        def: QueryDef,
    ) -> (QueryId, bool, FilterId, bool) {
        let sig = def.signature();
        if let Some(&id) = self.by_signature.get(&sig) {
            let filter_id = self.queries[&id].filter_id;
            return (id, false, filter_id, false);
        }
        let (filter_id, filter_created) = filter_index.ensure(def.filter_include(), def.exclude.clone(), archetypes);
        let id = self.next_id;
        self.next_id += 1;
        self.queries.insert(id, Query::new(id, filter_id, def.added, def.changed));
        self.by_signature.insert(sig, id);
        (id, true, filter_id, filter_created)
    }

    pub fn get(&self, id: QueryId) -> Option<&Query> {
        self.queries.get(&id)
    }

    pub fn destroy(&mut self, id: QueryId) -> Option<FilterId> {
        let filter_id = self.queries.remove(&id).map(|q| q.filter_id);
        if filter_id.is_some() {
            self.by_signature.retain(|_, v| *v != id);
        }
        filter_id
    }

    /// Whether any remaining query still references `filter_id`, used by
    /// `World::destroy_query` to decide whether the backing filter can be
    /// torn down too.
    pub fn filter_in_use(&self, filter_id: FilterId) -> bool {
        self.queries.values().any(|q| q.filter_id == filter_id)
    }

    pub fn clear(&mut self) {
        self.queries.clear();
        self.by_signature.clear();
    }
}

/// Lazily walks every archetype in a filter's cached list, each in
/// reverse row order, yielding rows whose `added`/`changed` ticks (when
/// the query has modifiers) fall in `(since, current_tick]`.
///
/// `Drop` advances the query's tick channel unconditionally, whether the
/// caller exhausts the iterator, breaks out of a `for` loop early, or
/// unwinds through it via `?`/panic - the only case that skips the
/// advance is the "no tick channel to advance safely" shortcut taken
/// when change modifiers are requested outside any system context.
pub struct QueryIter<'a> {
    query: &'a Query,
    archetypes: &'a [Archetype],
    arch_list: &'a [usize],
    arch_pos: usize,
    cur: Option<(&'a Archetype, usize)>,
    added: &'a [Id],
    changed: &'a [Id],
    since: u32,
    current_tick: u32,
    channel: TickChannel,
    skip_advance: bool,
}

impl<'a> QueryIter<'a> {
    fn passes(&self, arch: &Archetype, row: usize) -> bool {
        for &c in self.added {
            let Some(ticks) = arch.ticks(c) else { return false };
            let t = ticks.added_tick(row);
            if !(self.since < t && t <= self.current_tick) {
                return false;
            }
        }
        for &c in self.changed {
            let Some(ticks) = arch.ticks(c) else { return false };
            let t = ticks.changed_tick(row);
            if !(self.since < t && t <= self.current_tick) {
                return false;
            }
        }
        true
    }
}

impl<'a> Iterator for QueryIter<'a> {
    type Item = Id;

    fn next(&mut self) -> Option<Id> {
        loop {
            match self.cur {
                None => {
                    if self.arch_pos >= self.arch_list.len() {
                        return None;
                    }
                    let arch_id = self.arch_list[self.arch_pos];
                    self.arch_pos += 1;
                    let Some(arch) = self.archetypes.get(arch_id) else { continue };
                    if arch.is_empty() {
                        continue;
                    }
                    self.cur = Some((arch, arch.len() - 1));
                }
                Some((arch, row)) => {
                    self.cur = if row == 0 { None } else { Some((arch, row - 1)) };
                    if !self.passes(arch, row) {
                        continue;
                    }
                    if let Some(entity) = arch.entity_at(row) {
                        return Some(entity);
                    }
                }
            }
        }
    }
}

impl<'a> Drop for QueryIter<'a> {
    fn drop(&mut self) {
        if !self.skip_advance {
            self.query.advance(self.channel, self.current_tick);
        }
    }
}

/// Build the iterator for one fetch call. `current_system` is the
/// scheduler-published system id for the caller's current execution
/// context, or `None` outside any system.
pub fn fetch<'a>(
    query: &'a Query,
    filter: &'a Filter,
    archetypes: &'a [Archetype],
    current_tick: u32,
    current_system: Option<SystemId>,
) -> QueryIter<'a> {
    let channel = match current_system {
        Some(id) => TickChannel::System(id),
        None => TickChannel::SelfCaller,
    };
    let outside_system_with_modifiers = current_system.is_none() && query.has_change_modifiers();
    let since = query.last_tick(channel);
    QueryIter {
        query,
        archetypes,
        arch_list: if outside_system_with_modifiers { &[] } else { filter.archetypes() },
        arch_pos: 0,
        cur: None,
        added: &query.added,
        changed: &query.changed,
        since,
        current_tick,
        channel,
        skip_advance: outside_system_with_modifiers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn schema_of(_id: Id) -> Option<Schema> {
        Some(Schema::tag())
    }

    #[test]
    fn reverse_row_order_is_deletion_safe() {
        let a = Id::component(1).unwrap();
        let mut arch = Archetype::new(0, vec![a], schema_of);
        let e0 = Id::entity(0, 0).unwrap();
        let e1 = Id::entity(1, 0).unwrap();
        let e2 = Id::entity(2, 0).unwrap();
        arch.allocate_row(e0, 1);
        arch.allocate_row(e1, 1);
        arch.allocate_row(e2, 1);
        let archetypes = vec![arch];
        let mut filter_index = FilterIndex::new();
        let (filter_id, _) = filter_index.ensure(vec![a], vec![], &archetypes);
        let mut cache = QueryCache::new();
        let def = QueryDef { include: vec![a], ..Default::default() };
        let (query_id, _, _, _) = cache.ensure(&mut filter_index, &archetypes, def);
        let query = cache.get(query_id).unwrap();
        let filter = filter_index.get(filter_id).unwrap();
        let got: Vec<Id> = fetch(query, filter, &archetypes, 1, None).collect();
        assert_eq!(got, vec![e2, e1, e0]);
        let _ = filter_id;
    }

    #[test]
    fn added_filter_skips_rows_outside_window() {
        let a = Id::component(1).unwrap();
        let mut arch = Archetype::new(0, vec![a], schema_of);
        let e0 = Id::entity(0, 0).unwrap();
        arch.allocate_row(e0, 1);
        let archetypes = vec![arch];
        let mut filter_index = FilterIndex::new();
        let mut cache = QueryCache::new();
        let def = QueryDef { added: vec![a], ..Default::default() };
        let (query_id, _, filter_id, _) = cache.ensure(&mut filter_index, &archetypes, def);
        let query = cache.get(query_id).unwrap();
        let filter = filter_index.get(filter_id).unwrap();
        let got: Vec<Id> = fetch(query, filter, &archetypes, 1, Some(7)).collect();
        assert_eq!(got, vec![e0]);
        let got_again: Vec<Id> = fetch(query, filter, &archetypes, 1, Some(7)).collect();
        assert!(got_again.is_empty());
    }

    #[test]
    fn change_modifiers_outside_system_yield_nothing() {
        let a = Id::component(1).unwrap();
        let mut arch = Archetype::new(0, vec![a], schema_of);
        arch.allocate_row(Id::entity(0, 0).unwrap(), 1);
        let archetypes = vec![arch];
        let mut filter_index = FilterIndex::new();
        let mut cache = QueryCache::new();
        let def = QueryDef { changed: vec![a], ..Default::default() };
        let (query_id, _, filter_id, _) = cache.ensure(&mut filter_index, &archetypes, def);
        let query = cache.get(query_id).unwrap();
        let filter = filter_index.get(filter_id).unwrap();
        let got: Vec<Id> = fetch(query, filter, &archetypes, 1, None).collect();
        assert!(got.is_empty());
    }

    #[test]
    fn two_systems_see_independent_tick_channels() {
        let a = Id::component(1).unwrap();
        let mut arch = Archetype::new(0, vec![a], schema_of);
        let e0 = Id::entity(0, 0).unwrap();
        arch.allocate_row(e0, 5);
        let archetypes = vec![arch];
        let mut filter_index = FilterIndex::new();
        let mut cache = QueryCache::new();
        let def = QueryDef { added: vec![a], ..Default::default() };
        let (query_id, _, filter_id, _) = cache.ensure(&mut filter_index, &archetypes, def);
        let query = cache.get(query_id).unwrap();
        let filter = filter_index.get(filter_id).unwrap();
        let sys_a: Vec<Id> = fetch(query, filter, &archetypes, 5, Some(1)).collect();
        let sys_b: Vec<Id> = fetch(query, filter, &archetypes, 5, Some(2)).collect();
        assert_eq!(sys_a, vec![e0]);
        assert_eq!(sys_b, vec![e0]);
    }
}

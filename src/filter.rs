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

//! Filter index: cached archetype membership lists for an
//! include/exclude type signature, kept current as archetypes come and
//! go rather than rescanned from scratch on every query.
//!
//! An include/exclude signature is matched against each archetype once,
//! the first time it's seen, rather than re-scanned on every query call;
//! the cache is then kept current incrementally off
//! `archetypeCreated`/`archetypeDestroyed` (`observer.rs`).

use rustc_hash::FxHashMap;

use crate::archetype::{Archetype, ArchetypeId};
use crate::id::Id;
use crate::relation;

pub type FilterId = usize;

/// A single cached filter: the include/exclude type sets plus the
/// archetype ids currently matching them.
pub struct Filter {
    pub include: Vec<Id>,
    pub exclude: Vec<Id>,
    archetypes: Vec<ArchetypeId>,
}

impl Filter {
    fn matches(&self, archetype: &Archetype) -> bool {
        let types = archetype.types();
        let has = |want: Id| {
            if want.is_pair() && (relation::is_wildcard_relation(want) || relation::is_wildcard_target(want)) {
                types.iter().any(|&t| relation::matches_pair_filter(t, want))
            } else {
                types.contains(&want)
            }
        };
        self.include.iter().all(|&want| has(want)) && !self.exclude.iter().any(|&want| has(want))
    }

    pub fn archetypes(&self) -> &[ArchetypeId] {
        &self.archetypes
    }
}

fn canonical_key(include: &[Id], exclude: &[Id]) -> String {
    let mut inc: Vec<u32> = include.iter().map(|i| i.bits()).collect();
    let mut exc: Vec<u32> = exclude.iter().map(|i| i.bits()).collect();
    inc.sort_unstable();
    exc.sort_unstable();
    format!(
        "{}|{}",
        inc.iter().map(u32::to_string).collect::<Vec<_>>().join(","),
        exc.iter().map(u32::to_string).collect::<Vec<_>>().join(","),
    )
}

/// Owns every live [`Filter`], deduplicated by (include, exclude)
/// signature so two identical queries share one cached archetype list.
#[derive(Default)]
pub struct FilterIndex {
    filters: FxHashMap<FilterId, Filter>,
    by_signature: FxHashMap<String, FilterId>,
    next_id: FilterId,
}

impl FilterIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the filter for `include`/`exclude`, scanning
    /// `archetypes` once to seed its cache if newly created. Returns the
    /// filter id and whether it was freshly created (so the caller can
    /// fire `filterCreated`).
    pub fn ensure(&mut self, include: Vec<Id>, exclude: Vec<Id>, archetypes: &[Archetype]) -> (FilterId, bool) {
        let key = canonical_key(&include, &exclude);
        if let Some(&id) = self.by_signature.get(&key) {
            return (id, false);
        }
        let id = self.next_id;
        self.next_id += 1;
        let mut filter = Filter { include, exclude, archetypes: Vec::new() };
        for arch in archetypes {
            if filter.matches(arch) {
                filter.archetypes.push(arch.id());
            }
        }
        self.filters.insert(id, filter);
        self.by_signature.insert(key, id);
        (id, true)
    }

    pub fn get(&self, id: FilterId) -> Option<&Filter> {
        self.filters.get(&id)
    }

    pub fn destroy(&mut self, id: FilterId) -> bool {
        if let Some(filter) = self.filters.remove(&id) {
            let key = canonical_key(&filter.include, &filter.exclude);
            self.by_signature.remove(&key);
            true
        } else {
            false
        }
    }

    /// React to a newly created archetype: add it to every filter it
    /// matches. Called from `World` right after the archetype is pushed
    /// into its store and the `archetypeCreated` event fires.
    pub fn on_archetype_created(&mut self, archetype: &Archetype) {
        for filter in self.filters.values_mut() {
            if filter.matches(archetype) {
                filter.archetypes.push(archetype.id());
            }
        }
    }

    /// React to an archetype going away. Archetypes are never actually
    /// removed from `World`'s `Vec` (ids are stable indices), but this
    /// keeps the hook symmetrical with `archetypeCreated` for the rare
    /// case of `resetWorld` clearing everything at once.
    pub fn on_archetype_destroyed(&mut self, archetype_id: ArchetypeId) {
        for filter in self.filters.values_mut() {
            filter.archetypes.retain(|&id| id != archetype_id);
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn clear(&mut self) {
        self.filters.clear();
        self.by_signature.clear();
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
    fn ensure_deduplicates_by_signature() {
        let a = Id::component(1).unwrap();
        let b = Id::component(2).unwrap();
        let mut index = FilterIndex::new();
        let archetypes = vec![];
        let (id1, created1) = index.ensure(vec![a], vec![b], &archetypes);
        let (id2, created2) = index.ensure(vec![a], vec![b], &archetypes);
        assert_eq!(id1, id2);
        assert!(created1);
        assert!(!created2);
    }

    #[test]
    fn matches_include_and_excludes() {
        let a = Id::component(1).unwrap();
        let b = Id::component(2).unwrap();
        let c = Id::component(3).unwrap();
        let arch_match = Archetype::new(0, vec![a, b], schema_of);
        let arch_excluded = Archetype::new(1, vec![a, b, c], schema_of);
        let arch_missing = Archetype::new(2, vec![a], schema_of);
        let archetypes = vec![arch_match, arch_excluded, arch_missing];
        let mut index = FilterIndex::new();
        let (id, _) = index.ensure(vec![a, b], vec![c], &archetypes);
        assert_eq!(index.get(id).unwrap().archetypes(), &[0]);
    }

    #[test]
    fn newly_created_archetype_joins_matching_filters() {
        let a = Id::component(1).unwrap();
        let mut index = FilterIndex::new();
        let (id, _) = index.ensure(vec![a], vec![], &[]);
        let arch = Archetype::new(5, vec![a], schema_of);
        index.on_archetype_created(&arch);
        assert_eq!(index.get(id).unwrap().archetypes(), &[5]);
    }

    #[test]
    fn wildcard_pair_include_matches_any_target() {
        let relation = Id::relation(1).unwrap();
        let target = Id::entity(9, 0).unwrap();
        let pair = relation::pair(relation, target).unwrap();
        let arch = Archetype::new(0, vec![pair], schema_of);
        let mut index = FilterIndex::new();
        let wildcard = relation::wildcard_target_pair(relation).unwrap();
        let (id, _) = index.ensure(vec![wildcard], vec![], &[arch]);
        assert_eq!(index.get(id).unwrap().archetypes(), &[0]);
    }
}

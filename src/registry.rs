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

//! Process-global component/tag/relation type registry.
//!
//! Deliberately decoupled from any one `World`: a component/relation
//! *definition* is process-wide, since the same `Id` must mean the same
//! schema no matter which `World` it's used with. `parking_lot::RwLock`
//! over a lazily initialized `static`.
//!
//! Entity, tag, and component ids all draw their raw value from a single
//! shared counter (`next_plain_raw`) rather than one counter per kind, so
//! an `Entity`, a `Tag`, and a `Component` never end up with the same raw
//! id - `EntityStore::allocate` (`entity.rs`) pulls fresh raw ids from
//! here too. Raw 0 is never handed out, mirroring
//! `EntityStore`'s own reservation of that slot for
//! `relation::WILDCARD_TARGET_RAW`.

use std::sync::OnceLock;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::{EcsError, Result};
use crate::id::Id;
use crate::schema::Schema;

/// What happens to entities holding `(relation, target)` when `target` is
/// destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDeleteTarget {
    /// Strip the pair (and its wildcard companions) from holders, leaving
    /// them alive.
    Remove,
    /// Destroy holders too, cascading recursively.
    Delete,
}

#[derive(Debug, Clone)]
pub struct ComponentMeta {
    pub id: Id,
    pub name: String,
    pub schema: Schema,
}

#[derive(Debug, Clone)]
pub struct TagMeta {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct RelationMeta {
    pub id: Id,
    pub name: String,
    pub exclusive: bool,
    pub on_delete_target: OnDeleteTarget,
    /// Optional payload schema for pairs formed from this relation.
    /// Unset for the common case of a pure marker relation.
    pub schema: Option<Schema>,
}

struct RegistryInner {
    /// Shared by `define_component`, `define_tag`, and
    /// `EntityStore::allocate` - the single raw-id counter for the whole
    /// entity/tag/component space. Starts at 1: raw 0 is reserved for
    /// `relation::WILDCARD_TARGET_RAW`, never handed to any of the three.
    next_plain_raw: u32,
    /// Starts at 1: raw 0 is reserved for `relation::WILDCARD_RELATION_RAW`,
    /// never handed to a user-defined relation.
    next_relation_raw: u32,
    by_name: AHashMap<String, Id>,
    components: AHashMap<Id, ComponentMeta>,
    tags: AHashMap<Id, TagMeta>,
    relations: AHashMap<Id, RelationMeta>,
}

impl Default for RegistryInner {
    fn default() -> Self {
        Self {
            next_plain_raw: 1,
            next_relation_raw: 1,
            by_name: AHashMap::new(),
            components: AHashMap::new(),
            tags: AHashMap::new(),
            relations: AHashMap::new(),
        }
    }
}

static REGISTRY: OnceLock<RwLock<RegistryInner>> = OnceLock::new();

fn registry() -> &'static RwLock<RegistryInner> {
    REGISTRY.get_or_init(|| RwLock::new(RegistryInner::default()))
}

fn check_name_free(inner: &RegistryInner, name: &str) -> Result<()> {
    if inner.by_name.contains_key(name) {
        Err(EcsError::Duplicate(format!("type name {name:?} already registered")))
    } else {
        Ok(())
    }
}

fn next_plain_raw_locked(inner: &mut RegistryInner) -> Result<u32> {
    let raw = inner.next_plain_raw;
    if raw >= crate::id::MAX_RAW_ID {
        return Err(EcsError::LimitExceeded("entity/tag/component raw-id space exhausted".into()));
    }
    inner.next_plain_raw += 1;
    Ok(raw)
}

/// Allocate a fresh raw id from the single id space shared by the
/// `Entity`, `Tag`, and `Component` kinds. Called directly by
/// `EntityStore::allocate` so a `World`'s entities never collide on raw
/// value with a process-wide tag or component.
pub fn allocate_plain_raw() -> Result<u32> {
    let mut inner = registry().write();
    next_plain_raw_locked(&mut inner)
}

/// Define a data-carrying component type, returning its process-wide id.
pub fn define_component(name: &str, schema: Schema) -> Result<Id> {
    let mut inner = registry().write();
    check_name_free(&inner, name)?;
    let raw = next_plain_raw_locked(&mut inner)?;
    let id = Id::component(raw)?;
    inner.by_name.insert(name.to_string(), id);
    inner.components.insert(id, ComponentMeta { id, name: name.to_string(), schema });
    Ok(id)
}

/// Define a zero-size marker (tag) type, returning its process-wide id.
pub fn define_tag(name: &str) -> Result<Id> {
    let mut inner = registry().write();
    check_name_free(&inner, name)?;
    let raw = next_plain_raw_locked(&mut inner)?;
    let id = Id::tag(raw)?;
    inner.by_name.insert(name.to_string(), id);
    inner.tags.insert(id, TagMeta { id, name: name.to_string() });
    Ok(id)
}

/// Define a relation type, returning its process-wide id. `exclusive`
/// relations reparent (adding a new pair removes any previous pair
/// sharing the same relation) rather than coexisting.
pub fn define_relation(
    name: &str,
    exclusive: bool,
    on_delete_target: OnDeleteTarget,
    schema: Option<Schema>,
) -> Result<Id> {
    let mut inner = registry().write();
    check_name_free(&inner, name)?;
    let raw = inner.next_relation_raw;
    if raw as usize >= crate::id::MAX_RELATION_RAW as usize {
        return Err(EcsError::LimitExceeded("relation raw-id space exhausted".into()));
    }
    let id = Id::relation(raw as u8)?;
    inner.next_relation_raw += 1;
    inner.by_name.insert(name.to_string(), id);
    inner.relations.insert(
        id,
        RelationMeta { id, name: name.to_string(), exclusive, on_delete_target, schema },
    );
    Ok(id)
}

pub fn lookup(name: &str) -> Option<Id> {
    registry().read().by_name.get(name).copied()
}

pub fn component_meta(id: Id) -> Option<ComponentMeta> {
    registry().read().components.get(&id).cloned()
}

pub fn tag_meta(id: Id) -> Option<TagMeta> {
    registry().read().tags.get(&id).cloned()
}

pub fn relation_meta(id: Id) -> Option<RelationMeta> {
    registry().read().relations.get(&id).cloned()
}

pub fn is_exclusive(relation: Id) -> bool {
    registry().read().relations.get(&relation).map(|m| m.exclusive).unwrap_or(false)
}

pub fn on_delete_target(relation: Id) -> OnDeleteTarget {
    registry()
        .read()
        .relations
        .get(&relation)
        .map(|m| m.on_delete_target)
        .unwrap_or(OnDeleteTarget::Remove)
}

pub fn name_of(id: Id) -> Option<String> {
    let inner = registry().read();
    inner
        .components
        .get(&id)
        .map(|m| m.name.clone())
        .or_else(|| inner.tags.get(&id).map(|m| m.name.clone()))
        .or_else(|| inner.relations.get(&id).map(|m| m.name.clone()))
}

/// Wipe every definition. Exists only for test isolation across a process
/// that otherwise treats the registry as append-only for its lifetime.
#[cfg(test)]
pub fn reset_for_tests() {
    *registry().write() = RegistryInner::default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;
    use std::sync::Mutex;

    // Serializes tests in this module since the registry is process-global.
    static LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn define_and_lookup_component() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let id = define_component("Position", Schema::new(vec![("x", FieldKind::F32), ("y", FieldKind::F32)]).unwrap()).unwrap();
        assert_eq!(lookup("Position"), Some(id));
        assert_eq!(component_meta(id).unwrap().name, "Position");
    }

    #[test]
    fn duplicate_name_rejected() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        define_tag("Marker").unwrap();
        assert!(define_tag("Marker").is_err());
    }

    #[test]
    fn tag_component_and_entity_raws_never_collide() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let tag = define_tag("FirstTag").unwrap();
        let component =
            define_component("FirstComponent", Schema::new(vec![("x", FieldKind::F32)]).unwrap()).unwrap();
        let mut store = crate::entity::EntityStore::new();
        let entity = store.allocate().unwrap();
        assert_ne!(tag.raw(), component.raw());
        assert_ne!(tag.raw(), entity.raw());
        assert_ne!(component.raw(), entity.raw());
        assert_ne!(tag.raw(), 0);
        assert_ne!(component.raw(), 0);
    }

    #[test]
    fn relation_metadata_roundtrips() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let rel = define_relation("ChildOf", true, OnDeleteTarget::Delete, None).unwrap();
        assert!(is_exclusive(rel));
        assert_eq!(on_delete_target(rel), OnDeleteTarget::Delete);
    }

    #[test]
    fn first_user_relation_never_takes_raw_zero() {
        let _guard = LOCK.lock().unwrap();
        reset_for_tests();
        let rel = define_relation("ChildOf", false, OnDeleteTarget::Remove, None).unwrap();
        assert_ne!(rel.raw(), 0);
    }
}

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

//! Archetype storage: Structure-of-Arrays table keyed by an exact set of
//! component ids, with a bidirectional single-component transition-edge
//! cache.
//!
//! Each archetype is keyed by a runtime `Id` set (not a compile-time
//! `TypeId` signature) with a schema resolved per type, an `FxHashMap`
//! component index, and swap-remove row deletion. Every data-carrying
//! type gets one `Column` per schema field rather than one column for the
//! whole type, so `columns[c][f][i]` is real
//! rather than collapsed to the first field.

use rustc_hash::FxHashMap;

use crate::column::{Column, TickColumn};
use crate::error::{EcsError, Result};
use crate::id::Id;
use crate::schema::{Schema, Value};

pub type ArchetypeId = usize;

const INITIAL_CAPACITY: usize = 16;
const GROWTH_FACTOR: usize = 4;

/// Canonical hash key for a sorted type-id list: colon-joined decimal
/// `Id::bits()`, e.g. `"1:5:12"`. The empty archetype hashes to `""`.
pub fn signature_key(types: &[Id]) -> String {
    types
        .iter()
        .map(|id| id.bits().to_string())
        .collect::<Vec<_>>()
        .join(":")
}

/// One archetype: a fixed set of component/tag/relation ids, one column
/// per schema field per data-carrying id, one tick-pair per id, and the
/// transition edges reachable by adding/removing a single id.
pub struct Archetype {
    id: ArchetypeId,
    types: Vec<Id>,
    index_of: FxHashMap<Id, usize>,
    schemas: Vec<Schema>,
    entities: Vec<Id>,
    /// `columns[i]` is `None` for tags, `Some(one Column per schema field)`
    /// otherwise. Lazily allocated: stays empty until the first row lands.
    columns: Vec<Option<Vec<Column>>>,
    ticks: Vec<Option<TickColumn>>,
    capacity: usize,
    edges_add: FxHashMap<Id, ArchetypeId>,
    edges_remove: FxHashMap<Id, ArchetypeId>,
    /// Set once this archetype has been torn down by `World::destroy_archetype`
    /// (one of its component ids was itself destroyed). `types` and `id` stay
    /// intact for bookkeeping; the slot is never reused, since `ArchetypeId`
    /// is a stable `Vec` index.
    destroyed: bool,
}

impl Archetype {
    /// Build a new archetype for `types` (must already be sorted and
    /// deduplicated by the caller - `World` owns that invariant). Columns
    /// and ticks are *not* allocated here; they come into being on the
    /// first `allocate_row` call - capacity is 0 before that.
    pub fn new(id: ArchetypeId, types: Vec<Id>, schema_of: impl Fn(Id) -> Option<Schema>) -> Self {
        let mut index_of = FxHashMap::default();
        let mut schemas = Vec::with_capacity(types.len());
        let mut columns = Vec::with_capacity(types.len());
        let mut ticks = Vec::with_capacity(types.len());
        for (i, &type_id) in types.iter().enumerate() {
            index_of.insert(type_id, i);
            let schema = schema_of(type_id).unwrap_or_else(Schema::tag);
            if schema.is_tag() {
                columns.push(None);
                ticks.push(None);
            } else {
                columns.push(None);
                ticks.push(None);
            }
            schemas.push(schema);
        }
        Archetype {
            id,
            types,
            index_of,
            schemas,
            entities: Vec::new(),
            columns,
            ticks,
            capacity: 0,
            edges_add: FxHashMap::default(),
            edges_remove: FxHashMap::default(),
            destroyed: false,
        }
    }

    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    pub fn types(&self) -> &[Id] {
        &self.types
    }

    pub fn key(&self) -> String {
        signature_key(&self.types)
    }

    pub fn has(&self, type_id: Id) -> bool {
        self.index_of.contains_key(&type_id)
    }

    pub fn entities(&self) -> &[Id] {
        &self.entities
    }

    pub fn entity_at(&self, row: usize) -> Option<Id> {
        self.entities.get(row).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn schema(&self, type_id: Id) -> Option<&Schema> {
        let idx = *self.index_of.get(&type_id)?;
        Some(&self.schemas[idx])
    }

    pub fn field_index(&self, type_id: Id, name: &str) -> Option<usize> {
        self.schema(type_id)?.field_index(name)
    }

    pub fn edge_add(&self, type_id: Id) -> Option<ArchetypeId> {
        self.edges_add.get(&type_id).copied()
    }

    pub fn edge_remove(&self, type_id: Id) -> Option<ArchetypeId> {
        self.edges_remove.get(&type_id).copied()
    }

    pub fn set_edge_add(&mut self, type_id: Id, target: ArchetypeId) {
        self.edges_add.insert(type_id, target);
    }

    pub fn set_edge_remove(&mut self, type_id: Id, target: ArchetypeId) {
        self.edges_remove.insert(type_id, target);
    }

    fn ensure_columns_allocated(&mut self) {
        for (i, schema) in self.schemas.iter().enumerate() {
            if schema.is_tag() {
                continue;
            }
            if self.columns[i].is_none() {
                self.columns[i] = Some(
                    schema
                        .fields()
                        .iter()
                        .map(|f| Column::new_for_kind(f.kind))
                        .collect(),
                );
            }
            if self.ticks[i].is_none() {
                self.ticks[i] = Some(TickColumn::new());
            }
        }
    }

    fn grow_if_needed(&mut self) {
        if self.entities.len() < self.capacity {
            return;
        }
        self.capacity = if self.capacity == 0 {
            INITIAL_CAPACITY
        } else {
            self.capacity * GROWTH_FACTOR
        };
    }

    /// Push a new row for `entity`, giving every data-carrying column its
    /// sentinel value and stamping fresh `added`/`changed` ticks.
    pub fn allocate_row(&mut self, entity: Id, tick: u32) -> usize {
        self.ensure_columns_allocated();
        self.grow_if_needed();
        let row = self.entities.len();
        self.entities.push(entity);
        for cols in self.columns.iter_mut().flatten() {
            for col in cols.iter_mut() {
                col.push_sentinel();
            }
        }
        for t in self.ticks.iter_mut().flatten() {
            t.push(tick);
        }
        row
    }

    /// Swap-remove `row`. Returns the entity now occupying `row`, if the
    /// removed row wasn't already the last one.
    pub fn remove_row(&mut self, row: usize) -> Option<Id> {
        self.entities.swap_remove(row);
        for cols in self.columns.iter_mut().flatten() {
            for col in cols.iter_mut() {
                col.swap_remove_drop(row);
            }
        }
        for t in self.ticks.iter_mut().flatten() {
            t.swap_remove(row);
        }
        self.entities.get(row).copied()
    }

    pub fn get_value(&self, row: usize, type_id: Id, field: usize) -> Option<Value> {
        let idx = *self.index_of.get(&type_id)?;
        self.columns[idx].as_ref()?.get(field)?.get(row)
    }

    pub fn set_value(&mut self, row: usize, type_id: Id, field: usize, value: Value, tick: u32) -> Result<()> {
        let idx = *self.index_of.get(&type_id).ok_or(EcsError::ComponentNotFound)?;
        let cols = self.columns[idx].as_mut().ok_or(EcsError::ComponentNotFound)?;
        let col = cols.get_mut(field).ok_or(EcsError::ComponentNotFound)?;
        col.set(row, value)?;
        if let Some(t) = self.ticks[idx].as_mut() {
            t.mark_changed(row, tick);
        }
        Ok(())
    }

    pub fn get_boxed(&self, row: usize, type_id: Id, field: usize) -> Option<&(dyn std::any::Any + Send + Sync)> {
        let idx = *self.index_of.get(&type_id)?;
        self.columns[idx].as_ref()?.get(field)?.get_boxed(row)
    }

    pub fn get_boxed_mut(
        &mut self,
        row: usize,
        type_id: Id,
        field: usize,
        tick: u32,
    ) -> Option<&mut (dyn std::any::Any + Send + Sync)> {
        let idx = *self.index_of.get(&type_id)?;
        if let Some(t) = self.ticks[idx].as_mut() {
            t.mark_changed(row, tick);
        }
        self.columns[idx].as_mut()?.get_mut(field)?.get_boxed_mut(row)
    }

    pub fn ticks(&self, type_id: Id) -> Option<&TickColumn> {
        let idx = *self.index_of.get(&type_id)?;
        self.ticks[idx].as_ref()
    }

    pub fn mark_changed(&mut self, row: usize, type_id: Id, tick: u32) {
        if let Some(&idx) = self.index_of.get(&type_id) {
            self.ensure_columns_allocated();
            if let Some(t) = self.ticks[idx].as_mut() {
                t.mark_changed(row, tick);
            }
        }
    }

    /// Move the row at `row` out of `self` and into `dst`, matching
    /// types by id. Ids present only in `self` are dropped; ids present
    /// only in `dst` get a fresh sentinel + tick. Returns the entity now
    /// occupying `row` in `self` (the swap-in), if any.
    pub fn transfer_row(&mut self, row: usize, dst: &mut Archetype, entity: Id, tick: u32) -> Option<Id> {
        self.ensure_columns_allocated();
        dst.ensure_columns_allocated();
        dst.grow_if_needed();
        let new_row = dst.entities.len();
        for (&type_id, &src_idx) in self.index_of.clone().iter() {
            let dst_idx = dst.index_of.get(&type_id).copied();
            let added = self.ticks[src_idx].as_ref().map(|t| t.added_tick(row)).unwrap_or(tick);
            let changed = self.ticks[src_idx].as_ref().map(|t| t.changed_tick(row)).unwrap_or(tick);
            match dst_idx {
                Some(dst_idx) => {
                    if let (Some(src_cols), Some(dst_cols)) =
                        (self.columns[src_idx].as_mut(), dst.columns[dst_idx].as_mut())
                    {
                        for (f, dst_col) in dst_cols.iter_mut().enumerate() {
                            if let Some(src_col) = src_cols.get_mut(f) {
                                let _ = src_col.move_row(row, dst_col);
                            }
                        }
                    }
                    if let Some(dst_tick) = dst.ticks[dst_idx].as_mut() {
                        dst_tick.push(added);
                        dst_tick.mark_changed(new_row, changed);
                    }
                }
                None => {
                    if let Some(cols) = self.columns[src_idx].as_mut() {
                        for col in cols.iter_mut() {
                            col.swap_remove_drop(row);
                        }
                    }
                }
            }
            if let Some(t) = self.ticks[src_idx].as_mut() {
                t.swap_remove(row);
            }
        }
        for (&type_id, &dst_idx) in dst.index_of.clone().iter() {
            if !self.index_of.contains_key(&type_id) {
                if let Some(cols) = dst.columns[dst_idx].as_mut() {
                    for col in cols.iter_mut() {
                        col.push_sentinel();
                    }
                }
                if let Some(t) = dst.ticks[dst_idx].as_mut() {
                    t.push(tick);
                }
            }
        }
        dst.entities.push(entity);
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    pub fn destroy_protected(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Tear down storage in place: `World::destroy_archetype` has already
    /// migrated out any remaining rows, removed this archetype from every
    /// type's back-reference list, and cleared every other archetype's
    /// edges that pointed here. `types`/`id`/`schemas` are kept around so
    /// callers holding a stale `ArchetypeId` see a recognizably-dead,
    /// rather than corrupt, archetype.
    pub fn mark_destroyed(&mut self) {
        self.destroyed = true;
        self.entities.clear();
        self.columns.clear();
        self.ticks.clear();
        self.capacity = 0;
        self.edges_add.clear();
        self.edges_remove.clear();
    }

    /// Drop any cached edge (in either direction) pointing at `target`,
    /// called on every surviving archetype when `target` is destroyed so
    /// stale edges never get traversed into a dead archetype.
    pub fn clear_edges_to(&mut self, target: ArchetypeId) {
        self.edges_add.retain(|_, &mut to| to != target);
        self.edges_remove.retain(|_, &mut to| to != target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    fn schema_of(id: Id) -> Option<Schema> {
        if id == Id::component(0).unwrap() {
            Some(Schema::new(vec![("x", FieldKind::F32), ("y", FieldKind::F32)]).unwrap())
        } else {
            Some(Schema::tag())
        }
    }

    #[test]
    fn allocate_and_remove_row() {
        let types = vec![Id::component(0).unwrap(), Id::tag(0).unwrap()];
        let mut arch = Archetype::new(0, types, schema_of);
        let e1 = Id::entity(1, 0).unwrap();
        let e2 = Id::entity(2, 0).unwrap();
        arch.allocate_row(e1, 1);
        arch.allocate_row(e2, 1);
        assert_eq!(arch.len(), 2);
        assert!(arch.capacity() >= 2);
        let swapped = arch.remove_row(0);
        assert_eq!(swapped, Some(e2));
        assert_eq!(arch.len(), 1);
    }

    #[test]
    fn signature_key_is_colon_joined() {
        let a = Id::component(1).unwrap();
        let b = Id::component(5).unwrap();
        let key = signature_key(&[a, b]);
        assert_eq!(key, format!("{}:{}", a.bits(), b.bits()));
    }

    #[test]
    fn multi_field_component_keeps_every_field() {
        let comp = Id::component(0).unwrap();
        let mut arch = Archetype::new(0, vec![comp], schema_of);
        let e = Id::entity(1, 0).unwrap();
        arch.allocate_row(e, 1);
        arch.set_value(0, comp, 0, Value::F32(1.0), 1).unwrap();
        arch.set_value(0, comp, 1, Value::F32(2.0), 1).unwrap();
        assert_eq!(arch.get_value(0, comp, 0), Some(Value::F32(1.0)));
        assert_eq!(arch.get_value(0, comp, 1), Some(Value::F32(2.0)));
    }

    #[test]
    fn transfer_row_moves_shared_and_drops_removed() {
        let comp = Id::component(0).unwrap();
        let tag = Id::tag(0).unwrap();
        let mut src = Archetype::new(0, vec![comp, tag], schema_of);
        let mut dst = Archetype::new(1, vec![comp], schema_of);
        let e = Id::entity(1, 0).unwrap();
        src.allocate_row(e, 1);
        src.set_value(0, comp, 0, Value::F32(42.0), 1).unwrap();
        src.transfer_row(0, &mut dst, e, 2);
        assert_eq!(src.len(), 0);
        assert_eq!(dst.len(), 1);
        assert_eq!(dst.get_value(0, comp, 0), Some(Value::F32(42.0)));
    }

    #[test]
    fn growth_quadruples_after_initial_sixteen() {
        let mut arch = Archetype::new(0, vec![], schema_of);
        for i in 0..16 {
            arch.allocate_row(Id::entity(i, 0).unwrap(), 1);
        }
        assert_eq!(arch.capacity(), 16);
        arch.allocate_row(Id::entity(16, 0).unwrap(), 1);
        assert_eq!(arch.capacity(), 64);
    }
}

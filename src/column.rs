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

//! Column storage: one densely-packed array per component, per archetype.
//!
//! A column is a small tagged union over the primitive kinds
//! `schema::FieldKind` can describe, plus a boxed fallback - no `unsafe`
//! pointer arithmetic is needed because every variant already knows its
//! own element type.

use std::any::Any;

use crate::error::{EcsError, Result};
use crate::schema::{FieldKind, Value};

/// One component's backing storage for every row of an archetype.
#[derive(Debug)]
pub enum Column {
    /// Boxed rather than contiguous: the schema's typed/contiguous bucket
    /// is reserved for the fixed-width numeric kinds, so `bool` gets one
    /// heap allocation per row like `Boxed` below, but as its own variant
    /// so `get`/`set` can hand back a plain `bool` without an `Any` downcast.
    Bool(Vec<Box<bool>>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Boxed(Vec<Box<dyn Any + Send + Sync>>),
}

impl Column {
    pub fn new_for_kind(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Bool => Column::Bool(Vec::new()),
            FieldKind::I8 => Column::I8(Vec::new()),
            FieldKind::I16 => Column::I16(Vec::new()),
            FieldKind::I32 => Column::I32(Vec::new()),
            FieldKind::I64 => Column::I64(Vec::new()),
            FieldKind::U32 => Column::U32(Vec::new()),
            FieldKind::U64 => Column::U64(Vec::new()),
            FieldKind::F32 => Column::F32(Vec::new()),
            FieldKind::F64 => Column::F64(Vec::new()),
            FieldKind::Boxed => Column::Boxed(Vec::new()),
        }
    }

    /// A fresh, empty column of the same kind - used when an archetype
    /// transition needs to widen or narrow a signature without disturbing
    /// the source archetype's own columns.
    pub fn clone_empty(&self) -> Self {
        match self {
            Column::Bool(_) => Column::Bool(Vec::new()),
            Column::I8(_) => Column::I8(Vec::new()),
            Column::I16(_) => Column::I16(Vec::new()),
            Column::I32(_) => Column::I32(Vec::new()),
            Column::I64(_) => Column::I64(Vec::new()),
            Column::U32(_) => Column::U32(Vec::new()),
            Column::U64(_) => Column::U64(Vec::new()),
            Column::F32(_) => Column::F32(Vec::new()),
            Column::F64(_) => Column::F64(Vec::new()),
            Column::Boxed(_) => Column::Boxed(Vec::new()),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Column::Bool(_) => FieldKind::Bool,
            Column::I8(_) => FieldKind::I8,
            Column::I16(_) => FieldKind::I16,
            Column::I32(_) => FieldKind::I32,
            Column::I64(_) => FieldKind::I64,
            Column::U32(_) => FieldKind::U32,
            Column::U64(_) => FieldKind::U64,
            Column::F32(_) => FieldKind::F32,
            Column::F64(_) => FieldKind::F64,
            Column::Boxed(_) => FieldKind::Boxed,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Bool(v) => v.len(),
            Column::I8(v) => v.len(),
            Column::I16(v) => v.len(),
            Column::I32(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::U32(v) => v.len(),
            Column::U64(v) => v.len(),
            Column::F32(v) => v.len(),
            Column::F64(v) => v.len(),
            Column::Boxed(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push the sentinel value for this column's kind - used when a
    /// component is added via `add_component` without an explicit value.
    pub fn push_sentinel(&mut self) {
        match self {
            Column::Bool(v) => v.push(Box::new(false)),
            Column::I8(v) => v.push(0),
            Column::I16(v) => v.push(0),
            Column::I32(v) => v.push(0),
            Column::I64(v) => v.push(0),
            Column::U32(v) => v.push(0),
            Column::U64(v) => v.push(0),
            Column::F32(v) => v.push(0.0),
            Column::F64(v) => v.push(0.0),
            Column::Boxed(v) => v.push(Box::new(())),
        }
    }

    pub fn push_value(&mut self, value: Value) -> Result<()> {
        match (self, value) {
            (Column::Bool(v), Value::Bool(x)) => v.push(Box::new(x)),
            (Column::I8(v), Value::I8(x)) => v.push(x),
            (Column::I16(v), Value::I16(x)) => v.push(x),
            (Column::I32(v), Value::I32(x)) => v.push(x),
            (Column::I64(v), Value::I64(x)) => v.push(x),
            (Column::U32(v), Value::U32(x)) => v.push(x),
            (Column::U64(v), Value::U64(x)) => v.push(x),
            (Column::F32(v), Value::F32(x)) => v.push(x),
            (Column::F64(v), Value::F64(x)) => v.push(x),
            (col, value) => {
                return Err(EcsError::InvalidArgument(format!(
                    "value kind {:?} does not match column kind {:?}",
                    value.kind(),
                    col.kind()
                )))
            }
        }
        Ok(())
    }

    pub fn push_boxed(&mut self, value: Box<dyn Any + Send + Sync>) -> Result<()> {
        match self {
            Column::Boxed(v) => {
                v.push(value);
                Ok(())
            }
            _ => Err(EcsError::InvalidArgument("column is not a boxed column".into())),
        }
    }

    /// Move row `from` out of `self` and append it to `dst` - used when an
    /// entity transitions to an archetype that keeps this component.
    pub fn move_row(&mut self, from: usize, dst: &mut Column) -> Result<()> {
        match (self, dst) {
            (Column::Bool(s), Column::Bool(d)) => d.push(s.swap_remove(from)),
            (Column::I8(s), Column::I8(d)) => d.push(s.swap_remove(from)),
            (Column::I16(s), Column::I16(d)) => d.push(s.swap_remove(from)),
            (Column::I32(s), Column::I32(d)) => d.push(s.swap_remove(from)),
            (Column::I64(s), Column::I64(d)) => d.push(s.swap_remove(from)),
            (Column::U32(s), Column::U32(d)) => d.push(s.swap_remove(from)),
            (Column::U64(s), Column::U64(d)) => d.push(s.swap_remove(from)),
            (Column::F32(s), Column::F32(d)) => d.push(s.swap_remove(from)),
            (Column::F64(s), Column::F64(d)) => d.push(s.swap_remove(from)),
            (Column::Boxed(s), Column::Boxed(d)) => d.push(s.swap_remove(from)),
            _ => return Err(EcsError::InvalidState("column kind mismatch during transfer".into())),
        }
        Ok(())
    }

    /// Remove row `row`, swapping the last row into its place. Returns
    /// whether a swap occurred (i.e. `row` wasn't already the last row).
    pub fn swap_remove_drop(&mut self, row: usize) {
        match self {
            Column::Bool(v) => {
                v.swap_remove(row);
            }
            Column::I8(v) => {
                v.swap_remove(row);
            }
            Column::I16(v) => {
                v.swap_remove(row);
            }
            Column::I32(v) => {
                v.swap_remove(row);
            }
            Column::I64(v) => {
                v.swap_remove(row);
            }
            Column::U32(v) => {
                v.swap_remove(row);
            }
            Column::U64(v) => {
                v.swap_remove(row);
            }
            Column::F32(v) => {
                v.swap_remove(row);
            }
            Column::F64(v) => {
                v.swap_remove(row);
            }
            Column::Boxed(v) => {
                v.swap_remove(row);
            }
        }
    }

    pub fn get(&self, row: usize) -> Option<Value> {
        match self {
            Column::Bool(v) => v.get(row).map(|b| Value::Bool(**b)),
            Column::I8(v) => v.get(row).copied().map(Value::I8),
            Column::I16(v) => v.get(row).copied().map(Value::I16),
            Column::I32(v) => v.get(row).copied().map(Value::I32),
            Column::I64(v) => v.get(row).copied().map(Value::I64),
            Column::U32(v) => v.get(row).copied().map(Value::U32),
            Column::U64(v) => v.get(row).copied().map(Value::U64),
            Column::F32(v) => v.get(row).copied().map(Value::F32),
            Column::F64(v) => v.get(row).copied().map(Value::F64),
            Column::Boxed(_) => None,
        }
    }

    pub fn get_boxed(&self, row: usize) -> Option<&(dyn Any + Send + Sync)> {
        match self {
            Column::Boxed(v) => v.get(row).map(|b| b.as_ref()),
            _ => None,
        }
    }

    pub fn get_boxed_mut(&mut self, row: usize) -> Option<&mut (dyn Any + Send + Sync)> {
        match self {
            Column::Boxed(v) => v.get_mut(row).map(|b| b.as_mut()),
            _ => None,
        }
    }

    pub fn set(&mut self, row: usize, value: Value) -> Result<()> {
        match (self, value) {
            (Column::Bool(v), Value::Bool(x)) => *v[row] = x,
            (Column::I8(v), Value::I8(x)) => v[row] = x,
            (Column::I16(v), Value::I16(x)) => v[row] = x,
            (Column::I32(v), Value::I32(x)) => v[row] = x,
            (Column::I64(v), Value::I64(x)) => v[row] = x,
            (Column::U32(v), Value::U32(x)) => v[row] = x,
            (Column::U64(v), Value::U64(x)) => v[row] = x,
            (Column::F32(v), Value::F32(x)) => v[row] = x,
            (Column::F64(v), Value::F64(x)) => v[row] = x,
            (col, value) => {
                return Err(EcsError::InvalidArgument(format!(
                    "value kind {:?} does not match column kind {:?}",
                    value.kind(),
                    col.kind()
                )))
            }
        }
        Ok(())
    }
}

/// Per-row `added`/`changed` tick pair, tracked alongside every component
/// column. Grounded on `paddy_ecs::component::tick::ComponentTicks`, but
/// without its wraparound-safe clamping: this spec treats tick wraparound
/// as undefined rather than engineered around.
#[derive(Debug, Default)]
pub struct TickColumn {
    added: Vec<u32>,
    changed: Vec<u32>,
}

impl TickColumn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: u32) {
        self.added.push(tick);
        self.changed.push(tick);
    }

    pub fn len(&self) -> usize {
        self.added.len()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }

    /// Swap-remove the tick pair at `row`, mirroring the column's own
    /// swap-remove so row indices stay aligned.
    pub fn swap_remove(&mut self, row: usize) {
        self.added.swap_remove(row);
        self.changed.swap_remove(row);
    }

    pub fn mark_changed(&mut self, row: usize, tick: u32) {
        self.changed[row] = tick;
    }

    pub fn reset_added(&mut self, row: usize, tick: u32) {
        self.added[row] = tick;
        self.changed[row] = tick;
    }

    pub fn added_tick(&self, row: usize) -> u32 {
        self.added[row]
    }

    pub fn changed_tick(&self, row: usize) -> u32 {
        self.changed[row]
    }

    pub fn is_added_since(&self, row: usize, since: u32) -> bool {
        self.added[row] > since
    }

    pub fn is_changed_since(&self, row: usize, since: u32) -> bool {
        self.changed[row] > since
    }
}

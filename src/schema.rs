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

//! Runtime component schema: field layout and sentinel values.
//!
//! Components are defined at runtime rather than identified by a Rust
//! `TypeId` with a compiler-picked layout, so a `Schema` stands in for
//! `std::alloc::Layout` plus enough shape information for a `Column`
//! (`column.rs`) to know how to store, default, and drop a field.

use smallvec::SmallVec;

use crate::error::{EcsError, Result};
use crate::utils::align_to;

/// A primitive value kind a component field can hold.
///
/// `I8/I16/I32/U32/F32/F64` lay out as a contiguous array in their
/// `Column` (`column.rs`) - `Bool` does not, since a schema's contiguous
/// bucket is reserved for the fixed-width numeric kinds. Instead `Bool`
/// (and the opaque `Boxed` fallback) stores one heap allocation per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    /// An opaque boxed value, stored as `Box<dyn Any + Send + Sync>`.
    Boxed,
}

impl FieldKind {
    pub fn size(self) -> usize {
        match self {
            FieldKind::Bool => std::mem::size_of::<Box<bool>>(),
            FieldKind::I8 => 1,
            FieldKind::I16 => 2,
            FieldKind::I32 | FieldKind::U32 | FieldKind::F32 => 4,
            FieldKind::I64 | FieldKind::U64 | FieldKind::F64 => 8,
            FieldKind::Boxed => std::mem::size_of::<usize>(),
        }
    }

    pub fn align(self) -> usize {
        self.size().max(1)
    }
}

/// A single named field within a component's schema.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub offset: usize,
}

/// The shape of a component type: an ordered list of fields with computed
/// offsets, plus the total stride of one row.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: SmallVec<[Field; 4]>,
    stride: usize,
    is_tag: bool,
}

impl Schema {
    /// The empty, zero-size schema used for tag components (presence-only,
    /// no data stored per row).
    pub fn tag() -> Self {
        Schema { fields: SmallVec::new(), stride: 0, is_tag: true }
    }

    /// Build a schema from an ordered list of `(name, kind)` pairs,
    /// laying out fields with natural alignment.
    pub fn new(fields: impl IntoIterator<Item = (impl Into<String>, FieldKind)>) -> Result<Self> {
        let mut laid_out = SmallVec::new();
        let mut offset = 0usize;
        let mut seen: SmallVec<[String; 4]> = SmallVec::new();
        for (name, kind) in fields {
            let name = name.into();
            if seen.contains(&name) {
                return Err(EcsError::Duplicate(format!("duplicate field name {name:?}")));
            }
            offset = align_to(offset, kind.align());
            seen.push(name.clone());
            laid_out.push(Field { name, kind, offset });
            offset += kind.size();
        }
        if laid_out.is_empty() {
            return Ok(Schema::tag());
        }
        Ok(Schema { fields: laid_out, stride: offset, is_tag: false })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_tag(&self) -> bool {
        self.is_tag
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single field value, used for default-construction and for the
/// non-performance-critical get/set path exposed to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// The sentinel ("empty") value for a field kind: `false`/`0`/`0.0`.
    pub fn sentinel(kind: FieldKind) -> Option<Self> {
        match kind {
            FieldKind::Bool => Some(Value::Bool(false)),
            FieldKind::I8 => Some(Value::I8(0)),
            FieldKind::I16 => Some(Value::I16(0)),
            FieldKind::I32 => Some(Value::I32(0)),
            FieldKind::I64 => Some(Value::I64(0)),
            FieldKind::U32 => Some(Value::U32(0)),
            FieldKind::U64 => Some(Value::U64(0)),
            FieldKind::F32 => Some(Value::F32(0.0)),
            FieldKind::F64 => Some(Value::F64(0.0)),
            FieldKind::Boxed => None,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Bool(_) => FieldKind::Bool,
            Value::I8(_) => FieldKind::I8,
            Value::I16(_) => FieldKind::I16,
            Value::I32(_) => FieldKind::I32,
            Value::I64(_) => FieldKind::I64,
            Value::U32(_) => FieldKind::U32,
            Value::U64(_) => FieldKind::U64,
            Value::F32(_) => FieldKind::F32,
            Value::F64(_) => FieldKind::F64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_schema_has_no_stride() {
        let s = Schema::tag();
        assert_eq!(s.stride(), 0);
        assert!(s.is_tag());
    }

    #[test]
    fn layout_aligns_fields() {
        let s = Schema::new(vec![("small", FieldKind::I8), ("x", FieldKind::F32), ("id", FieldKind::U64)]).unwrap();
        let fields = s.fields();
        assert_eq!(fields[0].offset, 0);
        assert_eq!(fields[1].offset, 4);
        assert_eq!(fields[2].offset, 8);
        assert_eq!(s.stride(), 16);
    }

    #[test]
    fn i16_field_is_contiguous_sized_two() {
        let s = Schema::new(vec![("a", FieldKind::I16), ("b", FieldKind::I16)]).unwrap();
        assert_eq!(s.fields()[0].offset, 0);
        assert_eq!(s.fields()[1].offset, 2);
        assert_eq!(s.stride(), 4);
    }

    #[test]
    fn duplicate_field_name_rejected() {
        let err = Schema::new(vec![("x", FieldKind::F32), ("x", FieldKind::F32)]);
        assert!(err.is_err());
    }

    #[test]
    fn sentinel_values() {
        assert_eq!(Value::sentinel(FieldKind::F64), Some(Value::F64(0.0)));
        assert_eq!(Value::sentinel(FieldKind::Boxed), None);
    }
}

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

//! Packed 32-bit identifier codec.
//!
//! Layout, most to least significant bit: `[1-bit pair][3-bit kind][20-bit raw][8-bit meta]`.
//! Pure and stateless - no allocation, no global lookups. Two raw-id spaces exist:
//! entity/tag/component ids live in `0..2^20`, relation ids live in `0..2^8`.

use std::fmt;

use crate::error::{EcsError, Result};

const KIND_SHIFT: u32 = 28;
const KIND_BITS: u32 = 0b111;
const RAW_SHIFT: u32 = 8;
const RAW_BITS: u32 = 0x000F_FFFF;
const META_BITS: u32 = 0x0000_00FF;
const PAIR_BIT: u32 = 1 << 31;

/// Exclusive upper bound on raw ids in the entity/tag/component space.
pub const MAX_RAW_ID: u32 = 1 << 20;
/// Exclusive upper bound on raw ids in the relation space.
pub const MAX_RELATION_RAW: u32 = 1 << 8;
/// Reserved relation raw id meaning "any relation" / "any target".
pub const WILDCARD_RELATION_RAW: u8 = 0;

/// The kind tag carried by a non-pair id, or the *target's* kind for a pair id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Entity = 0,
    Tag = 1,
    Component = 2,
    Relation = 3,
}

impl Kind {
    fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            0 => Ok(Kind::Entity),
            1 => Ok(Kind::Tag),
            2 => Ok(Kind::Component),
            3 => Ok(Kind::Relation),
            _ => Err(EcsError::InvalidState(format!(
                "reserved kind tag bits {bits:#05b}"
            ))),
        }
    }
}

/// A packed entity/tag/component/relation/pair identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(u32);

/// The decomposed form of an [`Id`], convenient for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Entity { raw: u32, generation: u8 },
    Tag { raw: u32 },
    Component { raw: u32 },
    Relation { raw: u8 },
    Pair { relation_raw: u8, target_kind: Kind, target_raw: u32 },
}

impl Id {
    /// Construct from raw bits without any validation. Only used internally
    /// once the caller has already validated field widths.
    const fn from_bits(bits: u32) -> Self {
        Id(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_raw_bits(bits: u32) -> Self {
        Id(bits)
    }

    pub fn entity(raw: u32, generation: u8) -> Result<Self> {
        check_raw(raw)?;
        Ok(Id::from_bits((Kind::Entity as u32) << KIND_SHIFT | (raw << RAW_SHIFT) | generation as u32))
    }

    pub fn tag(raw: u32) -> Result<Self> {
        check_raw(raw)?;
        Ok(Id::from_bits((Kind::Tag as u32) << KIND_SHIFT | (raw << RAW_SHIFT)))
    }

    pub fn component(raw: u32) -> Result<Self> {
        check_raw(raw)?;
        Ok(Id::from_bits((Kind::Component as u32) << KIND_SHIFT | (raw << RAW_SHIFT)))
    }

    pub fn relation(raw: u8) -> Result<Self> {
        let raw = raw as u32;
        check_relation_raw(raw)?;
        Ok(Id::from_bits((Kind::Relation as u32) << KIND_SHIFT | (raw << RAW_SHIFT)))
    }

    /// Construct the pair id `(relation_raw, (target_kind, target_raw))`.
    ///
    /// `target_kind` must be `Entity`, `Tag`, or `Component` - pairs cannot
    /// target a relation or another pair.
    pub fn pair(relation_raw: u8, target_kind: Kind, target_raw: u32) -> Result<Self> {
        if matches!(target_kind, Kind::Relation) {
            return Err(EcsError::InvalidState(
                "a pair's target cannot itself be a relation".into(),
            ));
        }
        check_raw(target_raw)?;
        let relation_bits = relation_raw as u32;
        check_relation_raw(relation_bits)?;
        Ok(Id::from_bits(
            PAIR_BIT
                | (target_kind as u32) << KIND_SHIFT
                | (target_raw << RAW_SHIFT)
                | relation_bits,
        ))
    }

    pub fn is_pair(self) -> bool {
        self.0 & PAIR_BIT != 0
    }

    /// The kind tag: for a non-pair id, its own kind; for a pair id, the
    /// *target's* kind (per the packed layout).
    pub fn kind(self) -> Result<Kind> {
        Kind::from_bits((self.0 >> KIND_SHIFT) & KIND_BITS)
    }

    /// The 20-bit raw field: the id's own raw id, or the pair target's raw id.
    pub fn raw(self) -> u32 {
        (self.0 >> RAW_SHIFT) & RAW_BITS
    }

    /// The 8-bit meta field: generation for a plain `Entity`, 0 for `Tag`/
    /// `Component`/`Relation`, or the pair's relation raw id for a pair.
    pub fn meta(self) -> u8 {
        (self.0 & META_BITS) as u8
    }

    /// Generation of a plain `Entity` id. Meaningless for other kinds.
    pub fn generation(self) -> u8 {
        self.meta()
    }

    pub fn pair_relation_raw(self) -> Option<u8> {
        self.is_pair().then(|| self.meta())
    }

    pub fn pair_target_raw(self) -> Option<u32> {
        self.is_pair().then(|| self.raw())
    }

    pub fn pair_target_kind(self) -> Option<Kind> {
        self.is_pair().then(|| self.kind().ok()).flatten()
    }

    /// Fully decode into a matchable enum. Fails with `InvalidState` on a
    /// reserved kind-tag bit pattern.
    pub fn decode(self) -> Result<Decoded> {
        if self.is_pair() {
            let target_kind = self.kind()?;
            Ok(Decoded::Pair {
                relation_raw: self.meta(),
                target_kind,
                target_raw: self.raw(),
            })
        } else {
            match self.kind()? {
                Kind::Entity => Ok(Decoded::Entity { raw: self.raw(), generation: self.meta() }),
                Kind::Tag => Ok(Decoded::Tag { raw: self.raw() }),
                Kind::Component => Ok(Decoded::Component { raw: self.raw() }),
                Kind::Relation => Ok(Decoded::Relation { raw: self.raw() as u8 }),
            }
        }
    }

    /// Strip the generation from an `Entity` id, yielding the id that would
    /// identify "whatever currently occupies this raw slot". Used by the
    /// relation layer's weak-target dereference.
    pub fn without_generation(self) -> Self {
        Id::from_bits(self.0 & !META_BITS)
    }

    /// Same packed value with a replaced generation/meta field.
    pub fn with_meta(self, meta: u8) -> Self {
        Id::from_bits((self.0 & !META_BITS) | meta as u32)
    }
}

fn check_raw(raw: u32) -> Result<()> {
    if raw >= MAX_RAW_ID {
        Err(EcsError::LimitExceeded(format!(
            "raw id {raw} exceeds entity/tag/component space ({MAX_RAW_ID})"
        )))
    } else {
        Ok(())
    }
}

fn check_relation_raw(raw: u32) -> Result<()> {
    if raw >= MAX_RELATION_RAW {
        Err(EcsError::LimitExceeded(format!(
            "relation raw id {raw} exceeds relation space ({MAX_RELATION_RAW})"
        )))
    } else {
        Ok(())
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Ok(Decoded::Entity { raw, generation }) => {
                write!(f, "Entity({raw}#{generation})")
            }
            Ok(Decoded::Tag { raw }) => write!(f, "Tag({raw})"),
            Ok(Decoded::Component { raw }) => write!(f, "Component({raw})"),
            Ok(Decoded::Relation { raw }) => write!(f, "Relation({raw})"),
            Ok(Decoded::Pair { relation_raw, target_kind, target_raw }) => {
                write!(f, "Pair(rel={relation_raw}, target={target_kind:?}({target_raw}))")
            }
            Err(_) => write!(f, "Id(invalid:{:#010x})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_roundtrip() {
        let id = Id::entity(42, 3).unwrap();
        assert!(!id.is_pair());
        assert_eq!(id.kind().unwrap(), Kind::Entity);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.generation(), 3);
    }

    #[test]
    fn pair_roundtrip() {
        let target = Id::entity(7, 0).unwrap();
        let p = Id::pair(5, target.kind().unwrap(), target.raw()).unwrap();
        assert!(p.is_pair());
        assert_eq!(p.pair_relation_raw(), Some(5));
        assert_eq!(p.pair_target_raw(), Some(7));
        assert_eq!(p.pair_target_kind(), Some(Kind::Entity));
    }

    #[test]
    fn raw_bound_enforced() {
        assert!(Id::entity(MAX_RAW_ID, 0).is_err());
        assert!(Id::entity(MAX_RAW_ID - 1, 0).is_ok());
    }

    #[test]
    fn relation_bound_enforced() {
        assert!(Id::relation(255).is_ok());
        assert!(Id::pair(255, Kind::Entity, 0).is_ok());
    }

    #[test]
    fn pair_cannot_target_relation() {
        assert!(Id::pair(0, Kind::Relation, 0).is_err());
    }

    #[test]
    fn generation_wraps_via_u8() {
        let mut gen: u8 = 250;
        for _ in 0..10 {
            gen = gen.wrapping_add(1);
        }
        assert_eq!(gen, 4);
    }
}

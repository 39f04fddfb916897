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

//! Pair (relation) encoding helpers: wildcards, companion ids, exclusive
//! reparenting, and cascade-delete policy lookups.
//!
//! Generalizes a single hard-coded `Parent`/`Children` relationship to
//! arbitrary `(relation, target)` pairs. `World`'s own test suite (`exclusive_relation_reparents`,
//! `cascade_delete_destroys_children_when_target_destroyed`) is the worked
//! `ChildOf` example built on top of it.

use crate::id::{Id, Kind, WILDCARD_RELATION_RAW};
use crate::registry::OnDeleteTarget;

/// Reserved raw id meaning "any target" when used as a pair's target raw.
/// Raw id 0 in the entity/tag/component space is never handed out by
/// `EntityStore` (it pre-reserves the slot), so it's safe to overload here
/// the same way `WILDCARD_RELATION_RAW` overloads relation raw 0 (which
/// `registry.rs` reserves by starting `next_relation_raw` at 1).
pub const WILDCARD_TARGET_RAW: u32 = 0;

/// The reserved `Wildcard` relation id: `(Wildcard, target)` matches a pair
/// with any relation and `target`, and `(relation, Wildcard)` (see
/// `wildcard_target_pair`) matches any target. Exposed publicly per the
/// external interface - callers can pass this directly as an include/exclude
/// filter term via `relation::pair`.
pub fn wildcard_relation() -> Id {
    Id::relation(WILDCARD_RELATION_RAW).expect("wildcard relation raw is always in range")
}

/// Build the pair `(relation, target)`.
pub fn pair(relation: Id, target: Id) -> crate::error::Result<Id> {
    Id::pair(
        relation.raw().min(u8::MAX as u32) as u8,
        target.kind()?,
        target.raw(),
    )
}

pub fn is_wildcard_target(id: Id) -> bool {
    id.is_pair() && id.pair_target_raw() == Some(WILDCARD_TARGET_RAW)
}

pub fn is_wildcard_relation(id: Id) -> bool {
    id.is_pair() && id.pair_relation_raw() == Some(WILDCARD_RELATION_RAW)
}

/// `(relation, *)` - matches any pair using this relation, any target.
pub fn wildcard_target_pair(relation: Id) -> crate::error::Result<Id> {
    Id::pair(relation.raw().min(u8::MAX as u32) as u8, Kind::Entity, WILDCARD_TARGET_RAW)
}

/// `(*, target)` - matches any pair with this target, any relation.
pub fn wildcard_relation_pair(target: Id) -> crate::error::Result<Id> {
    Id::pair(WILDCARD_RELATION_RAW, target.kind()?, target.raw())
}

/// The two wildcard companion ids implied by a concrete pair's presence:
/// `(relation, *)` and `(*, target)`. An archetype holding `pair` is also
/// considered to hold both of these for filter/query matching purposes.
pub fn companions(pair_id: Id) -> crate::error::Result<[Id; 2]> {
    let relation_raw = pair_id
        .pair_relation_raw()
        .ok_or_else(|| crate::error::EcsError::InvalidArgument("not a pair id".into()))?;
    let target_kind = pair_id
        .pair_target_kind()
        .ok_or_else(|| crate::error::EcsError::InvalidArgument("not a pair id".into()))?;
    let target_raw = pair_id
        .pair_target_raw()
        .ok_or_else(|| crate::error::EcsError::InvalidArgument("not a pair id".into()))?;
    Ok([
        Id::pair(relation_raw, Kind::Entity, WILDCARD_TARGET_RAW)?,
        Id::pair(WILDCARD_RELATION_RAW, target_kind, target_raw)?,
    ])
}

/// Do `a` and `b` share the same relation raw id? Both must be pairs.
pub fn same_relation(a: Id, b: Id) -> bool {
    a.is_pair() && b.is_pair() && a.pair_relation_raw() == b.pair_relation_raw()
}

/// Does `candidate` satisfy the (possibly wildcarded) `filter` pair?
pub fn matches_pair_filter(candidate: Id, filter: Id) -> bool {
    if !candidate.is_pair() || !filter.is_pair() {
        return candidate == filter;
    }
    let relation_ok = is_wildcard_relation(filter) || candidate.pair_relation_raw() == filter.pair_relation_raw();
    let target_ok = is_wildcard_target(filter)
        || (candidate.pair_target_raw() == filter.pair_target_raw()
            && candidate.pair_target_kind() == filter.pair_target_kind());
    relation_ok && target_ok
}

pub use crate::registry::on_delete_target;

/// Convenience re-export so callers matching cascade policy don't need to
/// import `registry` directly as well.
pub type DeletePolicy = OnDeleteTarget;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;

    #[test]
    fn companions_cover_both_wildcards() {
        let relation = Id::relation(3).unwrap();
        let target = Id::entity(9, 0).unwrap();
        let p = pair(relation, target).unwrap();
        let [rel_wild, target_wild] = companions(p).unwrap();
        assert!(is_wildcard_target(rel_wild));
        assert!(is_wildcard_relation(target_wild));
        assert!(matches_pair_filter(p, rel_wild));
        assert!(matches_pair_filter(p, target_wild));
    }

    #[test]
    fn same_relation_detects_shared_relation_raw() {
        let relation = Id::relation(1).unwrap();
        let t1 = Id::entity(1, 0).unwrap();
        let t2 = Id::entity(2, 0).unwrap();
        let p1 = pair(relation, t1).unwrap();
        let p2 = pair(relation, t2).unwrap();
        assert!(same_relation(p1, p2));
    }

    #[test]
    fn wildcard_relation_is_stable_and_matches_any_relation_pair() {
        let w = wildcard_relation();
        assert_eq!(w, wildcard_relation());
        let target = Id::entity(4, 0).unwrap();
        let filter = wildcard_relation_pair(target).unwrap();
        let concrete = pair(Id::relation(7).unwrap(), target).unwrap();
        assert!(matches_pair_filter(concrete, filter));
    }

    #[test]
    fn non_pair_filter_requires_exact_match() {
        let a = Id::tag(1).unwrap();
        let b = Id::tag(2).unwrap();
        assert!(!matches_pair_filter(a, b));
        assert!(matches_pair_filter(a, a));
    }

    #[test]
    fn same_raw_different_target_kind_does_not_match() {
        let relation = Id::relation(2).unwrap();
        let entity_target = Id::entity(5, 0).unwrap();
        let tag_target = Id::tag(5).unwrap();
        let entity_pair = pair(relation, entity_target).unwrap();
        let tag_pair = pair(relation, tag_target).unwrap();
        assert_eq!(entity_pair.pair_target_raw(), tag_pair.pair_target_raw());
        assert!(!matches_pair_filter(entity_pair, tag_pair));
        assert!(matches_pair_filter(entity_pair, entity_pair));
    }
}

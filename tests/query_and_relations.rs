use archetype_ecs::prelude::*;
use archetype_ecs::registry;
use std::sync::Mutex;

// Registry is process-global; serialize tests that define types.
static LOCK: Mutex<()> = Mutex::new(());

#[test]
fn include_exclude_query_reflects_archetype_moves() {
    let _guard = LOCK.lock().unwrap();

    let health = registry::define_component("IntTestHealth", Schema::new(vec![("hp", FieldKind::I32)]).unwrap()).unwrap();
    let dead = registry::define_tag("IntTestDead").unwrap();

    let mut world = World::new();
    let a = world.create_entity().unwrap();
    world.add_component(a, health, &[("hp", Value::I32(10))]).unwrap();
    let b = world.create_entity().unwrap();
    world.add_component(b, health, &[("hp", Value::I32(0))]).unwrap();
    world.add_component(b, dead, &[]).unwrap();

    let alive = world.fetch_entities(&[Term::Has(health), Term::Not(dead)]).unwrap();
    assert_eq!(alive, vec![a]);

    world.add_component(a, dead, &[]).unwrap();
    let alive = world.fetch_entities(&[Term::Has(health), Term::Not(dead)]).unwrap();
    assert!(alive.is_empty());
}

#[test]
fn exclusive_relation_reparents_and_cascade_deletes() {
    let _guard = LOCK.lock().unwrap();

    let child_of = registry::define_relation("IntTestChildOf", true, OnDeleteTarget::Delete, None).unwrap();

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

    world.destroy_entity(parent_b).unwrap();
    assert!(!world.is_entity_alive(child));
}

#[test]
fn wildcard_relation_matches_any_pair_with_that_target() {
    let _guard = LOCK.lock().unwrap();

    let owns = registry::define_relation("IntTestOwns", false, OnDeleteTarget::Remove, None).unwrap();
    let likes = registry::define_relation("IntTestLikes", false, OnDeleteTarget::Remove, None).unwrap();

    let mut world = World::new();
    let sword = world.create_entity().unwrap();
    let holder = world.create_entity().unwrap();

    let owns_pair = world.pair(owns, sword).unwrap();
    world.add_component(holder, owns_pair, &[]).unwrap();

    let any_relation_to_sword = archetype_ecs::relation::wildcard_relation_pair(sword).unwrap();
    let likes_pair = world.pair(likes, sword).unwrap();

    assert!(world.has_component(holder, any_relation_to_sword));
    assert!(!world.has_component(holder, likes_pair));
}

//! `ChildOf`-style relations: exclusive reparenting and cascade delete.

use archetype_ecs::prelude::*;
use archetype_ecs::registry;

fn main() -> Result<()> {
    let child_of = registry::define_relation("ChildOf", true, OnDeleteTarget::Delete, None)?;

    let mut world = World::new();

    let parent = world.create_entity()?;
    let child = world.create_entity()?;

    let pair = world.pair(child_of, parent)?;
    world.add_component(child, pair, &[])?;

    let targets = world.get_relation_targets(child, child_of)?;
    println!("{child:?} is ChildOf: {targets:?}");

    // Reparenting: adding a second ChildOf pair drops the first (exclusive).
    let other_parent = world.create_entity()?;
    let other_pair = world.pair(child_of, other_parent)?;
    world.add_component(child, other_pair, &[])?;
    assert!(!world.has_component(child, pair));
    assert!(world.has_component(child, other_pair));

    // Cascade delete: destroying the target destroys its children too.
    world.destroy_entity(other_parent)?;
    assert!(!world.is_entity_alive(child));

    Ok(())
}

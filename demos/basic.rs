//! Define components, spawn entities, query by inclusion/exclusion, and
//! react to mutation through the observer bus.

use archetype_ecs::prelude::*;
use archetype_ecs::registry;

fn main() -> Result<()> {
    let position = registry::define_component(
        "Position",
        Schema::new(vec![("x", FieldKind::F32), ("y", FieldKind::F32)])?,
    )?;
    let velocity = registry::define_component(
        "Velocity",
        Schema::new(vec![("x", FieldKind::F32), ("y", FieldKind::F32)])?,
    )?;
    let dead = registry::define_tag("Dead")?;

    let mut world = World::new();

    world.register_observer_callback(EventKind::ComponentChanged, |event| {
        if let Event::ComponentChanged { entity, component } = event {
            println!("{entity:?} changed component {component:?}");
        }
    });

    let player = world.create_entity()?;
    world.add_component(player, position, &[("x", Value::F32(0.0)), ("y", Value::F32(0.0))])?;
    world.add_component(player, velocity, &[("x", Value::F32(1.0)), ("y", Value::F32(0.0))])?;

    let rock = world.create_entity()?;
    world.add_component(rock, position, &[("x", Value::F32(5.0)), ("y", Value::F32(5.0))])?;
    world.add_component(rock, dead, &[])?;

    let moving = world.fetch_entities(&[Term::Has(position), Term::Has(velocity), Term::Not(dead)])?;
    println!("moving entities: {moving:?}");

    world.set_component_value(player, position, "x", Value::F32(1.0))?;

    WorldInspector::print_summary(&world);
    Ok(())
}

use archetype_ecs::prelude::*;
use archetype_ecs::registry;
use std::sync::Mutex;

static LOCK: Mutex<()> = Mutex::new(());

#[test]
fn added_query_only_sees_new_rows_once_per_system() {
    let _guard = LOCK.lock().unwrap();

    let marker = registry::define_component("ChangeTestMarker", Schema::new(vec![("v", FieldKind::I32)]).unwrap()).unwrap();

    let mut world = World::new();
    world.set_execution_context(Some(SystemId(0)), 1);

    let e = world.create_entity().unwrap();
    world.add_component(e, marker, &[("v", Value::I32(1))]).unwrap();

    let first = world.fetch_entities(&[Term::Added(marker)]).unwrap();
    assert_eq!(first, vec![e]);

    let second = world.fetch_entities(&[Term::Added(marker)]).unwrap();
    assert!(second.is_empty());

    world.clear_execution_context();
}

#[test]
fn change_modifiers_outside_system_context_yield_nothing() {
    let _guard = LOCK.lock().unwrap();

    let marker = registry::define_component("ChangeTestMarker2", Schema::new(vec![("v", FieldKind::I32)]).unwrap()).unwrap();

    let mut world = World::new();
    let e = world.create_entity().unwrap();
    world.add_component(e, marker, &[("v", Value::I32(1))]).unwrap();

    let result = world.fetch_entities(&[Term::Added(marker)]).unwrap();
    assert!(result.is_empty());
}

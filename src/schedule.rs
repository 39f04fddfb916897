//! Sequential system schedule.
//!
//! External collaborator: depends on the core but isn't part of it. The
//! core is single-threaded cooperative, so there's no conflict graph or
//! parallel staging here - just a registration-order run loop, a conflict
//! check kept as a debug-only ordering sanity check rather than a staging
//! input, and publishing `(systemId, tick)` on the world before each
//! system runs so query tick modifiers can scope themselves to it.

use crate::error::Result;
use crate::system::{BoxedSystem, SystemId};
use crate::world::World;

/// Registration-order system list. One frame = one tick = one pass over
/// every system.
#[derive(Default)]
pub struct Schedule {
    systems: Vec<BoxedSystem>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a system, returning the id the scheduler will publish to
    /// the world while it runs.
    pub fn add_system(&mut self, system: BoxedSystem) -> SystemId {
        let id = SystemId(self.systems.len() as u32);
        self.systems.push(system);
        id
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Two systems declared to conflict (one's write set overlaps the
    /// other's read or write set) but are scheduled to run in the same
    /// frame regardless, since this scheduler never parallelizes. Useful
    /// for a caller who wants to warn about an ordering-sensitive system
    /// pair without building a full parallel staging scheduler.
    pub fn conflicting_pairs(&self) -> Vec<(SystemId, SystemId)> {
        let mut pairs = Vec::new();
        for i in 0..self.systems.len() {
            for j in (i + 1)..self.systems.len() {
                if self.systems[i].access().conflicts_with(&self.systems[j].access()) {
                    pairs.push((SystemId(i as u32), SystemId(j as u32)));
                }
            }
        }
        pairs
    }

    /// Advance the world's tick once, then run every system in
    /// registration order, publishing `(systemId, tick)` to `world`
    /// before each call so `Query::fetch`'s per-system channel (query.rs)
    /// sees the right context.
    pub fn run_frame(&mut self, world: &mut World) -> Result<()> {
        let tick = world.advance_tick();
        for (i, system) in self.systems.iter_mut().enumerate() {
            let id = SystemId(i as u32);
            world.set_execution_context(Some(id), tick);
            let result = system.run(world);
            world.clear_execution_context();
            result?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;
    use crate::system::{System, SystemAccess};

    struct Recorder {
        log: std::sync::Arc<std::sync::Mutex<Vec<&'static str>>>,
        name: &'static str,
    }

    impl System for Recorder {
        fn access(&self) -> SystemAccess {
            SystemAccess::empty()
        }
        fn name(&self) -> &'static str {
            self.name
        }
        fn run(&mut self, _world: &mut World) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    #[test]
    fn systems_run_in_registration_order() {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut schedule = Schedule::new();
        schedule.add_system(Box::new(Recorder { log: log.clone(), name: "a" }));
        schedule.add_system(Box::new(Recorder { log: log.clone(), name: "b" }));
        let mut world = World::new();
        schedule.run_frame(&mut world).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn conflicting_pairs_detects_write_write_overlap() {
        struct Writer(Id);
        impl System for Writer {
            fn access(&self) -> SystemAccess {
                SystemAccess { reads: vec![], writes: vec![self.0] }
            }
            fn name(&self) -> &'static str {
                "writer"
            }
            fn run(&mut self, _world: &mut World) -> Result<()> {
                Ok(())
            }
        }
        let c = Id::component(0).unwrap();
        let mut schedule = Schedule::new();
        schedule.add_system(Box::new(Writer(c)));
        schedule.add_system(Box::new(Writer(c)));
        assert_eq!(schedule.conflicting_pairs(), vec![(SystemId(0), SystemId(1))]);
    }
}

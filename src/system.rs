//! System trait and access metadata.
//!
//! External collaborator: the frame scheduler depends on the core but
//! isn't part of it. Read/write access sets are keyed by `crate::id::Id`
//! now that components are runtime-defined ids rather than Rust types,
//! and `run` consistently takes `&mut World`.

use crate::error::Result;
use crate::id::Id;
use crate::world::World;

/// System ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(pub u32);

/// System access metadata
#[derive(Debug, Clone, Default)]
pub struct SystemAccess {
    pub reads: Vec<Id>,
    pub writes: Vec<Id>,
}

impl SystemAccess {
    /// Create empty access
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if conflicts with another access
    pub fn conflicts_with(&self, other: &SystemAccess) -> bool {
        self.writes.iter().any(|w| other.writes.contains(w))
            || self.writes.iter().any(|w| other.reads.contains(w))
            || self.reads.iter().any(|r| other.writes.contains(r))
    }
}

/// System trait
pub trait System: Send {
    /// Get system access metadata
    fn access(&self) -> SystemAccess;

    /// Get system name
    fn name(&self) -> &'static str;

    /// Run system
    fn run(&mut self, world: &mut World) -> Result<()>;
}

/// Boxed system
pub type BoxedSystem = Box<dyn System>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_access_conflicts() {
        let c = Id::component(0).unwrap();
        let mut access1 = SystemAccess::empty();
        access1.writes.push(c);

        let mut access2 = SystemAccess::empty();
        access2.writes.push(c);

        assert!(access1.conflicts_with(&access2));
    }

    #[test]
    fn test_system_access_no_conflicts() {
        let c = Id::component(0).unwrap();
        let mut access1 = SystemAccess::empty();
        access1.reads.push(c);

        let mut access2 = SystemAccess::empty();
        access2.reads.push(c);

        assert!(!access1.conflicts_with(&access2));
    }
}

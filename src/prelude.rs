//! Convenient re-exports of commonly used types.
//!
//! ```
//! use archetype_ecs::prelude::*;
//! ```

pub use crate::debug::{Diagnostics, WorldInspector};
pub use crate::error::{EcsError, Result};
pub use crate::id::{Id, Kind};
pub use crate::observer::{Event, EventKind, ObserverId};
pub use crate::query::{Term, QueryId};
pub use crate::registry::OnDeleteTarget;
pub use crate::relation::wildcard_relation;
pub use crate::schema::{Field, FieldKind, Schema, Value};
pub use crate::schedule::Schedule;
pub use crate::system::{BoxedSystem, System, SystemAccess, SystemId};
pub use crate::world::World;
pub use crate::{registry, relation};

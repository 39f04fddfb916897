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

//! AAA ECS - archetype-based Entity Component System core.
//!
//! Packed 32-bit ids (entity/tag/component/relation), columnar archetype
//! storage, relation pairs with wildcard matching and cascade-delete
//! policy, an incrementally-maintained filter index, a tick-aware query
//! engine, and a reverse-dispatch observer bus - with a sequential system
//! scheduler layered on top as an external collaborator.

pub mod archetype;
pub mod column;
pub mod debug;
pub mod entity;
pub mod error;
pub mod event_bus;
pub mod event_subscriber;
pub mod filter;
pub mod id;
pub mod observer;
pub mod prelude;
pub mod query;
pub mod registry;
pub mod relation;
pub mod schedule;
pub mod schema;
pub mod system;
pub mod utils;
pub mod world;

pub use archetype::{Archetype, ArchetypeId};
pub use entity::{EntityRecord, EntityStore};
pub use error::{EcsError, Result};
pub use filter::{Filter, FilterId, FilterIndex};
pub use id::{Id, Kind};
pub use observer::{Event, EventKind, ObserverBus, ObserverId};
pub use query::{Query, QueryCache, QueryDef, QueryId, Term};
pub use registry::OnDeleteTarget;
pub use schedule::Schedule;
pub use schema::{Field, FieldKind, Schema, Value};
pub use system::{BoxedSystem, System, SystemAccess, SystemId};
pub use world::World;

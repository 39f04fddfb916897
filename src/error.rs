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

//! Error types

use std::fmt;

/// ECS error type
#[derive(Debug, Clone)]
pub enum EcsError {
    /// Entity not found (despawned, wrong generation, or never existed)
    EntityNotFound,

    /// Component not found on the targeted entity/archetype
    ComponentNotFound,

    /// Archetype not found for the given id
    ArchetypeNotFound,

    /// A generic lookup failed: a name, relation, or tag wasn't registered.
    NotFound(String),

    /// A counter, capacity, or id space bound was exceeded.
    LimitExceeded(String),

    /// The world or an internal structure was found in a state an
    /// operation requires it not be in (e.g. a reentrant destroy, a
    /// dangling edge, a reserved bit pattern).
    InvalidState(String),

    /// A caller-supplied argument failed validation.
    InvalidArgument(String),

    /// An operation required a name/id to be unique and it wasn't.
    Duplicate(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::EntityNotFound => write!(f, "Entity not found"),
            EcsError::ComponentNotFound => write!(f, "Component not found"),
            EcsError::ArchetypeNotFound => write!(f, "Archetype not found"),
            EcsError::NotFound(msg) => write!(f, "Not found: {msg}"),
            EcsError::LimitExceeded(msg) => write!(f, "Limit exceeded: {msg}"),
            EcsError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            EcsError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            EcsError::Duplicate(msg) => write!(f, "Duplicate: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;

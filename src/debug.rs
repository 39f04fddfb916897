//! World and frame-time inspection helpers.
//!
//! `WorldInspector`/`Diagnostics` report archetype signatures keyed by
//! `crate::id::Id` and resolved to human-readable type names via
//! `registry::name_of`.

use crate::id::Id;
use crate::registry;
use crate::world::World;

/// World inspector for debugging.
pub struct WorldInspector;

impl WorldInspector {
    /// Get total entity count.
    pub fn entity_count(world: &World) -> usize {
        world.entity_count()
    }

    /// Get archetype summary.
    pub fn archetype_summary(world: &World) -> Vec<ArchetypeInfo> {
        world
            .archetypes()
            .iter()
            .map(|archetype| ArchetypeInfo {
                id: archetype.id(),
                signature: archetype
                    .types()
                    .iter()
                    .map(|&id| registry::name_of(id).unwrap_or_else(|| format!("{id:?}")))
                    .collect(),
                entity_count: archetype.len(),
                component_count: archetype.types().len(),
            })
            .collect()
    }

    /// Print world summary to console.
    pub fn print_summary(world: &World) {
        println!("=== World Summary ===");
        println!("Entities: {}", Self::entity_count(world));
        println!("Archetypes: {}", world.archetypes().len());

        println!("\n=== Archetypes ===");
        for info in Self::archetype_summary(world) {
            println!(
                "Archetype {}: {} entities, {} components",
                info.id, info.entity_count, info.component_count
            );
        }
    }

    /// Print entity details.
    pub fn print_entity(world: &World, entity: Id) {
        if let Some(record) = world.entity_location(entity) {
            println!("=== Entity {entity:?} ===");
            println!("Archetype: {}", record.archetype);
            println!("Row: {}", record.row);

            if let Some(archetype) = world.archetypes().get(record.archetype) {
                println!("Components: {} types", archetype.types().len());
            }
        } else {
            println!("Entity {entity:?} not found");
        }
    }
}

/// Archetype information for debugging.
#[derive(Clone, Debug)]
pub struct ArchetypeInfo {
    pub id: usize,
    pub signature: Vec<String>,
    pub entity_count: usize,
    pub component_count: usize,
}

use std::collections::VecDeque;

/// Frame-time diagnostics, unrelated to the ECS core - a caller's frame
/// loop feeds it wall-clock samples.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    frame_times: VecDeque<f32>,
    max_samples: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { frame_times: VecDeque::new(), max_samples: 60 }
    }

    /// Record a frame time in milliseconds.
    pub fn record_frame_time(&mut self, time_ms: f32) {
        self.frame_times.push_back(time_ms);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }
    }

    pub fn fps(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let avg_ms = self.avg_frame_time();
        if avg_ms > 0.0 { 1000.0 / avg_ms } else { 0.0 }
    }

    pub fn avg_frame_time(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32
    }

    pub fn min_frame_time(&self) -> f32 {
        self.frame_times.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max_frame_time(&self) -> f32 {
        self.frame_times.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn print(&self) {
        println!("=== Diagnostics ===");
        println!("FPS: {:.1}", self.fps());
        println!("Avg Frame Time: {:.2}ms", self.avg_frame_time());
        println!("Min Frame Time: {:.2}ms", self.min_frame_time());
        println!("Max Frame Time: {:.2}ms", self.max_frame_time());
    }
}

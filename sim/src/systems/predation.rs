//! Predation resolver.
//!
//! Two phases, like any removal that happens during a scan:
//!
//! 1. **Gather** - the predator phase marks every prey within eat range of
//!    any predator, reading only the phase snapshot.
//! 2. **Apply** - marked entities are despawned once, after the scan.
//!
//! Marking by entity rather than by index means a prey seen by two predators
//! is removed exactly once and removal never shifts another agent into a
//! slot that is still being scanned.

use crate::systems::rules::AgentState;
use bevy_ecs::prelude::*;
use std::collections::HashSet;

/// Prey marked during the predator phase, waiting to be removed.
#[derive(Resource, Debug, Clone, Default)]
pub struct PendingPredation {
    marked: Vec<Entity>,
    /// Prey removed by the most recent apply pass.
    pub last_eaten: usize,
    /// Prey removed since the last reset.
    pub total_eaten: u64,
}

impl PendingPredation {
    pub fn mark(&mut self, prey: impl IntoIterator<Item = Entity>) {
        self.marked.extend(prey);
    }

    pub fn marked(&self) -> &[Entity] {
        &self.marked
    }

    pub fn clear(&mut self) {
        self.marked.clear();
        self.last_eaten = 0;
        self.total_eaten = 0;
    }
}

/// Entities of prey strictly within `eat_range` of any predator.
///
/// Each prey appears at most once, in prey snapshot order.
pub fn mark_prey(predators: &[AgentState], prey: &[AgentState], eat_range: f32) -> Vec<Entity> {
    let mut seen = HashSet::new();
    let mut marked = Vec::new();
    for predator in predators {
        for target in prey {
            if predator.pos.distance_to(&target.pos) < eat_range && seen.insert(target.entity) {
                marked.push(target.entity);
            }
        }
    }
    marked
}

/// Despawn every marked prey.
pub fn predation_apply_system(mut commands: Commands, mut pending: ResMut<PendingPredation>) {
    let mut removed = HashSet::new();
    for entity in pending.marked.drain(..).collect::<Vec<_>>() {
        if removed.insert(entity) {
            commands.entity(entity).despawn();
        }
    }

    pending.last_eaten = removed.len();
    pending.total_eaten += removed.len() as u64;
    if !removed.is_empty() {
        tracing::debug!(eaten = removed.len(), total = pending.total_eaten, "predators fed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::*;

    fn agent(id: u32, x: f32, y: f32) -> AgentState {
        AgentState::new(Entity::from_raw(id), Position::new(x, y), Velocity::default())
    }

    #[test]
    fn test_mark_prey_dedups_overlapping_predators() {
        let predators = [agent(100, 0.0, 0.0), agent(101, 10.0, 0.0)];
        let prey = [agent(1, 5.0, 0.0), agent(2, 200.0, 0.0), agent(3, 45.0, 0.0)];

        let marked = mark_prey(&predators, &prey, 40.0);

        assert_eq!(marked, vec![Entity::from_raw(1), Entity::from_raw(3)]);
    }

    #[test]
    fn test_apply_despawns_marked_once() {
        let mut world = World::new();
        world.insert_resource(PendingPredation::default());
        let a = world.spawn(Position::new(0.0, 0.0)).id();
        let b = world.spawn(Position::new(1.0, 0.0)).id();
        let keep = world.spawn(Position::new(2.0, 0.0)).id();

        world.resource_mut::<PendingPredation>().mark([a, b, a]);

        let mut schedule = Schedule::default();
        schedule.add_systems(predation_apply_system);
        schedule.run(&mut world);

        assert!(world.get::<Position>(a).is_none());
        assert!(world.get::<Position>(b).is_none());
        assert!(world.get::<Position>(keep).is_some());

        let pending = world.resource::<PendingPredation>();
        assert_eq!(pending.last_eaten, 2);
        assert_eq!(pending.total_eaten, 2);
        assert!(pending.marked().is_empty());
    }
}

//! Behavior rules.
//!
//! Each rule reads one agent's snapshot and the populations it reacts to,
//! and writes only that agent's working velocity. Rules never touch
//! positions or other agents, so the order they run in within a phase is
//! free to choose. None of them normalize or clamp; the integrator limits
//! speed afterwards.

use crate::components::*;
use bevy_ecs::prelude::Entity;

/// Read-only copy of one agent taken at the start of a phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentState {
    pub entity: Entity,
    pub pos: Position,
    pub vel: Velocity,
}

impl AgentState {
    pub fn new(entity: Entity, pos: Position, vel: Velocity) -> Self {
        Self { entity, pos, vel }
    }
}

/// Accumulates positions and velocities of neighbors passing a test.
#[derive(Default)]
struct NeighborSum {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    count: u32,
}

impl NeighborSum {
    fn gather<'a>(
        me: &AgentState,
        others: impl IntoIterator<Item = &'a AgentState>,
        range: f32,
    ) -> Self {
        let mut sum = Self::default();
        for other in others {
            if other.entity == me.entity {
                continue;
            }
            if me.pos.distance_to(&other.pos) < range {
                sum.x += other.pos.x;
                sum.y += other.pos.y;
                sum.vx += other.vel.vx;
                sum.vy += other.vel.vy;
                sum.count += 1;
            }
        }
        sum
    }

    fn centroid(&self) -> Option<(f32, f32)> {
        (self.count > 0).then(|| (self.x / self.count as f32, self.y / self.count as f32))
    }

    fn mean_velocity(&self) -> Option<(f32, f32)> {
        (self.count > 0).then(|| (self.vx / self.count as f32, self.vy / self.count as f32))
    }
}

// ============================================================================
// CLASSICAL FLOCKING
// ============================================================================

/// Steer toward the centroid of neighbors within `range`.
pub fn cohesion(
    me: &AgentState,
    vel: &mut Velocity,
    neighbors: &[AgentState],
    range: f32,
    factor: f32,
) {
    if let Some((cx, cy)) = NeighborSum::gather(me, neighbors, range).centroid() {
        vel.vx += (cx - me.pos.x) * factor;
        vel.vy += (cy - me.pos.y) * factor;
    }
}

/// Push away from every neighbor closer than `min_distance`.
pub fn separation(
    me: &AgentState,
    vel: &mut Velocity,
    neighbors: &[AgentState],
    min_distance: f32,
    factor: f32,
) {
    let mut move_x = 0.0;
    let mut move_y = 0.0;
    for other in neighbors {
        if other.entity == me.entity {
            continue;
        }
        if me.pos.distance_to(&other.pos) < min_distance {
            move_x += me.pos.x - other.pos.x;
            move_y += me.pos.y - other.pos.y;
        }
    }
    vel.vx += move_x * factor;
    vel.vy += move_y * factor;
}

/// Match the mean velocity of neighbors within `range`.
pub fn alignment(
    me: &AgentState,
    vel: &mut Velocity,
    neighbors: &[AgentState],
    range: f32,
    factor: f32,
) {
    if let Some((avg_vx, avg_vy)) = NeighborSum::gather(me, neighbors, range).mean_velocity() {
        vel.vx += (avg_vx - vel.vx) * factor;
        vel.vy += (avg_vy - vel.vy) * factor;
    }
}

// ============================================================================
// PREDATORS
// ============================================================================

/// Flee every predator within `range`.
pub fn avoid_predators(
    me: &AgentState,
    vel: &mut Velocity,
    predators: &[AgentState],
    range: f32,
    factor: f32,
) {
    let mut move_x = 0.0;
    let mut move_y = 0.0;
    for predator in predators {
        if me.pos.distance_to(&predator.pos) < range {
            move_x += me.pos.x - predator.pos.x;
            move_y += me.pos.y - predator.pos.y;
        }
    }
    vel.vx += move_x * factor;
    vel.vy += move_y * factor;
}

/// Predator steers toward the centroid of prey within `range`.
pub fn pursue_prey(
    me: &AgentState,
    vel: &mut Velocity,
    prey: &[AgentState],
    range: f32,
    factor: f32,
) {
    cohesion(me, vel, prey, range, factor);
}

/// Predator matches the mean velocity of prey within `range`.
///
/// `factor` is expected to already include the predator correction.
pub fn match_prey_velocity(
    me: &AgentState,
    vel: &mut Velocity,
    prey: &[AgentState],
    range: f32,
    factor: f32,
) {
    alignment(me, vel, prey, range, factor);
}

// ============================================================================
// HAZARDS
// ============================================================================

/// Steer away from obstacles whose surface is within `range`.
///
/// The push is scaled by the summed inverse surface gap, so an agent grazing
/// an obstacle turns much harder than one at the edge of its visual range.
/// Gaps are clamped at zero (agents already inside) and offset by `epsilon`.
pub fn avoid_obstacles(
    me: &AgentState,
    vel: &mut Velocity,
    obstacles: &[(Position, Obstacle)],
    range: f32,
    factor: f32,
    push: f32,
    epsilon: f32,
) {
    let mut move_x = 0.0;
    let mut move_y = 0.0;
    let mut proximity = 0.0;
    for (center, obstacle) in obstacles {
        let gap = me.pos.distance_to(center) - obstacle.radius;
        if gap < range {
            move_x += me.pos.x - center.x;
            move_y += me.pos.y - center.y;
            proximity += push / (gap.max(0.0) + epsilon);
        }
    }
    vel.vx += move_x * factor * proximity;
    vel.vy += move_y * factor * proximity;
}

/// Add the drift of every wind zone containing the agent.
pub fn wind_drift(me: &AgentState, vel: &mut Velocity, zones: &[(Position, WindZone)]) {
    for (center, zone) in zones {
        if me.pos.distance_to(center) < zone.radius {
            vel.vx += zone.drift_x;
            vel.vy += zone.drift_y;
        }
    }
}

// ============================================================================
// LEADERS
// ============================================================================

/// Steer toward the first leader (spawn order) within `range`.
///
/// Returns whether a leader was followed.
pub fn follow_leader(
    me: &AgentState,
    vel: &mut Velocity,
    leaders: &[AgentState],
    range: f32,
    factor: f32,
) -> bool {
    let Some(leader) = leaders.iter().find(|l| me.pos.distance_to(&l.pos) < range) else {
        return false;
    };
    vel.vx += (leader.pos.x - me.pos.x) * factor;
    vel.vy += (leader.pos.y - me.pos.y) * factor;
    true
}

/// Steer toward the pointer when it is within `range`.
pub fn follow_pointer(
    me: &AgentState,
    vel: &mut Velocity,
    pointer: &Position,
    range: f32,
    factor: f32,
) {
    if me.pos.distance_to(pointer) < range {
        vel.vx += (pointer.x - me.pos.x) * factor;
        vel.vy += (pointer.y - me.pos.y) * factor;
    }
}

/// Add the broadcast velocity of every signal posted within `range`.
pub fn react_to_signals(me: &AgentState, vel: &mut Velocity, signals: &[Signal], range: f32) {
    for signal in signals {
        if me.pos.distance_to(&signal.position()) < range {
            vel.vx += signal.vx;
            vel.vy += signal.vy;
        }
    }
}

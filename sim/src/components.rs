//! ECS Components for the flocking simulation.
//!
//! Components are pure data containers attached to entities.
//! All behavior lives in systems and in the rule functions they call.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D position in viewport pixels (x grows right, y grows down).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        crate::geometry::position_distance(self.x, self.y, other.x, other.y)
    }
}

/// 2D velocity in pixels per tick.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    pub fn magnitude(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

/// Bounded history of past positions, newest at the back.
#[derive(Component, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trail {
    points: VecDeque<(f32, f32)>,
}

impl Trail {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a point, dropping the oldest entries beyond `capacity`.
    pub fn push(&mut self, x: f32, y: f32, capacity: usize) {
        self.points.push_back((x, y));
        while self.points.len() > capacity {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<(f32, f32)> {
        self.points.back().copied()
    }

    pub fn points(&self) -> impl Iterator<Item = &(f32, f32)> {
        self.points.iter()
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Unique identifier for an agent, stable for its lifetime.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

/// Last heading a leader broadcast to the flock.
///
/// Followers never read a leader's live state through this; they see it only
/// after the next broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Signal {
    pub fn capture(pos: &Position, vel: &Velocity) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            vx: vel.vx,
            vy: vel.vy,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Which rule subset an agent follows.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AgentKind {
    Normal,
    Predator,
    Leader { signal: Signal },
}

impl AgentKind {
    /// Kind without payload, used for counting and filtering.
    pub fn tag(&self) -> KindTag {
        match self {
            AgentKind::Normal => KindTag::Normal,
            AgentKind::Predator => KindTag::Predator,
            AgentKind::Leader { .. } => KindTag::Leader,
        }
    }

    pub fn signal(&self) -> Option<Signal> {
        match self {
            AgentKind::Leader { signal } => Some(*signal),
            _ => None,
        }
    }
}

/// Payload-free discriminant of [`AgentKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KindTag {
    Normal,
    Predator,
    Leader,
}

impl KindTag {
    pub const ALL: [KindTag; 3] = [KindTag::Normal, KindTag::Predator, KindTag::Leader];

    /// Body color as a CSS hex string.
    pub fn color(&self) -> &'static str {
        match self {
            KindTag::Normal => "#558cf4",
            KindTag::Predator => "#d8315b",
            KindTag::Leader => "#f4df55",
        }
    }

    /// Translucent trail color as a CSS hex string with alpha.
    pub fn trail_color(&self) -> &'static str {
        match self {
            KindTag::Normal => "#558cf466",
            KindTag::Predator => "#d8315b66",
            KindTag::Leader => "#f4df5566",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KindTag::Normal => "Normal",
            KindTag::Predator => "Predator",
            KindTag::Leader => "Leader",
        }
    }
}

// ============================================================================
// HAZARD COMPONENTS
// ============================================================================

/// Static disc that agents steer away from.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Obstacle {
    pub radius: f32,
}

/// Disc that adds a constant drift to any agent inside it.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WindZone {
    pub radius: f32,
    pub drift_x: f32,
    pub drift_y: f32,
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a complete agent entity.
#[derive(Bundle)]
pub struct AgentBundle {
    pub id: AgentId,
    pub kind: AgentKind,
    pub position: Position,
    pub velocity: Velocity,
    pub trail: Trail,
}

impl AgentBundle {
    pub fn new(id: u32, kind: AgentKind, pos: Position, vel: Velocity, trail_len: usize) -> Self {
        Self {
            id: AgentId(id),
            kind,
            position: pos,
            velocity: vel,
            trail: Trail::with_capacity(trail_len),
        }
    }

    /// A leader whose first signal is its spawn state.
    pub fn leader(id: u32, pos: Position, vel: Velocity, trail_len: usize) -> Self {
        let signal = Signal::capture(&pos, &vel);
        Self::new(id, AgentKind::Leader { signal }, pos, vel, trail_len)
    }
}

/// Bundle for spawning an obstacle entity.
#[derive(Bundle, Default)]
pub struct ObstacleBundle {
    pub position: Position,
    pub obstacle: Obstacle,
}

impl ObstacleBundle {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            position: Position::new(x, y),
            obstacle: Obstacle { radius },
        }
    }
}

/// Bundle for spawning a wind zone entity.
#[derive(Bundle, Default)]
pub struct WindZoneBundle {
    pub position: Position,
    pub zone: WindZone,
}

impl WindZoneBundle {
    pub fn new(x: f32, y: f32, radius: f32, drift_x: f32, drift_y: f32) -> Self {
        Self {
            position: Position::new(x, y),
            zone: WindZone {
                radius,
                drift_x,
                drift_y,
            },
        }
    }
}

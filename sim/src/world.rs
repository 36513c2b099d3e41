//! Render snapshot types.
//!
//! The `Snapshot` struct is a serializable, read-only view of everything a
//! renderer draws for one frame. The renderer never touches the ECS world.

use crate::components::*;
use crate::config::{FlockParams, Viewport};
use crate::systems::metrics::{FlockSummary, GlobalVector};
use crate::systems::signal::SignalBoard;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a single agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: u32,
    pub kind: KindTag,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub color: String,
    pub trail_color: String,
    /// Past positions, oldest first.
    pub trail: Vec<(f32, f32)>,
    /// Last broadcast signal, leaders only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSnapshot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindZoneSnapshot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub drift_x: f32,
    pub drift_y: f32,
}

/// Which overlays the renderer should draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderFlags {
    pub show_trails: bool,
    pub show_global_vector: bool,
    pub show_obstacles: bool,
    pub show_leaders: bool,
    pub show_predators: bool,
}

impl RenderFlags {
    pub fn from_params(params: &FlockParams) -> Self {
        Self {
            show_trails: !params.hide_trail,
            show_global_vector: params.show_global_vector,
            show_obstacles: params.use_obstacles,
            show_leaders: params.use_leaders,
            show_predators: params.use_predators,
        }
    }
}

/// Complete render state for one frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ticks run since the last reset.
    pub tick: u64,
    pub running: bool,
    pub width: f32,
    pub height: f32,
    /// Agents ordered by id.
    pub agents: Vec<AgentSnapshot>,
    pub obstacles: Vec<ObstacleSnapshot>,
    pub wind_zones: Vec<WindZoneSnapshot>,
    /// Signals currently on the board.
    pub signals: Vec<Signal>,
    /// Present when the overlay is enabled and the flock is not empty.
    pub global_vector: Option<GlobalVector>,
    pub flags: RenderFlags,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, running: bool) -> Self {
        let mut agents = Vec::new();
        let mut query = world.query::<(&AgentId, &AgentKind, &Position, &Velocity, &Trail)>();
        for (id, kind, pos, vel, trail) in query.iter(world) {
            let tag = kind.tag();
            agents.push(AgentSnapshot {
                id: id.0,
                kind: tag,
                x: pos.x,
                y: pos.y,
                vx: vel.vx,
                vy: vel.vy,
                color: tag.color().to_string(),
                trail_color: tag.trail_color().to_string(),
                trail: trail.points().copied().collect(),
                signal: kind.signal(),
            });
        }
        agents.sort_by_key(|a| a.id);

        let mut obstacle_query =
            world.query_filtered::<(&Position, &Obstacle), Without<AgentKind>>();
        let obstacles = obstacle_query
            .iter(world)
            .map(|(pos, obstacle)| ObstacleSnapshot {
                x: pos.x,
                y: pos.y,
                radius: obstacle.radius,
            })
            .collect();

        let mut zone_query = world.query_filtered::<(&Position, &WindZone), Without<AgentKind>>();
        let wind_zones = zone_query
            .iter(world)
            .map(|(pos, zone)| WindZoneSnapshot {
                x: pos.x,
                y: pos.y,
                radius: zone.radius,
                drift_x: zone.drift_x,
                drift_y: zone.drift_y,
            })
            .collect();

        let flags = RenderFlags::from_params(world.resource::<FlockParams>());
        let viewport = *world.resource::<Viewport>();
        let global_vector = if flags.show_global_vector {
            world.resource::<FlockSummary>().global_vector
        } else {
            None
        };

        Self {
            tick,
            running,
            width: viewport.width,
            height: viewport.height,
            agents,
            obstacles,
            wind_zones,
            signals: world.resource::<SignalBoard>().signals().to_vec(),
            global_vector,
            flags,
        }
    }

    pub fn count(&self, kind: KindTag) -> usize {
        self.agents.iter().filter(|a| a.kind == kind).count()
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

//! Population manager.
//!
//! Creates and replaces the agent and hazard collections. Every `init_*`
//! function despawns the previous collection of its kind before spawning the
//! new one, so a collection is never observed half-replaced by a tick.

use crate::components::*;
use crate::config::{SimConfig, Viewport};
use crate::systems::metrics::{FlockSummary, MetricsHistory, SimTick};
use crate::systems::predation::PendingPredation;
use crate::systems::signal::SignalBoard;
use bevy_ecs::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seedable random source for spawning.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn seeded(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(StdRng::seed_from_u64(seed)),
            None => Self(StdRng::from_entropy()),
        }
    }
}

/// Next agent id to hand out. Ids are never reused within a world.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct NextAgentId(pub u32);

impl NextAgentId {
    /// Reserve `count` consecutive ids and return the first.
    pub fn reserve(&mut self, count: usize) -> u32 {
        let first = self.0;
        self.0 = self.0.wrapping_add(count as u32);
        first
    }
}

fn spawn_params(world: &World) -> (Viewport, f32, usize) {
    let viewport = *world.resource::<Viewport>();
    let config = world.resource::<SimConfig>();
    (viewport, config.spawn_speed, config.trail_length)
}

fn despawn_agents(world: &mut World, tag: KindTag) {
    let mut query = world.query::<(Entity, &AgentKind)>();
    let doomed: Vec<Entity> = query
        .iter(world)
        .filter(|(_, kind)| kind.tag() == tag)
        .map(|(entity, _)| entity)
        .collect();
    for entity in doomed {
        world.despawn(entity);
    }
}

fn despawn_with<T: Component>(world: &mut World) {
    let mut query = world.query_filtered::<Entity, With<T>>();
    let doomed: Vec<Entity> = query.iter(world).collect();
    for entity in doomed {
        world.despawn(entity);
    }
}

fn spawn_agents(world: &mut World, tag: KindTag, count: usize) {
    despawn_agents(world, tag);

    let (viewport, speed, trail_len) = spawn_params(world);
    let first_id = world.resource_mut::<NextAgentId>().reserve(count);

    let bundles: Vec<AgentBundle> = {
        let mut rng = world.resource_mut::<SimRng>();
        (0..count)
            .map(|i| {
                let pos = Position::new(
                    rng.0.gen::<f32>() * viewport.width,
                    rng.0.gen::<f32>() * viewport.height,
                );
                let vel = Velocity::new(
                    rng.0.gen::<f32>() * 2.0 * speed - speed,
                    rng.0.gen::<f32>() * 2.0 * speed - speed,
                );
                let id = first_id.wrapping_add(i as u32);
                match tag {
                    KindTag::Normal => AgentBundle::new(id, AgentKind::Normal, pos, vel, trail_len),
                    KindTag::Predator => {
                        AgentBundle::new(id, AgentKind::Predator, pos, vel, trail_len)
                    }
                    KindTag::Leader => AgentBundle::leader(id, pos, vel, trail_len),
                }
            })
            .collect()
    };

    for bundle in bundles {
        world.spawn(bundle);
    }
    tracing::debug!(kind = tag.as_str(), count, "spawned agents");
}

/// Replace all normal agents and clear the metrics history.
pub fn init_normals(world: &mut World, count: usize) {
    spawn_agents(world, KindTag::Normal, count);
    world.resource_mut::<MetricsHistory>().clear();
    world.resource_mut::<FlockSummary>().global_vector = None;
}

pub fn init_predators(world: &mut World, count: usize) {
    spawn_agents(world, KindTag::Predator, count);
}

/// Replace all leaders and republish their spawn-time signals.
pub fn init_leaders(world: &mut World, count: usize) {
    spawn_agents(world, KindTag::Leader, count);
    publish_leader_signals(world);
}

/// Post every leader's stored signal to the board, in id order.
///
/// Used when leaders appear, so followers react to a new leader's spawn
/// state before the next broadcast.
pub fn publish_leader_signals(world: &mut World) {
    let mut query = world.query::<(&AgentId, &AgentKind)>();
    let mut signals: Vec<(u32, Signal)> = query
        .iter(world)
        .filter_map(|(id, kind)| kind.signal().map(|s| (id.0, s)))
        .collect();
    signals.sort_by_key(|(id, _)| *id);
    world
        .resource_mut::<SignalBoard>()
        .publish(signals.into_iter().map(|(_, s)| s).collect());
}

/// Replace all obstacles. Radii are drawn from `[0, max_hazard_radius)`.
pub fn init_obstacles(world: &mut World, count: usize) {
    despawn_with::<Obstacle>(world);

    let (viewport, _, _) = spawn_params(world);
    let max_radius = world.resource::<SimConfig>().max_hazard_radius;
    let bundles: Vec<ObstacleBundle> = {
        let mut rng = world.resource_mut::<SimRng>();
        (0..count)
            .map(|_| {
                ObstacleBundle::new(
                    rng.0.gen::<f32>() * viewport.width,
                    rng.0.gen::<f32>() * viewport.height,
                    rng.0.gen::<f32>() * max_radius,
                )
            })
            .collect()
    };
    for bundle in bundles {
        world.spawn(bundle);
    }
}

/// Replace all wind zones. Drift components are drawn from `[0, max_wind_drift)`.
pub fn init_wind_zones(world: &mut World, count: usize) {
    despawn_with::<WindZone>(world);

    let (viewport, _, _) = spawn_params(world);
    let (max_radius, max_drift) = {
        let config = world.resource::<SimConfig>();
        (config.max_hazard_radius, config.max_wind_drift)
    };
    let bundles: Vec<WindZoneBundle> = {
        let mut rng = world.resource_mut::<SimRng>();
        (0..count)
            .map(|_| {
                WindZoneBundle::new(
                    rng.0.gen::<f32>() * viewport.width,
                    rng.0.gen::<f32>() * viewport.height,
                    rng.0.gen::<f32>() * max_radius,
                    rng.0.gen::<f32>() * max_drift,
                    rng.0.gen::<f32>() * max_drift,
                )
            })
            .collect()
    };
    for bundle in bundles {
        world.spawn(bundle);
    }
}

/// Recreate every population and hazard from the configured counts.
///
/// Also clears the tick counter, metrics, pending predation and the signal
/// board.
pub fn reset(world: &mut World) {
    let config = world.resource::<SimConfig>().clone();

    world.resource_mut::<SimTick>().0 = 0;
    world.resource_mut::<PendingPredation>().clear();
    world.resource_mut::<SignalBoard>().clear();

    init_normals(world, config.num_normals);
    init_predators(world, config.num_predators);
    init_leaders(world, config.num_leaders);
    init_obstacles(world, config.num_obstacles);
    init_wind_zones(world, config.num_wind_zones);

    tracing::info!(
        normals = config.num_normals,
        predators = config.num_predators,
        leaders = config.num_leaders,
        "simulation reset"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with(config: SimConfig) -> World {
        let mut world = World::new();
        world.insert_resource(Viewport::new(config.viewport_width, config.viewport_height));
        world.insert_resource(SimRng::seeded(Some(3)));
        world.insert_resource(NextAgentId::default());
        world.insert_resource(MetricsHistory::new(config.max_history));
        world.insert_resource(FlockSummary::default());
        world.insert_resource(SimTick::default());
        world.insert_resource(PendingPredation::default());
        world.insert_resource(SignalBoard::default());
        world.insert_resource(config);
        world
    }

    fn count(world: &mut World, tag: KindTag) -> usize {
        let mut query = world.query::<&AgentKind>();
        query.iter(world).filter(|kind| kind.tag() == tag).count()
    }

    #[test]
    fn test_init_replaces_previous_collection() {
        let mut world = world_with(SimConfig::default());
        init_normals(&mut world, 10);
        init_predators(&mut world, 2);
        init_normals(&mut world, 4);

        assert_eq!(count(&mut world, KindTag::Normal), 4);
        assert_eq!(count(&mut world, KindTag::Predator), 2);
    }

    #[test]
    fn test_spawns_inside_viewport_with_bounded_velocity() {
        let mut world = world_with(SimConfig::default());
        init_normals(&mut world, 200);

        let mut query = world.query::<(&Position, &Velocity)>();
        for (pos, vel) in query.iter(&world) {
            assert!((0.0..1280.0).contains(&pos.x));
            assert!((0.0..720.0).contains(&pos.y));
            assert!((-5.0..5.0).contains(&vel.vx));
            assert!((-5.0..5.0).contains(&vel.vy));
        }
    }

    #[test]
    fn test_leaders_publish_spawn_signal() {
        let mut world = world_with(SimConfig::default());
        init_leaders(&mut world, 2);

        let board = world.resource::<SignalBoard>();
        assert_eq!(board.signals().len(), 2);
    }

    #[test]
    fn test_hazards_within_configured_ranges() {
        let mut world = world_with(SimConfig::default());
        init_obstacles(&mut world, 20);
        init_wind_zones(&mut world, 20);
        init_obstacles(&mut world, 3);

        let mut obstacles = world.query::<&Obstacle>();
        let radii: Vec<f32> = obstacles.iter(&world).map(|o| o.radius).collect();
        assert_eq!(radii.len(), 3);
        assert!(radii.iter().all(|r| (0.0..40.0).contains(r)));

        let mut zones = world.query::<&WindZone>();
        assert_eq!(zones.iter(&world).count(), 20);
        assert!(zones
            .iter(&world)
            .all(|z| (0.0..20.0).contains(&z.drift_x) && (0.0..20.0).contains(&z.drift_y)));
    }

    #[test]
    fn test_seeded_spawns_reproducible() {
        let config = SimConfig::default();
        let mut a = world_with(config.clone());
        let mut b = world_with(config);
        init_normals(&mut a, 5);
        init_normals(&mut b, 5);

        let positions = |world: &mut World| {
            let mut query = world.query::<(&AgentId, &Position)>();
            let mut all: Vec<(u32, Position)> =
                query.iter(world).map(|(id, p)| (id.0, *p)).collect();
            all.sort_by_key(|(id, _)| *id);
            all
        };
        assert_eq!(positions(&mut a), positions(&mut b));
    }

    #[test]
    fn test_reset_restores_configured_counts() {
        let config = SimConfig {
            num_normals: 7,
            num_predators: 2,
            num_leaders: 3,
            ..Default::default()
        };
        let mut world = world_with(config);
        world.resource_mut::<SimTick>().0 = 99;
        world.resource_mut::<MetricsHistory>().alive.push(99, 1);

        reset(&mut world);

        assert_eq!(count(&mut world, KindTag::Normal), 7);
        assert_eq!(count(&mut world, KindTag::Predator), 2);
        assert_eq!(count(&mut world, KindTag::Leader), 3);
        assert_eq!(world.resource::<SimTick>().0, 0);
        assert!(world.resource::<MetricsHistory>().alive.is_empty());
    }
}

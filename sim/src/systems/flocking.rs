//! Tick phases for each agent kind.
//!
//! A tick runs three phases in a fixed order: normals, predators, leaders.
//! Each phase takes a [`Flock`] snapshot of every agent and hazard, computes
//! new velocities for its own kind from that snapshot only, then writes
//! velocities back and advances positions. Later phases therefore see the
//! movement of earlier ones, and no agent sees a half-updated neighbor from
//! its own phase.
//!
//! ## Data Access
//! - Reads: AgentKind, AgentId, Obstacle, WindZone, FlockParams, SimConfig,
//!   Viewport, SignalBoard, Pointer
//! - Writes: Position, Velocity, Trail, PendingPredation

use crate::components::*;
use crate::config::{FlockParams, Pointer, SimConfig, Viewport};
use crate::systems::movement::{advance, keep_within_bounds, limit_speed};
use crate::systems::predation::{mark_prey, PendingPredation};
use crate::systems::rules::{self, AgentState};
use crate::systems::signal::SignalBoard;
use bevy_ecs::prelude::*;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub type AgentQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static AgentId,
        &'static AgentKind,
        &'static mut Position,
        &'static mut Velocity,
        &'static mut Trail,
    ),
>;
pub type ObstacleQuery<'w, 's> =
    Query<'w, 's, (&'static Position, &'static Obstacle), Without<AgentKind>>;
pub type WindQuery<'w, 's> =
    Query<'w, 's, (&'static Position, &'static WindZone), Without<AgentKind>>;

/// Read-only view of the world taken at the start of a phase.
///
/// Agents are ordered by id, which is spawn order.
#[derive(Debug, Clone, Default)]
pub struct Flock {
    pub normals: Vec<AgentState>,
    pub predators: Vec<AgentState>,
    pub leaders: Vec<AgentState>,
    pub obstacles: Vec<(Position, Obstacle)>,
    pub wind_zones: Vec<(Position, WindZone)>,
}

impl Flock {
    pub fn capture(agents: &AgentQuery, obstacles: &ObstacleQuery, winds: &WindQuery) -> Self {
        let mut by_kind: [Vec<(u32, AgentState)>; 3] = Default::default();
        for (entity, id, kind, pos, vel, _) in agents.iter() {
            let slot = match kind.tag() {
                KindTag::Normal => 0,
                KindTag::Predator => 1,
                KindTag::Leader => 2,
            };
            by_kind[slot].push((id.0, AgentState::new(entity, *pos, *vel)));
        }
        let [normals, predators, leaders] = by_kind.map(|mut states| {
            states.sort_by_key(|(id, _)| *id);
            states.into_iter().map(|(_, s)| s).collect::<Vec<_>>()
        });

        Self {
            normals,
            predators,
            leaders,
            obstacles: obstacles.iter().map(|(p, o)| (*p, *o)).collect(),
            wind_zones: winds.iter().map(|(p, w)| (*p, *w)).collect(),
        }
    }
}

/// Everything a rule set reads besides the agent itself.
pub struct PhaseContext<'a> {
    pub flock: &'a Flock,
    pub params: &'a FlockParams,
    pub config: &'a SimConfig,
    pub viewport: &'a Viewport,
    pub signals: &'a [Signal],
    pub pointer: Option<Position>,
}

impl PhaseContext<'_> {
    fn hazards(&self, me: &AgentState, vel: &mut Velocity) {
        if !self.params.use_obstacles {
            return;
        }
        rules::avoid_obstacles(
            me,
            vel,
            &self.flock.obstacles,
            self.params.visual_range,
            self.params.separation,
            self.config.obstacle_push,
            self.config.proximity_epsilon,
        );
        rules::wind_drift(me, vel, &self.flock.wind_zones);
    }

    fn bounds(&self, me: &AgentState, vel: &mut Velocity) {
        keep_within_bounds(
            &me.pos,
            vel,
            self.viewport,
            self.config.margin,
            self.config.turn_factor,
        );
    }

    /// New velocity for a normal agent.
    pub fn steer_normal(&self, me: &AgentState) -> Velocity {
        let params = self.params;
        let range = params.visual_range;
        let mut vel = me.vel;

        self.bounds(me, &mut vel);
        rules::cohesion(me, &mut vel, &self.flock.normals, range, params.coherence);
        if params.use_leaders {
            let leader_range = range * self.config.follower_sees_leader_mult;
            let leaders = &self.flock.leaders;
            rules::follow_leader(me, &mut vel, leaders, leader_range, params.follow_leader);
        }
        if params.use_pointer_leader {
            if let Some(pointer) = &self.pointer {
                let pointer_range = range * self.config.follower_sees_leader_mult;
                rules::follow_pointer(me, &mut vel, pointer, pointer_range, params.pointer_weight);
            }
        }
        let min_separation = self.config.min_separation;
        rules::separation(me, &mut vel, &self.flock.normals, min_separation, params.separation);
        if params.use_predators {
            let predators = &self.flock.predators;
            rules::avoid_predators(me, &mut vel, predators, range, params.avoid_predator);
        }
        if params.use_leaders {
            rules::react_to_signals(me, &mut vel, self.signals, range);
        }
        rules::alignment(me, &mut vel, &self.flock.normals, range, params.alignment);
        self.hazards(me, &mut vel);

        limit_speed(&mut vel, self.config.speed_limit);
        vel
    }

    /// New velocity for a predator.
    pub fn steer_predator(&self, me: &AgentState) -> Velocity {
        let params = self.params;
        let mut vel = me.vel;

        self.bounds(me, &mut vel);
        if params.use_predators {
            let range = params.visual_range * self.config.predator_sees_prey_mult;
            rules::pursue_prey(me, &mut vel, &self.flock.normals, range, params.predation);
            let factor = params.alignment * self.config.predator_alignment_correction;
            rules::match_prey_velocity(me, &mut vel, &self.flock.normals, range, factor);
        }
        self.hazards(me, &mut vel);

        limit_speed(&mut vel, self.config.speed_limit);
        vel
    }

    /// New velocity for a leader.
    pub fn steer_leader(&self, me: &AgentState) -> Velocity {
        let params = self.params;
        let mut vel = me.vel;

        self.bounds(me, &mut vel);
        if params.use_predators {
            let range = params.visual_range * self.config.leader_sees_predator_mult;
            let predators = &self.flock.predators;
            rules::avoid_predators(me, &mut vel, predators, range, params.avoid_predator);
        }
        let range = params.visual_range;
        rules::cohesion(me, &mut vel, &self.flock.normals, range, params.coherence);

        limit_speed(&mut vel, self.config.speed_limit);
        vel
    }
}

fn steer_all<F>(states: &[AgentState], steer: F) -> Vec<(Entity, Velocity)>
where
    F: Fn(&AgentState) -> Velocity + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        states.par_iter().map(|s| (s.entity, steer(s))).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        states.iter().map(|s| (s.entity, steer(s))).collect()
    }
}

fn integrate(agents: &mut AgentQuery, steered: &[(Entity, Velocity)], trail_len: usize) {
    for (entity, new_vel) in steered {
        if let Ok((_, _, _, mut pos, mut vel, mut trail)) = agents.get_mut(*entity) {
            *vel = *new_vel;
            advance(&mut pos, new_vel, &mut trail, trail_len);
        }
    }
}

fn pointer_position(pointer: &Pointer) -> Option<Position> {
    pointer.0.map(|(x, y)| Position::new(x, y))
}

// ============================================================================
// PHASE SYSTEMS
// ============================================================================

/// Steer and move every normal agent.
#[allow(clippy::too_many_arguments)]
pub fn normal_phase_system(
    params: Res<FlockParams>,
    config: Res<SimConfig>,
    viewport: Res<Viewport>,
    board: Res<SignalBoard>,
    pointer: Res<Pointer>,
    mut agents: AgentQuery,
    obstacles: ObstacleQuery,
    winds: WindQuery,
) {
    let flock = Flock::capture(&agents, &obstacles, &winds);
    let ctx = PhaseContext {
        flock: &flock,
        params: &params,
        config: &config,
        viewport: &viewport,
        signals: board.signals(),
        pointer: pointer_position(&pointer),
    };
    let steered = steer_all(&flock.normals, |me| ctx.steer_normal(me));
    integrate(&mut agents, &steered, config.trail_length);
}

/// Steer predators, mark prey within eat range, then move predators.
///
/// Prey are marked against predator positions from before this phase moves
/// them, so a predator eats what it reached last tick.
#[allow(clippy::too_many_arguments)]
pub fn predator_phase_system(
    params: Res<FlockParams>,
    config: Res<SimConfig>,
    viewport: Res<Viewport>,
    mut pending: ResMut<PendingPredation>,
    mut agents: AgentQuery,
    obstacles: ObstacleQuery,
    winds: WindQuery,
) {
    let flock = Flock::capture(&agents, &obstacles, &winds);
    if flock.predators.is_empty() {
        return;
    }
    let ctx = PhaseContext {
        flock: &flock,
        params: &params,
        config: &config,
        viewport: &viewport,
        signals: &[],
        pointer: None,
    };
    let steered = steer_all(&flock.predators, |me| ctx.steer_predator(me));

    if params.use_predators {
        pending.mark(mark_prey(&flock.predators, &flock.normals, params.eat_range));
    }

    integrate(&mut agents, &steered, config.trail_length);
}

/// Steer and move leaders. Runs after prey removal.
pub fn leader_phase_system(
    params: Res<FlockParams>,
    config: Res<SimConfig>,
    viewport: Res<Viewport>,
    mut agents: AgentQuery,
    obstacles: ObstacleQuery,
    winds: WindQuery,
) {
    let flock = Flock::capture(&agents, &obstacles, &winds);
    if flock.leaders.is_empty() {
        return;
    }
    let ctx = PhaseContext {
        flock: &flock,
        params: &params,
        config: &config,
        viewport: &viewport,
        signals: &[],
        pointer: None,
    };
    let steered = steer_all(&flock.leaders, |me| ctx.steer_leader(me));
    integrate(&mut agents, &steered, config.trail_length);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: u32, x: f32, y: f32, vx: f32, vy: f32) -> AgentState {
        AgentState::new(Entity::from_raw(id), Position::new(x, y), Velocity::new(vx, vy))
    }

    fn context<'a>(
        flock: &'a Flock,
        params: &'a FlockParams,
        config: &'a SimConfig,
        viewport: &'a Viewport,
    ) -> PhaseContext<'a> {
        PhaseContext {
            flock,
            params,
            config,
            viewport,
            signals: &[],
            pointer: None,
        }
    }

    #[test]
    fn test_steered_speed_never_exceeds_limit() {
        let flock = Flock {
            normals: vec![agent(0, 640.0, 360.0, 5.0, 5.0), agent(1, 645.0, 360.0, -5.0, 5.0)],
            predators: vec![agent(2, 650.0, 365.0, 0.0, 0.0)],
            obstacles: vec![(Position::new(641.0, 361.0), Obstacle { radius: 3.0 })],
            ..Default::default()
        };
        let params = FlockParams {
            use_predators: true,
            use_obstacles: true,
            ..Default::default()
        };
        let config = SimConfig::default();
        let viewport = Viewport::new(1280.0, 720.0);
        let ctx = context(&flock, &params, &config, &viewport);

        for me in &flock.normals {
            assert!(ctx.steer_normal(me).magnitude() <= config.speed_limit + 1e-4);
        }
        assert!(ctx.steer_predator(&flock.predators[0]).magnitude() <= config.speed_limit + 1e-4);
    }

    #[test]
    fn test_predator_rules_gated_by_toggle() {
        let flock = Flock {
            normals: vec![agent(0, 660.0, 360.0, 3.0, 0.0)],
            predators: vec![agent(1, 640.0, 360.0, 0.0, 0.0)],
            ..Default::default()
        };
        let config = SimConfig::default();
        let viewport = Viewport::new(1280.0, 720.0);

        let off = FlockParams::default();
        let ctx = context(&flock, &off, &config, &viewport);
        assert_eq!(ctx.steer_predator(&flock.predators[0]), Velocity::default());

        let on = FlockParams {
            use_predators: true,
            ..Default::default()
        };
        let ctx = context(&flock, &on, &config, &viewport);
        assert!(ctx.steer_predator(&flock.predators[0]).vx > 0.0);
    }

    #[test]
    fn test_pointer_only_followed_when_enabled() {
        let flock = Flock {
            normals: vec![agent(0, 640.0, 360.0, 0.0, 0.0)],
            ..Default::default()
        };
        let config = SimConfig::default();
        let viewport = Viewport::new(1280.0, 720.0);
        let params = FlockParams {
            use_pointer_leader: true,
            ..Default::default()
        };
        let mut ctx = context(&flock, &params, &config, &viewport);
        ctx.pointer = Some(Position::new(650.0, 360.0));

        assert!(ctx.steer_normal(&flock.normals[0]).vx > 0.0);

        let disabled = FlockParams::default();
        ctx.params = &disabled;
        assert_eq!(ctx.steer_normal(&flock.normals[0]), Velocity::default());
    }

    #[test]
    fn test_leader_sees_predators_farther_than_normals() {
        let flock = Flock {
            normals: vec![agent(0, 640.0, 360.0, 0.0, 0.0)],
            predators: vec![agent(1, 790.0, 360.0, 0.0, 0.0)],
            leaders: vec![agent(2, 640.0, 360.0, 0.0, 0.0)],
            ..Default::default()
        };
        let params = FlockParams {
            use_predators: true,
            ..Default::default()
        };
        let config = SimConfig::default();
        let viewport = Viewport::new(1280.0, 720.0);
        let ctx = context(&flock, &params, &config, &viewport);

        // 150 px is outside the normal range of 75 but inside the leader's 225.
        assert_eq!(ctx.steer_normal(&flock.normals[0]), Velocity::default());
        let fled = ctx.steer_leader(&flock.leaders[0]);
        assert!((fled.vx + config.speed_limit).abs() < 1e-4);
        assert_eq!(fled.vy, 0.0);
    }

    #[test]
    fn test_leader_drawn_to_nearby_normals() {
        let flock = Flock {
            normals: vec![
                agent(0, 660.0, 360.0, 0.0, 0.0),
                agent(1, 660.0, 380.0, 0.0, 0.0),
                agent(2, 1000.0, 600.0, 0.0, 0.0),
            ],
            leaders: vec![agent(3, 640.0, 360.0, 0.0, 0.0)],
            ..Default::default()
        };
        let params = FlockParams::default();
        let config = SimConfig::default();
        let viewport = Viewport::new(1280.0, 720.0);
        let ctx = context(&flock, &params, &config, &viewport);

        // Centroid of the two normals in range is (660, 370).
        let vel = ctx.steer_leader(&flock.leaders[0]);
        assert!((vel.vx - 20.0 * params.coherence).abs() < 1e-5);
        assert!((vel.vy - 10.0 * params.coherence).abs() < 1e-5);
    }

    #[test]
    fn test_leaders_and_signals_only_followed_when_enabled() {
        let flock = Flock {
            normals: vec![agent(0, 645.0, 360.0, 0.0, 0.0)],
            leaders: vec![agent(1, 640.0, 360.0, 3.0, 0.0)],
            ..Default::default()
        };
        let signals = [Signal { x: 640.0, y: 360.0, vx: 3.0, vy: 0.0 }];
        let config = SimConfig::default();
        let viewport = Viewport::new(1280.0, 720.0);

        let off = FlockParams::default();
        let mut ctx = context(&flock, &off, &config, &viewport);
        ctx.signals = &signals;
        assert_eq!(ctx.steer_normal(&flock.normals[0]), Velocity::default());

        let on = FlockParams {
            use_leaders: true,
            ..Default::default()
        };
        ctx.params = &on;
        let vel = ctx.steer_normal(&flock.normals[0]);
        assert!((vel.vx - 0.5).abs() < 1e-5);
        assert_eq!(vel.vy, 0.0);

        // Without a posted signal only the leader's pull remains.
        ctx.signals = &[];
        let vel = ctx.steer_normal(&flock.normals[0]);
        assert!((vel.vx + 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_phases_move_agents_and_mark_prey() {
        let mut world = World::new();
        world.insert_resource(FlockParams {
            use_predators: true,
            eat_range: 30.0,
            ..Default::default()
        });
        world.insert_resource(SimConfig::default());
        world.insert_resource(Viewport::new(1280.0, 720.0));
        world.insert_resource(SignalBoard::default());
        world.insert_resource(Pointer::default());
        world.insert_resource(PendingPredation::default());

        let mut spawn = |id: u32, kind: AgentKind, (x, y): (f32, f32), (vx, vy): (f32, f32)| {
            let bundle =
                AgentBundle::new(id, kind, Position::new(x, y), Velocity::new(vx, vy), 8);
            world.spawn(bundle).id()
        };
        let prey = spawn(1, AgentKind::Normal, (640.0, 360.0), (1.0, 0.0));
        let safe = spawn(2, AgentKind::Normal, (300.0, 300.0), (0.0, 1.0));
        spawn(3, AgentKind::Predator, (650.0, 360.0), (0.0, 0.0));

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (normal_phase_system, predator_phase_system, leader_phase_system).chain(),
        );
        schedule.run(&mut world);

        let trail = world.get::<Trail>(safe).unwrap();
        let pos = world.get::<Position>(safe).unwrap();
        assert_eq!(trail.latest(), Some((pos.x, pos.y)));

        assert_eq!(world.resource::<PendingPredation>().marked(), &[prey]);
    }
}

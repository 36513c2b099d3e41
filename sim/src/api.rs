//! Public API for the simulation.
//!
//! [`FlockWorld`] is the single context object a host drives: it owns the
//! ECS world, the tick schedule, the signal schedule and the frame scheduler.
//! Hosts call [`FlockWorld::frame`] once per display refresh and read a
//! [`Snapshot`] to draw.
//!
//! ## Tick Order
//!
//! 1. `normal_phase_system` - normals steer from a snapshot, then move
//! 2. `predator_phase_system` - predators steer, mark prey, then move
//! 3. `predation_apply_system` - marked prey are despawned
//! 4. `leader_phase_system` - leaders steer and move
//! 5. `metrics_system` - extension, alive count and global vector
//!
//! Leader signals are broadcast by a separate schedule on their own timer.

use crate::components::*;
use crate::config::{ConfigError, FlockParams, Pointer, SimConfig, Viewport};
use crate::geometry;
use crate::population::{self, NextAgentId, SimRng};
use crate::render_bridge;
use crate::scheduler::{FrameReport, FrameScheduler, RunState};
use crate::systems::*;
use crate::world::Snapshot;
use bevy_ecs::prelude::*;
use std::path::Path;

/// The main simulation world container.
pub struct FlockWorld {
    world: World,
    tick_schedule: Schedule,
    signal_schedule: Schedule,
    scheduler: FrameScheduler,
}

impl FlockWorld {
    /// Create a world with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    /// Create a world and spawn every population from `config`.
    ///
    /// Fields that fail [`SimConfig::validate`] fall back to their defaults.
    pub fn with_config(config: SimConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                tracing::warn!(%err, "repairing invalid config with defaults");
                config.repaired()
            }
        };
        let mut world = World::new();

        world.insert_resource(Viewport::new(config.viewport_width, config.viewport_height));
        world.insert_resource(SimRng::seeded(config.rng_seed));
        world.insert_resource(NextAgentId::default());
        world.insert_resource(FlockParams::default());
        world.insert_resource(Pointer::default());
        world.insert_resource(SimTick(0));
        world.insert_resource(MetricsHistory::new(config.max_history));
        world.insert_resource(FlockSummary::default());
        world.insert_resource(PendingPredation::default());
        world.insert_resource(SignalBoard::default());

        let scheduler = FrameScheduler::new(&config);
        world.insert_resource(config);

        let mut tick_schedule = Schedule::default();
        tick_schedule.add_systems(
            (
                normal_phase_system,
                predator_phase_system,
                predation_apply_system,
                leader_phase_system,
                metrics_system,
            )
                .chain(),
        );

        let mut signal_schedule = Schedule::default();
        signal_schedule.add_systems(broadcast_signals_system);

        let mut sim = Self {
            world,
            tick_schedule,
            signal_schedule,
            scheduler,
        };
        population::reset(&mut sim.world);
        sim
    }

    /// Create a world from a JSON config file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::with_config(SimConfig::load(path)?))
    }

    // ========================================================================
    // DRIVING
    // ========================================================================

    /// Advance one display frame of `dt` seconds.
    ///
    /// Runs a tick only while running; the signal and plot timers advance
    /// either way.
    pub fn frame(&mut self, dt: f32) -> FrameReport {
        let mut report = FrameReport::default();
        if self.scheduler.is_running() {
            report.eaten = self.step();
            report.ran = true;
        }

        let (signal_broadcasts, plot_due) = self.scheduler.advance_timers(dt);
        if signal_broadcasts > 0 {
            self.broadcast_signals();
        }
        report.signal_broadcasts = signal_broadcasts;
        report.plot_due = plot_due;
        report.tick = self.current_tick();
        report
    }

    /// Run one simulation tick regardless of run state.
    ///
    /// Returns the number of prey eaten.
    pub fn step(&mut self) -> usize {
        self.world.resource_mut::<SimTick>().increment();
        self.tick_schedule.run(&mut self.world);
        self.world.resource::<PendingPredation>().last_eaten
    }

    /// Publish every leader's current state as its signal.
    pub fn broadcast_signals(&mut self) {
        self.signal_schedule.run(&mut self.world);
    }

    /// Recreate every population from the configured counts and clear history.
    pub fn reset(&mut self) {
        population::reset(&mut self.world);
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    pub fn resume(&mut self) {
        self.scheduler.resume();
    }

    pub fn toggle_pause(&mut self) -> RunState {
        self.scheduler.toggle()
    }

    pub fn run_state(&self) -> RunState {
        self.scheduler.state()
    }

    /// Ticks run since the last reset.
    pub fn current_tick(&self) -> u64 {
        self.world.resource::<SimTick>().0
    }

    // ========================================================================
    // POPULATIONS
    // ========================================================================

    pub fn init_normals(&mut self, count: usize) {
        population::init_normals(&mut self.world, count);
    }

    pub fn init_predators(&mut self, count: usize) {
        population::init_predators(&mut self.world, count);
    }

    pub fn init_leaders(&mut self, count: usize) {
        population::init_leaders(&mut self.world, count);
    }

    pub fn init_obstacles(&mut self, count: usize) {
        population::init_obstacles(&mut self.world, count);
    }

    pub fn init_wind_zones(&mut self, count: usize) {
        population::init_wind_zones(&mut self.world, count);
    }

    /// Spawn a single agent at a known state, for scripted scenarios.
    pub fn insert_agent(
        &mut self,
        kind: KindTag,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
    ) -> AgentId {
        let id = self.world.resource_mut::<NextAgentId>().reserve(1);
        let trail_len = self.world.resource::<SimConfig>().trail_length;
        let pos = Position::new(x, y);
        let vel = Velocity::new(vx, vy);
        let bundle = match kind {
            KindTag::Normal => AgentBundle::new(id, AgentKind::Normal, pos, vel, trail_len),
            KindTag::Predator => {
                AgentBundle::new(id, AgentKind::Predator, pos, vel, trail_len)
            }
            KindTag::Leader => AgentBundle::leader(id, pos, vel, trail_len),
        };
        self.world.spawn(bundle);
        if kind == KindTag::Leader {
            population::publish_leader_signals(&mut self.world);
        }
        AgentId(id)
    }

    pub fn insert_obstacle(&mut self, x: f32, y: f32, radius: f32) {
        self.world.spawn(ObstacleBundle::new(x, y, radius));
    }

    pub fn insert_wind_zone(&mut self, x: f32, y: f32, radius: f32, drift_x: f32, drift_y: f32) {
        self.world.spawn(WindZoneBundle::new(x, y, radius, drift_x, drift_y));
    }

    // ========================================================================
    // PARAMETERS
    // ========================================================================

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn params(&self) -> &FlockParams {
        self.world.resource::<FlockParams>()
    }

    /// Replace the runtime parameters. Takes effect on the next tick.
    pub fn set_params(&mut self, params: FlockParams) {
        let params = params.sanitized();
        tracing::debug!(?params, "parameters updated");
        self.world.insert_resource(params);
    }

    /// Resize the viewport. Existing agents are not moved.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            tracing::warn!(width, height, "ignoring invalid viewport size");
            return;
        }
        self.world.insert_resource(Viewport::new(width, height));
    }

    pub fn viewport(&self) -> Viewport {
        *self.world.resource::<Viewport>()
    }

    /// Update the pointer position used by the pointer-leader rule.
    pub fn set_pointer(&mut self, pointer: Option<(f32, f32)>) {
        self.world.insert_resource(Pointer(pointer));
    }

    // ========================================================================
    // OUTPUT
    // ========================================================================

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        let tick = self.current_tick();
        let running = self.scheduler.is_running();
        Snapshot::from_world(&mut self.world, tick, running)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the snapshot packed as a flat `f32` buffer.
    pub fn snapshot_flatbuffer(&mut self) -> Vec<f32> {
        render_bridge::snapshot_to_flatbuffer(&self.snapshot())
    }

    pub fn metrics(&self) -> &MetricsHistory {
        self.world.resource::<MetricsHistory>()
    }

    /// Centroid and mean velocity of the normal flock after the last tick.
    pub fn global_vector(&self) -> Option<GlobalVector> {
        self.world.resource::<FlockSummary>().global_vector
    }

    /// Prey eaten since the last reset.
    pub fn total_eaten(&self) -> u64 {
        self.world.resource::<PendingPredation>().total_eaten
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn agent_count(&mut self, kind: KindTag) -> usize {
        let mut query = self.world.query::<&AgentKind>();
        query.iter(&self.world).filter(|k| k.tag() == kind).count()
    }

    /// Current position of an agent, `None` if it no longer exists.
    pub fn agent_position(&mut self, id: AgentId) -> Option<Position> {
        let mut query = self.world.query::<(&AgentId, &Position)>();
        query.iter(&self.world).find(|(agent, _)| **agent == id).map(|(_, pos)| *pos)
    }

    /// Distance between two agents, `None` if either was eaten.
    pub fn distance_between(&mut self, a: AgentId, b: AgentId) -> Option<f32> {
        let pa = self.agent_position(a);
        let pb = self.agent_position(b);
        geometry::distance(pa.as_ref(), pb.as_ref())
    }

    /// Ids of the `n` normal agents closest to `(x, y)`, nearest first.
    pub fn closest_normals(&mut self, x: f32, y: f32, n: usize) -> Vec<AgentId> {
        let mut query = self.world.query::<(&AgentId, &AgentKind, &Position)>();
        let mut normals: Vec<(AgentId, Position)> = query
            .iter(&self.world)
            .filter(|(_, kind, _)| kind.tag() == KindTag::Normal)
            .map(|(id, _, pos)| (*id, *pos))
            .collect();
        normals.sort_by_key(|(id, _)| id.0);

        let positions: Vec<Position> = normals.iter().map(|(_, pos)| *pos).collect();
        geometry::n_closest(&Position::new(x, y), &positions, n, None)
            .into_iter()
            .map(|i| normals[i].0)
            .collect()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for FlockWorld {
    fn default() -> Self {
        Self::new()
    }
}

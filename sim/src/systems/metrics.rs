//! Per-tick flock metrics.
//!
//! After every tick the normal flock is summarized into two bounded series
//! (flock extension and alive count) and a global vector. Only normal agents
//! are measured; predators and leaders are excluded.

use crate::components::*;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Global simulation tick counter. The first tick is tick 1.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Fixed-capacity series of one sample per tick, oldest evicted first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedSeries<T> {
    values: VecDeque<T>,
    capacity: usize,
    first_tick: u64,
}

impl<T: Copy> BoundedSeries<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            first_tick: 0,
        }
    }

    /// Record the sample for `tick`. Samples must arrive one per tick.
    pub fn push(&mut self, tick: u64, value: T) {
        if self.values.is_empty() {
            self.first_tick = tick;
        }
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
            self.first_tick += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tick of the oldest retained sample.
    pub fn first_tick(&self) -> Option<u64> {
        (!self.values.is_empty()).then_some(self.first_tick)
    }

    pub fn last(&self) -> Option<T> {
        self.values.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// `(tick, value)` pairs, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = (u64, T)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, v)| (self.first_tick + i as u64, *v))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.first_tick = 0;
    }
}

/// History of flock extension and alive count.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory {
    /// Mean distance of normal agents from their centroid.
    pub extension: BoundedSeries<f32>,
    /// Number of normal agents alive.
    pub alive: BoundedSeries<usize>,
}

impl MetricsHistory {
    pub fn new(max_history: usize) -> Self {
        Self {
            extension: BoundedSeries::new(max_history),
            alive: BoundedSeries::new(max_history),
        }
    }

    pub fn clear(&mut self) {
        self.extension.clear();
        self.alive.clear();
    }
}

/// Centroid and mean velocity of the normal flock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalVector {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Latest global vector; `None` while there are no normal agents.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct FlockSummary {
    pub global_vector: Option<GlobalVector>,
}

/// Global vector and extension of a set of agents.
///
/// Returns `(None, 0.0)` for an empty set.
pub fn summarize<'a>(
    agents: impl IntoIterator<Item = (&'a Position, &'a Velocity)>,
) -> (Option<GlobalVector>, f32) {
    let agents: Vec<_> = agents.into_iter().collect();
    if agents.is_empty() {
        return (None, 0.0);
    }

    let n = agents.len() as f32;
    let mut sum = GlobalVector::default();
    for (pos, vel) in &agents {
        sum.x += pos.x;
        sum.y += pos.y;
        sum.vx += vel.vx;
        sum.vy += vel.vy;
    }
    let center = GlobalVector {
        x: sum.x / n,
        y: sum.y / n,
        vx: sum.vx / n,
        vy: sum.vy / n,
    };

    let centroid = Position::new(center.x, center.y);
    let extension = agents.iter().map(|(pos, _)| pos.distance_to(&centroid)).sum::<f32>() / n;

    (Some(center), extension)
}

/// Sample metrics for the current tick.
pub fn metrics_system(
    tick: Res<SimTick>,
    mut history: ResMut<MetricsHistory>,
    mut summary: ResMut<FlockSummary>,
    agents: Query<(&AgentKind, &Position, &Velocity)>,
) {
    let normals = agents
        .iter()
        .filter(|(kind, _, _)| kind.tag() == KindTag::Normal)
        .map(|(_, pos, vel)| (pos, vel));
    let (global_vector, extension) = summarize(normals);
    let alive = agents.iter().filter(|(kind, _, _)| kind.tag() == KindTag::Normal).count();

    history.extension.push(tick.0, extension);
    history.alive.push(tick.0, alive);
    summary.global_vector = global_vector;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_keeps_newest_window() {
        let mut series = BoundedSeries::new(3);
        for tick in 1..=5u64 {
            series.push(tick, tick as f32 * 10.0);
        }
        assert_eq!(series.len(), 3);
        assert_eq!(series.first_tick(), Some(3));
        assert_eq!(series.to_vec(), vec![30.0, 40.0, 50.0]);
        assert_eq!(series.samples().last(), Some((5, 50.0)));

        series.clear();
        assert!(series.is_empty());
        assert_eq!(series.first_tick(), None);
    }

    #[test]
    fn test_summarize_square() {
        let positions = [
            Position::new(0.0, 0.0),
            Position::new(2.0, 0.0),
            Position::new(0.0, 2.0),
            Position::new(2.0, 2.0),
        ];
        let velocities = [
            Velocity::new(1.0, 0.0),
            Velocity::new(1.0, 0.0),
            Velocity::new(-1.0, 2.0),
            Velocity::new(-1.0, 2.0),
        ];

        let (gv, extension) = summarize(positions.iter().zip(velocities.iter()));
        let gv = gv.unwrap();

        assert_eq!((gv.x, gv.y), (1.0, 1.0));
        assert_eq!((gv.vx, gv.vy), (0.0, 1.0));
        assert!((extension - 2.0f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_summarize_empty() {
        let (gv, extension) = summarize(std::iter::empty());
        assert!(gv.is_none());
        assert_eq!(extension, 0.0);
    }

    #[test]
    fn test_metrics_system_counts_only_normals() {
        let mut world = World::new();
        world.insert_resource(SimTick(7));
        world.insert_resource(MetricsHistory::new(10));
        world.insert_resource(FlockSummary::default());
        for (id, kind, x) in [
            (1, AgentKind::Normal, 0.0),
            (2, AgentKind::Normal, 10.0),
            (3, AgentKind::Predator, 500.0),
        ] {
            world.spawn(AgentBundle::new(id, kind, Position::new(x, 0.0), Velocity::default(), 4));
        }

        let mut schedule = Schedule::default();
        schedule.add_systems(metrics_system);
        schedule.run(&mut world);

        let history = world.resource::<MetricsHistory>();
        assert_eq!(history.alive.to_vec(), vec![2]);
        assert_eq!(history.alive.first_tick(), Some(7));
        assert_eq!(history.extension.to_vec(), vec![5.0]);
        let gv = world.resource::<FlockSummary>().global_vector.unwrap();
        assert_eq!((gv.x, gv.y), (5.0, 0.0));
    }
}

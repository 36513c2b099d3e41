//! ECS Systems for the flocking simulation.
//!
//! Systems contain the simulation logic that operates on components. The
//! steering math itself lives in plain functions (`rules`, `movement`) so it
//! can be tested without a world.
//!
//! ## Tick Schedule
//!
//! Systems run chained, in this order:
//!
//! - `normal_phase_system` - Steers and moves normal agents
//! - `predator_phase_system` - Steers predators, marks prey, moves predators
//! - `predation_apply_system` - Despawns marked prey
//! - `leader_phase_system` - Steers and moves leaders
//! - `metrics_system` - Samples extension, alive count and global vector
//!
//! ## Signal Schedule
//!
//! - `broadcast_signals_system` - Runs on the signal timer, not every tick

pub mod flocking;
pub mod metrics;
pub mod movement;
pub mod predation;
pub mod rules;
pub mod serialization;
pub mod signal;

pub use flocking::{
    leader_phase_system, normal_phase_system, predator_phase_system, Flock, PhaseContext,
};
pub use metrics::*;
pub use movement::*;
pub use predation::*;
pub use rules::AgentState;
pub use serialization::*;
pub use signal::*;

//! Flock Sim - Simulation Core
//!
//! A boids flocking simulation with predators, leaders, obstacles and wind.
//! Uses `bevy_ecs` for the entity-component-system architecture; rendering,
//! plotting and UI live outside this crate and read [`Snapshot`]s.

pub mod api;
pub mod components;
pub mod config;
pub mod geometry;
pub mod population;
pub mod render_bridge;
pub mod scheduler;
pub mod systems;
pub mod world;

pub use api::FlockWorld;
pub use components::*;
pub use config::{ConfigError, FlockParams, SimConfig, Viewport};
pub use scheduler::{FrameReport, RunState};
pub use systems::*;
pub use world::Snapshot;

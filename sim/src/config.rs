//! Static configuration and runtime-adjustable parameters.
//!
//! [`SimConfig`] is fixed for the lifetime of a world (population counts,
//! physical constants, cadences). [`FlockParams`] holds the knobs a UI
//! exposes as sliders and toggles; systems read it at the start of every tick
//! so changes take effect on the next tick.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Static configuration for a flocking world.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Initial viewport width in pixels.
    pub viewport_width: f32,
    /// Initial viewport height in pixels.
    pub viewport_height: f32,
    pub num_normals: usize,
    pub num_predators: usize,
    pub num_leaders: usize,
    pub num_obstacles: usize,
    pub num_wind_zones: usize,
    /// Maximum agent speed in pixels per tick.
    pub speed_limit: f32,
    /// Width of the band along each edge where agents get turned back.
    pub margin: f32,
    /// Velocity added per tick while inside the margin band.
    pub turn_factor: f32,
    /// Distance under which normal agents push each other apart.
    pub min_separation: f32,
    /// Leaders notice predators this many visual ranges away.
    pub leader_sees_predator_mult: f32,
    /// Predators notice prey this many visual ranges away.
    pub predator_sees_prey_mult: f32,
    /// Scales alignment for predators matching prey velocity.
    pub predator_alignment_correction: f32,
    /// Followers notice leaders this many visual ranges away.
    pub follower_sees_leader_mult: f32,
    /// Numerator of the obstacle proximity scale.
    pub obstacle_push: f32,
    /// Added to the obstacle surface gap before dividing.
    pub proximity_epsilon: f32,
    /// Number of past positions kept per agent.
    pub trail_length: usize,
    /// Maximum samples retained per metrics series.
    pub max_history: usize,
    /// Spawn velocity components are drawn from `[-spawn_speed, spawn_speed)`.
    pub spawn_speed: f32,
    /// Obstacle and wind zone radii are drawn from `[0, max_hazard_radius)`.
    pub max_hazard_radius: f32,
    /// Wind drift components are drawn from `[0, max_wind_drift)`.
    pub max_wind_drift: f32,
    /// Interval between leader signal broadcasts.
    pub signal_interval_ms: u64,
    /// Interval between plot refresh notifications.
    pub plot_interval_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rng_seed: None,
            viewport_width: 1280.0,
            viewport_height: 720.0,
            num_normals: 50,
            num_predators: 1,
            num_leaders: 1,
            num_obstacles: 4,
            num_wind_zones: 4,
            speed_limit: 6.0,
            margin: 200.0,
            turn_factor: 2.0,
            min_separation: 20.0,
            leader_sees_predator_mult: 3.0,
            predator_sees_prey_mult: 1.5,
            predator_alignment_correction: 0.5,
            follower_sees_leader_mult: 3.0,
            obstacle_push: 20.0,
            proximity_epsilon: 1e-3,
            trail_length: 50,
            max_history: 10_000,
            spawn_speed: 5.0,
            max_hazard_radius: 40.0,
            max_wind_drift: 20.0,
            signal_interval_ms: 500,
            plot_interval_ms: 1000,
        }
    }
}

impl SimConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        tracing::info!(path = %path.as_ref().display(), "loaded simulation config");
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.viewport_width.is_finite() && self.viewport_width > 0.0)
            || !(self.viewport_height.is_finite() && self.viewport_height > 0.0)
        {
            return Err(ConfigError::Invalid("viewport dimensions must be positive"));
        }
        if !(self.speed_limit.is_finite() && self.speed_limit > 0.0) {
            return Err(ConfigError::Invalid("speed_limit must be positive"));
        }
        if self.trail_length == 0 {
            return Err(ConfigError::Invalid("trail_length must be non-zero"));
        }
        if self.max_history == 0 {
            return Err(ConfigError::Invalid("max_history must be non-zero"));
        }
        if self.signal_interval_ms == 0 || self.plot_interval_ms == 0 {
            return Err(ConfigError::Invalid("timer intervals must be non-zero"));
        }
        if !(self.proximity_epsilon > 0.0) {
            return Err(ConfigError::Invalid("proximity_epsilon must be positive"));
        }
        Ok(())
    }

    /// Replace every field [`validate`](Self::validate) rejects with its default.
    pub fn repaired(mut self) -> Self {
        let defaults = Self::default();
        if !(self.viewport_width.is_finite() && self.viewport_width > 0.0)
            || !(self.viewport_height.is_finite() && self.viewport_height > 0.0)
        {
            self.viewport_width = defaults.viewport_width;
            self.viewport_height = defaults.viewport_height;
        }
        if !(self.speed_limit.is_finite() && self.speed_limit > 0.0) {
            self.speed_limit = defaults.speed_limit;
        }
        if self.trail_length == 0 {
            self.trail_length = defaults.trail_length;
        }
        if self.max_history == 0 {
            self.max_history = defaults.max_history;
        }
        if self.signal_interval_ms == 0 {
            self.signal_interval_ms = defaults.signal_interval_ms;
        }
        if self.plot_interval_ms == 0 {
            self.plot_interval_ms = defaults.plot_interval_ms;
        }
        if !(self.proximity_epsilon > 0.0) {
            self.proximity_epsilon = defaults.proximity_epsilon;
        }
        self
    }
}

/// Runtime parameters exposed to the UI.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockParams {
    /// Radius within which agents perceive each other.
    pub visual_range: f32,
    /// Cohesion factor.
    pub coherence: f32,
    /// Separation factor, also scales obstacle avoidance.
    pub separation: f32,
    /// Alignment factor.
    pub alignment: f32,
    /// How hard predators pursue the prey centroid.
    pub predation: f32,
    /// How hard agents flee predators.
    pub avoid_predator: f32,
    /// Prey closer than this to a predator is eaten.
    pub eat_range: f32,
    /// How hard followers steer toward a visible leader.
    pub follow_leader: f32,
    /// How hard followers steer toward the pointer.
    pub pointer_weight: f32,
    pub use_obstacles: bool,
    pub use_leaders: bool,
    pub use_predators: bool,
    pub use_pointer_leader: bool,
    pub show_global_vector: bool,
    pub hide_trail: bool,
}

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            visual_range: 75.0,
            coherence: 0.005,
            separation: 0.05,
            alignment: 0.05,
            predation: 0.01,
            avoid_predator: 0.05,
            eat_range: 40.0,
            follow_leader: 0.5,
            pointer_weight: 0.3,
            use_obstacles: false,
            use_leaders: false,
            use_predators: false,
            use_pointer_leader: false,
            show_global_vector: false,
            hide_trail: false,
        }
    }
}

impl FlockParams {
    /// Replace non-finite or negative values with zero.
    pub fn sanitized(mut self) -> Self {
        for value in [
            &mut self.visual_range,
            &mut self.coherence,
            &mut self.separation,
            &mut self.alignment,
            &mut self.predation,
            &mut self.avoid_predator,
            &mut self.eat_range,
            &mut self.follow_leader,
            &mut self.pointer_weight,
        ] {
            if !value.is_finite() || *value < 0.0 {
                *value = 0.0;
            }
        }
        self
    }
}

/// Current render surface size.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Pointer position used by the pointer-leader rule, if known.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct Pointer(pub Option<(f32, f32)>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimConfig::from_json_str(r#"{ "num_normals": 12, "rng_seed": 9 }"#).unwrap();
        assert_eq!(config.num_normals, 12);
        assert_eq!(config.rng_seed, Some(9));
        assert_eq!(config.trail_length, 50);
        assert_eq!(config.speed_limit, 6.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = SimConfig::from_json_str(r#"{ "speed_limit": 0.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SimConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_repaired_keeps_valid_fields() {
        let config = SimConfig {
            num_normals: 9,
            speed_limit: f32::NAN,
            trail_length: 0,
            ..Default::default()
        }
        .repaired();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_normals, 9);
        assert_eq!(config.speed_limit, 6.0);
        assert_eq!(config.trail_length, 50);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = SimConfig {
            rng_seed: Some(42),
            num_predators: 3,
            ..Default::default()
        };
        let json = config.to_json_pretty().unwrap();
        assert_eq!(SimConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_params_sanitized() {
        let params = FlockParams {
            coherence: -1.0,
            visual_range: f32::NAN,
            alignment: 0.2,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(params.coherence, 0.0);
        assert_eq!(params.visual_range, 0.0);
        assert_eq!(params.alignment, 0.2);
    }
}

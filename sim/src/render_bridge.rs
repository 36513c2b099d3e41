//! Render Bridge
//!
//! Packs a [`Snapshot`] into a flat `Vec<f32>` for renderers that prefer a
//! contiguous buffer (canvas, WebGL, GPU instancing) over JSON.
//!
//! # Buffer Layout (Version 1.0)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ HEADER (1 element)                                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ [0] agent_count (as f32)                                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ AGENT DATA (agent_count × AGENT_STRIDE elements)                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ For each agent i (offset = 1 + i * AGENT_STRIDE):               │
//! │   [+0]  id          - Agent ID (u32 as f32)                     │
//! │   [+1]  x           - X position (pixels)                       │
//! │   [+2]  y           - Y position (pixels)                       │
//! │   [+3]  vx          - X velocity (pixels/tick)                  │
//! │   [+4]  vy          - Y velocity (pixels/tick)                  │
//! │   [+5]  kind_id     - Kind (see KIND_* constants)               │
//! │   [+6]  heading     - atan2(vy, vx) in radians                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Agents are written in snapshot order (ascending id), so the same snapshot
//! always produces the same buffer. Trails, hazards and signals are not
//! packed; read them from the JSON snapshot.

use crate::components::KindTag;
use crate::world::Snapshot;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Number of f32 values per agent in the flat buffer.
pub const AGENT_STRIDE: usize = 7;

/// Number of f32 values in the buffer header.
pub const HEADER_SIZE: usize = 1;

pub const KIND_NORMAL: f32 = 0.0;
pub const KIND_PREDATOR: f32 = 1.0;
pub const KIND_LEADER: f32 = 2.0;

/// Offset within agent data for: ID
pub const FIELD_ID: usize = 0;
/// Offset within agent data for: X position
pub const FIELD_X: usize = 1;
/// Offset within agent data for: Y position
pub const FIELD_Y: usize = 2;
/// Offset within agent data for: X velocity
pub const FIELD_VX: usize = 3;
/// Offset within agent data for: Y velocity
pub const FIELD_VY: usize = 4;
/// Offset within agent data for: Kind ID
pub const FIELD_KIND: usize = 5;
/// Offset within agent data for: Heading
pub const FIELD_HEADING: usize = 6;

// ============================================================================
// HELPERS
// ============================================================================

#[inline]
pub fn kind_to_id(kind: KindTag) -> f32 {
    match kind {
        KindTag::Normal => KIND_NORMAL,
        KindTag::Predator => KIND_PREDATOR,
        KindTag::Leader => KIND_LEADER,
    }
}

/// Inverse of [`kind_to_id`]. Unknown ids map to `None`.
#[inline]
pub fn id_to_kind(id: f32) -> Option<KindTag> {
    match id as i32 {
        0 => Some(KindTag::Normal),
        1 => Some(KindTag::Predator),
        2 => Some(KindTag::Leader),
        _ => None,
    }
}

/// Convert a snapshot to a flat buffer.
pub fn snapshot_to_flatbuffer(snapshot: &Snapshot) -> Vec<f32> {
    let agent_count = snapshot.agents.len();
    let buffer_size = calculate_buffer_size(agent_count);

    let mut buffer = Vec::with_capacity(buffer_size);
    buffer.push(agent_count as f32);

    for agent in &snapshot.agents {
        buffer.push(agent.id as f32);
        buffer.push(agent.x);
        buffer.push(agent.y);
        buffer.push(agent.vx);
        buffer.push(agent.vy);
        buffer.push(kind_to_id(agent.kind));
        buffer.push(agent.vy.atan2(agent.vx));
    }

    debug_assert_eq!(buffer.len(), buffer_size, "Buffer size mismatch");
    buffer
}

#[inline]
pub fn calculate_buffer_size(agent_count: usize) -> usize {
    HEADER_SIZE + agent_count * AGENT_STRIDE
}

/// Parse the agent count from a flat buffer.
///
/// Returns `None` if the buffer is empty.
#[inline]
pub fn parse_agent_count(buffer: &[f32]) -> Option<usize> {
    buffer.first().map(|count| *count as usize)
}

#[inline]
pub const fn agent_offset(agent_index: usize) -> usize {
    HEADER_SIZE + agent_index * AGENT_STRIDE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FlockWorld;
    use crate::config::SimConfig;

    fn small_config() -> SimConfig {
        SimConfig {
            rng_seed: Some(11),
            num_normals: 6,
            num_predators: 2,
            num_leaders: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_flatbuffer_empty() {
        let config = SimConfig {
            num_normals: 0,
            num_predators: 0,
            num_leaders: 0,
            ..small_config()
        };
        let mut sim = FlockWorld::with_config(config);
        let buffer = snapshot_to_flatbuffer(&sim.snapshot());

        assert_eq!(buffer.len(), HEADER_SIZE);
        assert_eq!(buffer[0], 0.0);
    }

    #[test]
    fn test_flatbuffer_layout_matches_snapshot() {
        let mut sim = FlockWorld::with_config(small_config());
        let snapshot = sim.snapshot();
        let buffer = snapshot_to_flatbuffer(&snapshot);

        assert_eq!(parse_agent_count(&buffer), Some(9));
        assert_eq!(buffer.len(), calculate_buffer_size(9));

        for (i, agent) in snapshot.agents.iter().enumerate() {
            let offset = agent_offset(i);
            assert_eq!(buffer[offset + FIELD_ID], agent.id as f32);
            assert_eq!(buffer[offset + FIELD_X], agent.x);
            assert_eq!(buffer[offset + FIELD_Y], agent.y);
            assert_eq!(buffer[offset + FIELD_VX], agent.vx);
            assert_eq!(buffer[offset + FIELD_VY], agent.vy);
            assert_eq!(id_to_kind(buffer[offset + FIELD_KIND]), Some(agent.kind));
        }
    }

    #[test]
    fn test_flatbuffer_determinism() {
        let mut a = FlockWorld::with_config(small_config());
        let mut b = FlockWorld::with_config(small_config());
        for _ in 0..5 {
            a.step();
            b.step();
        }

        assert_eq!(snapshot_to_flatbuffer(&a.snapshot()), snapshot_to_flatbuffer(&b.snapshot()));
    }

    #[test]
    fn test_parse_agent_count() {
        assert_eq!(parse_agent_count(&[]), None);
        assert_eq!(parse_agent_count(&[5.0]), Some(5));
    }

    #[test]
    fn test_field_offsets_are_valid() {
        assert_eq!(AGENT_STRIDE, FIELD_HEADING + 1);
        assert_eq!(agent_offset(0), HEADER_SIZE);
        assert_eq!(agent_offset(3), HEADER_SIZE + 3 * AGENT_STRIDE);
    }
}

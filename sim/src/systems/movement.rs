//! Integrator and soft boundary.

use crate::components::*;
use crate::config::Viewport;

/// Nudge velocity back toward the viewport when inside the edge margin.
///
/// This only steers; positions are never clamped, so agents may leave the
/// band (or the viewport) for a few ticks before turning around.
pub fn keep_within_bounds(
    pos: &Position,
    vel: &mut Velocity,
    viewport: &Viewport,
    margin: f32,
    turn: f32,
) {
    if pos.x < margin {
        vel.vx += turn;
    }
    if pos.x > viewport.width - margin {
        vel.vx -= turn;
    }
    if pos.y < margin {
        vel.vy += turn;
    }
    if pos.y > viewport.height - margin {
        vel.vy -= turn;
    }
}

/// Rescale velocity to exactly `limit` when faster, keeping its heading.
pub fn limit_speed(vel: &mut Velocity, limit: f32) {
    let speed = vel.magnitude();
    if speed > limit {
        vel.vx = vel.vx / speed * limit;
        vel.vy = vel.vy / speed * limit;
    }
}

/// Apply velocity to position and record the new position in the trail.
pub fn advance(pos: &mut Position, vel: &Velocity, trail: &mut Trail, trail_len: usize) {
    pos.x += vel.vx;
    pos.y += vel.vy;
    trail.push(pos.x, pos.y, trail_len);
}

//! Distance helpers shared by the rule set and the public API.

use crate::components::Position;
use std::cmp::Ordering;

/// Euclidean distance between two entities that may no longer exist.
///
/// Returns `None` when either side is missing, so callers skip the
/// comparison instead of feeding an undefined value into velocity math.
#[inline]
pub fn distance(a: Option<&Position>, b: Option<&Position>) -> Option<f32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.distance_to(b)),
        _ => None,
    }
}

#[inline]
pub fn position_distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x1 - x2;
    let dy = y1 - y2;
    (dx * dx + dy * dy).sqrt()
}

/// Indices of the `n` candidates closest to `origin`, nearest first.
///
/// `skip` excludes one index (the querying agent itself).
pub fn n_closest(
    origin: &Position,
    candidates: &[Position],
    n: usize,
    skip: Option<usize>,
) -> Vec<usize> {
    let mut ranked: Vec<(f32, usize)> = candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip)
        .map(|(i, p)| (origin.distance_to(p), i))
        .collect();

    ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    ranked.into_iter().take(n).map(|(_, i)| i).collect()
}

//! Leader signal broadcast.
//!
//! Leaders publish their heading to the flock on a slow timer of their own.
//! The broadcast runs in a separate schedule from the tick, so followers
//! always react to a heading that may be several ticks old.

use crate::components::*;
use bevy_ecs::prelude::*;

/// Signals posted by leaders at the last broadcast.
#[derive(Resource, Debug, Clone, Default)]
pub struct SignalBoard {
    signals: Vec<Signal>,
    broadcasts: u64,
}

impl SignalBoard {
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Number of broadcasts since the world was created.
    pub fn broadcasts(&self) -> u64 {
        self.broadcasts
    }

    pub fn publish(&mut self, signals: Vec<Signal>) {
        self.signals = signals;
        self.broadcasts += 1;
    }

    pub fn clear(&mut self) {
        self.signals.clear();
    }
}

/// Capture every leader's current state as its signal and post it.
pub fn broadcast_signals_system(
    mut board: ResMut<SignalBoard>,
    mut leaders: Query<(&AgentId, &Position, &Velocity, &mut AgentKind)>,
) {
    let mut posted: Vec<(u32, Signal)> = Vec::new();
    for (id, pos, vel, mut kind) in leaders.iter_mut() {
        if let AgentKind::Leader { signal } = &mut *kind {
            *signal = Signal::capture(pos, vel);
            posted.push((id.0, *signal));
        }
    }
    posted.sort_by_key(|(id, _)| *id);

    tracing::trace!(leaders = posted.len(), "broadcast leader signals");
    board.publish(posted.into_iter().map(|(_, s)| s).collect());
}

//! Simulation clock resources.
//!
//! [`Clock`] is written only by [`advance_clock`] and the route systems.
//! Everything else reads it.

use bevy::prelude::*;
use edl_core::MissionClock;
use web_time::{SystemTime, UNIX_EPOCH};

/// The mission clock.
#[derive(Resource, Debug, Clone)]
pub struct Clock(pub MissionClock);

/// Source of real-world UTC time.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub enum WallClock {
    /// The system clock.
    #[default]
    System,
    /// A fixed instant, in Unix seconds.
    Fixed(f64),
}

impl WallClock {
    /// Current UTC time in Unix seconds.
    pub fn now(&self) -> f64 {
        match self {
            WallClock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0.0, |elapsed| elapsed.as_secs_f64()),
            WallClock::Fixed(time) => *time,
        }
    }

    /// Whether the simulated time is within `tolerance` seconds of now.
    pub fn is_live(&self, clock: &MissionClock, tolerance: f64) -> bool {
        clock.is_live(self.now(), tolerance)
    }
}

/// Advance simulated time by the frame delta scaled by the rate.
pub(crate) fn advance_clock(time: Res<Time>, mut clock: ResMut<Clock>) {
    if clock.0.advance(time.delta_secs_f64()) {
        tracing::info!(
            "Clock reached its bound at {:.3}, pausing",
            clock.0.time()
        );
    }
}

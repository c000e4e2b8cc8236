//! Simulation clock with signed playback rate and hard time bounds.
//!
//! Times are UTC seconds since the Unix epoch. The clock never leaves its
//! bounds: advancing into either bound clamps the time and pauses playback.

/// Playback rates a route may request. Anything else falls back to
/// [`DEFAULT_RATE`].
pub const RATE_STEPS: [f64; 11] = [
    -300.0, -60.0, -10.0, -5.0, -1.0, 0.0, 1.0, 5.0, 10.0, 60.0, 300.0,
];

/// Rate used when none (or an unsupported one) is requested.
pub const DEFAULT_RATE: f64 = 1.0;

/// Returns `rate` if it is one of [`RATE_STEPS`], else [`DEFAULT_RATE`].
#[must_use]
pub fn validate_rate(rate: f64) -> f64 {
    if RATE_STEPS.contains(&rate) {
        // Normalize -0.0 so it serializes as "0".
        if rate == 0.0 { 0.0 } else { rate }
    } else {
        DEFAULT_RATE
    }
}

/// Inclusive range of valid simulated times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBounds {
    pub min: f64,
    pub max: f64,
}

impl TimeBounds {
    /// Create bounds, swapping the ends if given in the wrong order.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Whether `time` lies within the bounds.
    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        (self.min..=self.max).contains(&time)
    }

    /// Clamp `time` into the bounds.
    #[must_use]
    pub fn clamp(&self, time: f64) -> f64 {
        time.clamp(self.min, self.max)
    }
}

/// The simulation clock.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionClock {
    time: f64,
    rate: f64,
    bounds: TimeBounds,
}

impl MissionClock {
    /// Create a paused clock at `time` (clamped into `bounds`).
    #[must_use]
    pub fn new(time: f64, bounds: TimeBounds) -> Self {
        Self {
            time: bounds.clamp(time),
            rate: 0.0,
            bounds,
        }
    }

    /// Current simulated time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Signed playback rate; zero means paused.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    #[must_use]
    pub fn bounds(&self) -> TimeBounds {
        self.bounds
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.rate == 0.0
    }

    /// Jump to `time`, clamped into the bounds.
    pub fn set_time(&mut self, time: f64) {
        self.time = self.bounds.clamp(time);
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    /// Advance by `real_dt` seconds of wall time scaled by the rate.
    ///
    /// Returns `true` if the clock ran into a bound and was force-paused.
    pub fn advance(&mut self, real_dt: f64) -> bool {
        if self.rate == 0.0 || real_dt <= 0.0 {
            return false;
        }

        let next = self.time + real_dt * self.rate;
        if self.rate > 0.0 && next >= self.bounds.max {
            self.time = self.bounds.max;
            self.rate = 0.0;
            return true;
        }
        if self.rate < 0.0 && next <= self.bounds.min {
            self.time = self.bounds.min;
            self.rate = 0.0;
            return true;
        }

        self.time = next;
        false
    }

    /// Whether simulated time matches `now` within `tolerance` seconds.
    #[must_use]
    pub fn is_live(&self, now: f64, tolerance: f64) -> bool {
        (self.time - now).abs() <= tolerance
    }
}

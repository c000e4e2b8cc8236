//! Mission constants.
//!
//! The defaults describe the Mars 2020 entry, descent and landing. The source
//! constants are ephemeris-time seconds past J2000; they are converted to Unix
//! UTC seconds here.

use crate::clock::TimeBounds;

/// Offset from ephemeris time to Unix UTC time in early 2021
/// (946728000 s at J2000 noon, minus TT-UTC of 69.184 s).
pub const ET_TO_UNIX_2021: f64 = 946_727_930.816;

/// Ephemeris time of atmospheric entry.
const EDL_START_ET: f64 = 666_952_142.0;
/// Earliest time the trajectory keyframes cover, relative to entry.
const KEYFRAMES_BEFORE_ENTRY: f64 = 5880.0;
/// Cruise stage separation, shortly before entry.
const DEFAULT_START_ET: f64 = 666_952_075.0;
/// Touchdown.
const LANDING_ET: f64 = 666_953_087.0;
/// End of the story, a few seconds after the descent stage lands.
const END_AFTER_ENTRY: f64 = 969.0 + 3.0;

/// Convert ephemeris-time seconds to Unix UTC seconds.
#[must_use]
pub fn et_to_unix(et: f64) -> f64 {
    et + ET_TO_UNIX_2021
}

/// Mission constants shared by the clock, the narration and the route.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionConfig {
    /// Instant timeline offsets are measured from.
    pub epoch: f64,
    /// Valid simulated time range.
    pub bounds: TimeBounds,
    /// Time used when a route names neither a time nor a phase and "now" is
    /// out of bounds.
    pub default_start: f64,
    /// Touchdown time, for the touchdown countdown.
    pub landing: f64,
    /// Scene id of the spacecraft.
    pub spacecraft_id: String,
    /// Scene id of the landing target.
    pub target_id: String,
    /// Scene id of the planet.
    pub body_id: String,
    /// Maximum difference from wall time for the clock to count as live.
    pub live_tolerance: f64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        let epoch = et_to_unix(EDL_START_ET);
        Self {
            epoch,
            bounds: TimeBounds::new(epoch - KEYFRAMES_BEFORE_ENTRY, epoch + END_AFTER_ENTRY),
            default_start: et_to_unix(DEFAULT_START_ET),
            landing: et_to_unix(LANDING_ET),
            spacecraft_id: "sc_perseverance".to_string(),
            target_id: "sc_perseverance_landing_site".to_string(),
            body_id: "mars".to_string(),
            live_tolerance: 1.0,
        }
    }
}

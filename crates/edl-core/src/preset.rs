//! Guided camera presets and the rules for picking which one applies.
//!
//! A preset is a camera shot on a subject entity, optionally gated by an
//! offset (in simulated seconds) from the start of its phase.

use std::fmt;

use serde::Deserialize;

/// Shortest flight duration after rate scaling, so fast playback never
/// degenerates into a snap cut.
pub const MIN_FLIGHT_DURATION: f64 = 0.1;

/// One guided-camera instruction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPreset {
    /// Scene id of the entity the camera frames.
    pub subject: String,
    /// Which kind of shot to take.
    pub shot: Shot,
    /// Shared framing parameters.
    #[serde(default)]
    pub framing: Framing,
    /// Offset from the phase start after which this preset applies.
    #[serde(default)]
    pub timestamp_seconds: Option<f64>,
}

impl CameraPreset {
    /// Threshold in seconds since phase start; absent means zero.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.timestamp_seconds.unwrap_or(0.0)
    }

    /// Copy of this preset with its duration scaled for playback at `rate`.
    #[must_use]
    pub fn scaled_for_rate(&self, rate: f64) -> Self {
        let mut preset = self.clone();
        preset.framing.duration = scale_duration(self.framing.duration, rate);
        preset
    }
}

/// Camera shot kinds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Shot {
    /// Look at the subject from the side opposite `target`.
    AlignWithTarget { target: String },
    /// Look along the subject's forward axis from behind.
    ViewFromBehind {
        #[serde(default)]
        up: UpMode,
    },
    /// Look at the subject's flank.
    ViewFromSide {
        #[serde(default)]
        forward: Axis,
    },
}

impl Shot {
    /// Scene id of any extra entity this shot needs besides subject and plane.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Shot::AlignWithTarget { target } => Some(target),
            Shot::ViewFromBehind { .. } | Shot::ViewFromSide { .. } => None,
        }
    }
}

/// How the up vector is chosen for [`Shot::ViewFromBehind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpMode {
    /// The planet's rotation axis.
    #[default]
    PlanetUp,
    /// The local vertical at the subject.
    SurfaceUp,
}

/// A local axis of an entity's orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    #[default]
    XAxis,
    YAxis,
    ZAxis,
}

/// Framing parameters shared by every shot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Framing {
    /// Scene id of the planet used for up vectors.
    pub plane: String,
    /// Camera distance from the subject; ten occlusion radii when absent.
    pub distance: Option<f64>,
    /// Whether the host should fly a cinematic path.
    pub cinematic: bool,
    /// Flight duration in seconds at rate 1.
    pub duration: f64,
    /// Degrees to pitch the view about the horizontal axis.
    pub vertical_offset: f64,
    /// Degrees to yaw the view about the up axis.
    pub horizontal_offset: f64,
}

impl Default for Framing {
    fn default() -> Self {
        Self {
            plane: "mars".to_string(),
            distance: None,
            cinematic: false,
            duration: 0.75,
            vertical_offset: 0.0,
            horizontal_offset: 0.0,
        }
    }
}

/// Scale a flight duration by `1 / |rate|`, never below
/// [`MIN_FLIGHT_DURATION`].
#[must_use]
pub fn scale_duration(duration: f64, rate: f64) -> f64 {
    let speed = rate.abs();
    if speed == 0.0 || !speed.is_finite() {
        return duration.max(MIN_FLIGHT_DURATION);
    }
    (duration / speed).max(MIN_FLIGHT_DURATION)
}

/// Identifies a fired preset so it fires at most once per phase visit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncKey(String);

impl SyncKey {
    #[must_use]
    pub fn new(phase_id: &str, preset_index: usize) -> Self {
        Self(format!("{phase_id}:{preset_index}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pick the preset that applies `elapsed` seconds into a phase.
///
/// Playing forward, this is the last preset whose threshold has been passed.
/// Playing backward, it is the first preset whose threshold has not been
/// passed yet. Returns `None` when paused or when nothing qualifies.
#[must_use]
pub fn select_preset(presets: &[CameraPreset], elapsed: f64, rate: f64) -> Option<usize> {
    if rate > 0.0 {
        presets
            .iter()
            .rposition(|preset| elapsed >= preset.threshold())
    } else if rate < 0.0 {
        presets
            .iter()
            .position(|preset| elapsed < preset.threshold())
    } else {
        None
    }
}

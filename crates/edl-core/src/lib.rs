//! Time-driven phase synchronization for an entry, descent and landing story.
//!
//! This crate holds the engine-independent parts of the story: the mission
//! clock, the phase timeline and resolver, guided camera presets and their
//! framing math, route query encoding, readout formatting and spheroid
//! coordinate conversion. The Bevy integration lives in `edl-viewer`.
//!
//! # Design principles
//!
//! - **Pure**: no engine types; everything here is plain data and functions
//! - **Total**: resolution and selection never panic on odd input
//! - **Explicit time**: all times are Unix UTC seconds as `f64`
//!
//! # Example
//!
//! ```ignore
//! use edl_core::{MissionConfig, Timeline, resolve_phase_index};
//!
//! let config = MissionConfig::default();
//! let timeline = Timeline::from_json(include_str!("story.json"), config.epoch)?;
//!
//! let index = resolve_phase_index(config.epoch, 1.0, 0, timeline.starts(), config.bounds);
//! println!("{}", timeline.display_phase(index).title);
//! ```

pub mod clock;
pub mod config;
mod error;
pub mod framing;
pub mod preset;
pub mod readout;
pub mod resolver;
pub mod route;
pub mod spheroid;
pub mod timeline;

pub use clock::{DEFAULT_RATE, MissionClock, RATE_STEPS, TimeBounds, validate_rate};
pub use config::{MissionConfig, et_to_unix};
pub use error::{Error, Result};
pub use framing::{CameraDestination, ShotContext, frame_shot};
pub use preset::{
    Axis, CameraPreset, Framing, MIN_FLIGHT_DURATION, Shot, SyncKey, UpMode, scale_duration,
    select_preset,
};
pub use readout::{UnitSystem, format_countdown, format_distance, format_speed};
pub use resolver::resolve_phase_index;
pub use route::{
    MemoryNavigator, NavigationError, Navigator, PushOutcome, RouteBinding, RouteQuery,
    RouteTarget, resolve_route,
};
pub use spheroid::{LatLonAlt, Spheroid};
pub use timeline::{Phase, Timeline};

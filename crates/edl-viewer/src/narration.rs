//! Story panel state: the displayed phase and its telemetry readouts.
//!
//! The displayed phase follows the resolver. Each change is pushed to the
//! route, live (with the current time) or explicit (phase only), and reported
//! to the host with [`PhaseChanged`]. Readouts are refreshed on a fixed
//! cadence from the scene.

use bevy::ecs::message::{Message, MessageReader, MessageWriter};
use bevy::prelude::*;
use edl_core::{
    RouteQuery, UnitSystem, format_countdown, format_distance, format_speed,
    resolve_phase_index,
};
use glam::DVec3;

use crate::{
    Mission, Story,
    clock::{Clock, WallClock},
    collision::BodySpheroid,
    route::{ExplicitNavigation, Route},
    scene::{FrameQuery, LocalOrientation, SceneId, find_entity, world_position},
};

/// Seconds between readout refreshes.
pub const READOUT_PERIOD: f32 = 0.2;

/// Phase index produced by the resolver this frame.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPhase(pub usize);

/// Panel state.
#[derive(Resource, Debug, Default)]
pub struct Narration {
    /// Displayed phase index; the phase count means "past the last phase".
    pub index: Option<usize>,
    pub units: UnitSystem,
    /// Latest formatted readouts, if any pass has succeeded.
    pub readout: Option<Readout>,
    last_sample: Option<(DVec3, f64)>,
    speed: f64,
}

/// Formatted telemetry for the story panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readout {
    pub distance: String,
    pub altitude: String,
    pub speed: String,
    pub touchdown: String,
    /// Countdown to the next phase; absent on the last phase.
    pub next_phase: Option<String>,
    pub live: bool,
}

/// Repeating timer driving readout refreshes.
#[derive(Resource, Debug)]
pub struct ReadoutTimer(pub Timer);

impl Default for ReadoutTimer {
    fn default() -> Self {
        Self(Timer::from_seconds(READOUT_PERIOD, TimerMode::Repeating))
    }
}

/// Slide position of the story carousel.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoryCarousel {
    pub slide: usize,
}

/// The displayed phase changed.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct PhaseChanged {
    pub index: usize,
    pub id: String,
    /// Phase title, also used as the back button label.
    pub title: String,
    /// True when the change came from navigating to a phase.
    pub explicit: bool,
}

/// The host switched unit systems.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitsChanged {
    pub units: UnitSystem,
}

/// Carousel navigation requested by the host.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub enum StoryNavigation {
    Previous,
    Next,
    Phase(String),
}

/// Jump to the phase a carousel request names.
///
/// The clock moves to the phase start at the current rate. The explicit
/// route is pushed by [`sync_phase`] once the displayed phase follows.
pub(crate) fn navigate_story(
    mut requests: MessageReader<StoryNavigation>,
    mut explicit: MessageWriter<ExplicitNavigation>,
    mut carousel: ResMut<StoryCarousel>,
    mut clock: ResMut<Clock>,
    story: Res<Story>,
) {
    let last = story.0.len() - 1;
    for request in requests.read() {
        let slide = match request {
            StoryNavigation::Previous => carousel.slide.saturating_sub(1),
            StoryNavigation::Next => (carousel.slide + 1).min(last),
            StoryNavigation::Phase(id) => {
                let Some(index) = story.0.index_of(id) else {
                    tracing::warn!("Unknown phase '{id}'");
                    continue;
                };
                index
            }
        };
        carousel.slide = slide;
        clock.0.set_time(story.0.display_phase(slide).start);
        tracing::debug!("Carousel moved to slide {slide}");
        explicit.write(ExplicitNavigation { index: slide });
    }
}

/// Resolve the active phase from the clock.
pub(crate) fn resolve_phase(
    clock: Res<Clock>,
    story: Res<Story>,
    narration: Res<Narration>,
    mut resolved: ResMut<ResolvedPhase>,
) {
    resolved.0 = resolve_phase_index(
        clock.0.time(),
        clock.0.rate(),
        narration.index.unwrap_or(0),
        story.0.starts(),
        clock.0.bounds(),
    );
}

pub(crate) fn apply_unit_changes(
    mut changes: MessageReader<UnitsChanged>,
    mut narration: ResMut<Narration>,
) {
    if let Some(change) = changes.read().last() {
        narration.units = change.units;
    }
}

/// Switch the displayed phase when the resolver moves.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sync_phase(
    resolved: Res<ResolvedPhase>,
    mut explicit: MessageReader<ExplicitNavigation>,
    mut narration: ResMut<Narration>,
    mut carousel: ResMut<StoryCarousel>,
    mut route: ResMut<Route>,
    mut changed: MessageWriter<PhaseChanged>,
    clock: Res<Clock>,
    story: Res<Story>,
) {
    let explicit = explicit.read().count() > 0;
    let index = resolved.0;
    let phase = story.0.display_phase(index);

    // Moving between the sentinel and the last index keeps the same phase
    // on screen.
    let previous = narration.index.replace(index);
    let same_phase =
        previous.is_some_and(|previous| story.0.display_phase(previous).id == phase.id);
    if same_phase && !explicit {
        return;
    }

    carousel.slide = index.min(story.0.len() - 1);
    let time = (!explicit).then(|| clock.0.time());
    route.push(&RouteQuery::from_state(&phase.id, time, clock.0.rate()));
    if same_phase {
        return;
    }

    tracing::info!(
        "Phase {} '{}' ({})",
        index,
        phase.title,
        if explicit { "explicit" } else { "live" }
    );
    changed.write(PhaseChanged {
        index,
        id: phase.id.clone(),
        title: phase.title.clone(),
        explicit,
    });
}

/// Refresh readouts on the timer cadence.
#[allow(clippy::too_many_arguments)]
pub(crate) fn update_readout(
    time: Res<Time>,
    mut timer: ResMut<ReadoutTimer>,
    mut narration: ResMut<Narration>,
    clock: Res<Clock>,
    story: Res<Story>,
    mission: Res<Mission>,
    wall_clock: Res<WallClock>,
    ids: Query<(Entity, &SceneId)>,
    frames: FrameQuery,
    bodies: Query<(&BodySpheroid, Option<&LocalOrientation>)>,
) {
    if !timer.0.tick(time.delta()).just_finished() {
        return;
    }

    let config = &mission.0;
    let resolve = |id: &str| {
        let entity = find_entity(&ids, id)?;
        world_position(entity, &frames).map(|position| (entity, position))
    };
    let (Some((_, spacecraft)), Some((_, target)), Some((body, body_position))) = (
        resolve(&config.spacecraft_id),
        resolve(&config.target_id),
        resolve(&config.body_id),
    ) else {
        tracing::debug!("Scene entities not in place, skipping readout");
        return;
    };
    let Ok((spheroid, orientation)) = bodies.get(body) else {
        tracing::debug!("Body '{}' has no spheroid, skipping readout", config.body_id);
        return;
    };

    let relative = spacecraft - body_position;
    let body_fixed = orientation.map_or(relative, |o| o.0.inverse() * relative);
    let altitude = spheroid.0.lla_from_xyz(body_fixed).alt;

    let now = clock.0.time();
    if let Some((previous, sampled_at)) = narration.last_sample {
        let dt = (now - sampled_at).abs();
        if dt > f64::EPSILON {
            narration.speed = (relative - previous).length() / dt;
        }
    }
    narration.last_sample = Some((relative, now));

    let units = narration.units;
    let starts = story.0.starts();
    let next_phase = narration
        .index
        .and_then(|index| starts.get(index + 1))
        .map(|start| format_countdown(start - now));

    narration.readout = Some(Readout {
        distance: format_distance((spacecraft - target).length(), units),
        altitude: format_distance(altitude, units),
        speed: format_speed(narration.speed, units),
        touchdown: format_countdown(config.landing - now),
        next_phase,
        live: wall_clock.is_live(&clock.0, config.live_tolerance),
    });
}

//! Bevy integration for the entry, descent and landing story.
//!
//! [`EdlPlugin`] wires the clock, route binding, narration, guided camera and
//! terrain clamp into the app schedule. Per frame the systems run in
//! [`EdlSet`] order; the terrain clamp runs in `PostUpdate`.

pub mod camera_rig;
pub mod clock;
pub mod collision;
pub mod guided_camera;
pub mod narration;
pub mod route;
pub mod scene;

use bevy::prelude::*;
use edl_core::{MemoryNavigator, MissionClock, MissionConfig, Timeline};

use camera_rig::CameraRigPlugin;
use clock::{Clock, WallClock};
use collision::CollisionPlugin;
use guided_camera::{CameraFlight, GuidedCamera, GuidedModeToggled, ManualCameraInput};
use narration::{
    Narration, PhaseChanged, ReadoutTimer, ResolvedPhase, StoryCarousel, StoryNavigation,
    UnitsChanged,
};
use route::{ExplicitNavigation, Route, RouteChanged};
use scene::ScenePlugin;

/// The bundled Mars 2020 story.
pub const DEFAULT_STORY: &str = include_str!("../assets/story.json");

/// Mission constants.
#[derive(Resource, Debug, Clone)]
pub struct Mission(pub MissionConfig);

/// The loaded story timeline.
#[derive(Resource, Debug, Clone)]
pub struct Story(pub Timeline);

/// Per-frame ordering of the story systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdlSet {
    /// Advance simulated time.
    Clock,
    /// Apply carousel requests and incoming routes.
    Route,
    /// Resolve the active phase.
    Resolve,
    /// Update the story panel and push routes.
    Narrate,
    /// Fire guided camera presets.
    Camera,
}

/// Plugin for the story engine.
///
/// Routes are pushed to a [`MemoryNavigator`] until the host replaces the
/// [`Route`] resource with its own navigator.
pub struct EdlPlugin {
    pub timeline: Timeline,
    pub config: MissionConfig,
}

impl EdlPlugin {
    pub fn new(timeline: Timeline, config: MissionConfig) -> Self {
        Self { timeline, config }
    }
}

impl Plugin for EdlPlugin {
    fn build(&self, app: &mut App) {
        let clock = MissionClock::new(self.config.default_start, self.config.bounds);

        app.insert_resource(Mission(self.config.clone()))
            .insert_resource(Story(self.timeline.clone()))
            .insert_resource(Clock(clock))
            .insert_resource(Route::new(MemoryNavigator::new()))
            .init_resource::<WallClock>()
            .init_resource::<ResolvedPhase>()
            .init_resource::<Narration>()
            .init_resource::<ReadoutTimer>()
            .init_resource::<StoryCarousel>()
            .init_resource::<GuidedCamera>()
            .add_message::<RouteChanged>()
            .add_message::<ExplicitNavigation>()
            .add_message::<StoryNavigation>()
            .add_message::<PhaseChanged>()
            .add_message::<UnitsChanged>()
            .add_message::<GuidedModeToggled>()
            .add_message::<ManualCameraInput>()
            .add_message::<CameraFlight>()
            .configure_sets(
                Update,
                (
                    EdlSet::Clock,
                    EdlSet::Route,
                    EdlSet::Resolve,
                    EdlSet::Narrate,
                    EdlSet::Camera,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    clock::advance_clock.in_set(EdlSet::Clock),
                    (narration::navigate_story, route::apply_route_changes)
                        .chain()
                        .in_set(EdlSet::Route),
                    narration::resolve_phase.in_set(EdlSet::Resolve),
                    (
                        narration::apply_unit_changes,
                        narration::sync_phase,
                        narration::update_readout,
                    )
                        .chain()
                        .in_set(EdlSet::Narrate),
                    (guided_camera::sequence_presets, guided_camera::issue_flights)
                        .chain()
                        .in_set(EdlSet::Camera),
                ),
            )
            .add_plugins((CameraRigPlugin, CollisionPlugin, ScenePlugin));

        tracing::info!(
            "Story engine ready: {} phases, clock paused at {:.3}",
            self.timeline.len(),
            self.config.default_start
        );
    }
}

//! Story engine behavior in a running app: routes, narration and the guided
//! camera.

use std::time::Duration;

use bevy::ecs::message::MessageReader;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use edl_core::{
    MemoryNavigator, MissionConfig, Spheroid, SyncKey, TimeBounds, Timeline, UnitSystem,
};
use edl_viewer::{
    EdlPlugin, EdlSet,
    camera_rig::CameraRig,
    clock::{Clock, WallClock},
    collision::BodySpheroid,
    guided_camera::{CameraFlight, GuidedCamera, GuidedModeToggled, ManualCameraInput},
    narration::{Narration, PhaseChanged, StoryCarousel, StoryNavigation, UnitsChanged},
    route::{Route, RouteChanged},
    scene::{LocalOrientation, LocalPosition, OcclusionRadius, SceneId},
};
use glam::{DQuat, DVec3};

const STORY: &str = r#"[
    {
        "id": "descent",
        "title": "Descent",
        "timestamp": 0,
        "cameraPresets": [
            {
                "subject": "sc",
                "shot": { "kind": "viewFromBehind", "up": "surfaceUp" },
                "framing": { "distance": 1.0 }
            },
            {
                "subject": "sc",
                "shot": { "kind": "viewFromBehind", "up": "surfaceUp" },
                "framing": { "distance": 2.0 },
                "timestampSeconds": 10
            }
        ]
    },
    {
        "id": "landing",
        "title": "Landing",
        "timestamp": 100,
        "cameraPresets": [
            {
                "subject": "sc",
                "shot": { "kind": "viewFromBehind", "up": "surfaceUp" },
                "framing": { "distance": 3.0 }
            }
        ],
        "reverseCameraPresets": [
            {
                "subject": "sc",
                "shot": { "kind": "viewFromBehind", "up": "surfaceUp" },
                "framing": { "distance": 4.0 },
                "timestampSeconds": 50
            }
        ]
    }
]"#;

/// Messages seen by the end of each frame.
#[derive(Resource, Default)]
struct Collected {
    flights: Vec<CameraFlight>,
    phases: Vec<PhaseChanged>,
}

fn collect(
    mut flights: MessageReader<CameraFlight>,
    mut phases: MessageReader<PhaseChanged>,
    mut collected: ResMut<Collected>,
) {
    collected.flights.extend(flights.read().cloned());
    collected.phases.extend(phases.read().cloned());
}

fn config() -> MissionConfig {
    MissionConfig {
        epoch: 1_000.0,
        bounds: TimeBounds::new(0.0, 2_000.0),
        default_start: 500.0,
        landing: 1_500.0,
        spacecraft_id: "sc".to_string(),
        target_id: "site".to_string(),
        body_id: "mars".to_string(),
        live_tolerance: 1.0,
    }
}

/// An app with the story plugin, a recording navigator and a small scene:
/// the spacecraft hovers 10 km above the landing site at the north pole,
/// facing +X.
fn setup() -> (App, MemoryNavigator) {
    setup_scene(true)
}

fn setup_scene(with_spacecraft: bool) -> (App, MemoryNavigator) {
    let config = config();
    let timeline = Timeline::from_json(STORY, config.epoch).unwrap();
    let navigator = MemoryNavigator::new();

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(250)))
        .add_plugins(EdlPlugin::new(timeline, config))
        .insert_resource(Route::new(navigator.clone()))
        .insert_resource(WallClock::Fixed(1_012.0))
        .init_resource::<Collected>()
        .add_systems(Update, collect.after(EdlSet::Camera));

    let world = app.world_mut();
    world.spawn((
        SceneId::new("mars"),
        LocalPosition(DVec3::ZERO),
        LocalOrientation::default(),
        BodySpheroid(Spheroid::sphere(3_390.0)),
    ));
    if with_spacecraft {
        world.spawn((
            SceneId::new("sc"),
            LocalPosition(DVec3::new(0.0, 0.0, 3_400.0)),
            LocalOrientation(DQuat::from_rotation_y(std::f64::consts::FRAC_PI_2)),
            OcclusionRadius(0.5),
        ));
    }
    world.spawn((
        SceneId::new("site"),
        LocalPosition(DVec3::new(0.0, 0.0, 3_390.0)),
    ));

    (app, navigator)
}

fn set_clock(app: &mut App, time: f64, rate: f64) {
    let mut clock = app.world_mut().resource_mut::<Clock>();
    clock.0.set_time(time);
    clock.0.set_rate(rate);
}

fn clock(app: &App) -> (f64, f64) {
    let clock = &app.world().resource::<Clock>().0;
    (clock.time(), clock.rate())
}

fn run(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
    }
}

fn flight_distances(app: &App) -> Vec<f64> {
    app.world()
        .resource::<Collected>()
        .flights
        .iter()
        .map(|flight| flight.destination.length())
        .collect()
}

fn last_key(app: &App) -> Option<String> {
    app.world()
        .resource::<GuidedCamera>()
        .last_key()
        .map(|key| key.as_str().to_string())
}

fn rig(app: &mut App) -> (bool, Option<f64>) {
    let mut rigs = app.world_mut().query::<&CameraRig>();
    let rig = rigs.single(app.world()).unwrap();
    (rig.is_flying(), rig.progress())
}

#[test]
fn test_guided_preset_fires_once_with_scaled_duration() {
    let (mut app, _) = setup();
    set_clock(&mut app, 1_012.0, 2.0);
    run(&mut app, 4);

    let collected = app.world().resource::<Collected>();
    assert_eq!(collected.flights.len(), 1);
    let flight = &collected.flights[0];
    assert_eq!(flight.subject, "sc");
    assert!((flight.duration - 0.375).abs() < 1e-12);
    assert!((flight.destination.length() - 2.0).abs() < 1e-9);

    let guided = app.world().resource::<GuidedCamera>();
    assert_eq!(guided.last_key().map(SyncKey::as_str), Some("descent:1"));
}

#[test]
fn test_last_phase_presets_fire_past_its_start() {
    let (mut app, _) = setup();
    set_clock(&mut app, 1_150.0, 1.0);
    run(&mut app, 4);
    let distances = flight_distances(&app);
    assert_eq!(distances.len(), 1);
    assert!((distances[0] - 3.0).abs() < 1e-9);
    assert_eq!(last_key(&app).as_deref(), Some("landing:0"));
}

#[test]
fn test_playing_into_last_phase_fires_its_preset() {
    let (mut app, _) = setup();
    set_clock(&mut app, 1_099.0, 1.0);
    run(&mut app, 12);

    let distances = flight_distances(&app);
    assert_eq!(distances.len(), 2);
    assert!((distances[0] - 2.0).abs() < 1e-9);
    assert!((distances[1] - 3.0).abs() < 1e-9);
}

#[test]
fn test_reverse_playback_uses_reverse_presets() {
    let (mut app, _) = setup();
    set_clock(&mut app, 1_120.0, -1.0);
    run(&mut app, 2);

    let distances = flight_distances(&app);
    assert_eq!(distances.len(), 1);
    assert!((distances[0] - 4.0).abs() < 1e-9);
    assert_eq!(last_key(&app).as_deref(), Some("landing:0"));
}

#[test]
fn test_flight_dropped_when_subject_never_appears() {
    let (mut app, _) = setup_scene(false);
    set_clock(&mut app, 1_012.0, 1.0);
    run(&mut app, 2);
    assert!(app.world().resource::<GuidedCamera>().is_waiting());

    // 3 s of frame time at 250 ms per frame, after a zero-length first frame.
    run(&mut app, 12);
    assert!(!app.world().resource::<GuidedCamera>().is_waiting());
    assert!(app.world().resource::<Collected>().flights.is_empty());
    assert_eq!(last_key(&app).as_deref(), Some("descent:1"));

    // The key stays recorded, so the preset does not retry.
    run(&mut app, 4);
    assert!(!app.world().resource::<GuidedCamera>().is_waiting());
}

#[test]
fn test_manual_input_drops_waiting_flight() {
    let (mut app, _) = setup_scene(false);
    set_clock(&mut app, 1_012.0, 1.0);
    run(&mut app, 2);
    assert!(app.world().resource::<GuidedCamera>().is_waiting());

    app.world_mut().write_message(ManualCameraInput);
    app.update();
    assert!(!app.world().resource::<GuidedCamera>().is_waiting());
    assert_eq!(last_key(&app).as_deref(), Some("descent:1"));
}

#[test]
fn test_manual_input_cancels_flight_in_progress() {
    let (mut app, _) = setup();
    app.world_mut().spawn((
        CameraRig::new(DVec3::Z),
        LocalPosition(DVec3::new(0.0, 0.0, 3_405.0)),
        LocalOrientation::default(),
    ));
    set_clock(&mut app, 1_012.0, 1.0);
    run(&mut app, 2);

    let (flying, progress) = rig(&mut app);
    assert!(flying);
    assert!(progress.unwrap() > 0.0);

    app.world_mut().write_message(ManualCameraInput);
    app.update();
    assert_eq!(rig(&mut app), (false, None));
    assert_eq!(app.world().resource::<Collected>().flights.len(), 1);
}

#[test]
fn test_nothing_fires_when_guided_mode_is_off() {
    let (mut app, _) = setup();
    app.world_mut()
        .write_message(GuidedModeToggled { enabled: false });
    set_clock(&mut app, 1_012.0, 1.0);
    run(&mut app, 4);
    assert!(app.world().resource::<Collected>().flights.is_empty());
}

#[test]
fn test_phase_change_resets_fired_key() {
    let (mut app, _) = setup();
    set_clock(&mut app, 1_012.0, 1.0);
    run(&mut app, 2);
    assert_eq!(app.world().resource::<Collected>().flights.len(), 1);

    // Reverse into the next phase.
    set_clock(&mut app, 1_105.0, -1.0);
    run(&mut app, 2);
    assert_eq!(app.world().resource::<Collected>().flights.len(), 2);

    // Back in the first phase the same preset fires again.
    set_clock(&mut app, 1_012.0, 1.0);
    run(&mut app, 2);
    let distances = flight_distances(&app);
    assert_eq!(distances.len(), 3);
    assert!((distances[2] - 2.0).abs() < 1e-9);
}

#[test]
fn test_first_frame_pushes_live_route() {
    let (mut app, navigator) = setup();
    app.update();

    let history = navigator.history();
    assert_eq!(history.len(), 1);
    assert!(history[0].starts_with("id=descent&time="));
    assert!(history[0].ends_with("&rate=0"));

    let phases = &app.world().resource::<Collected>().phases;
    assert_eq!(phases.len(), 1);
    assert!(!phases[0].explicit);
}

#[test]
fn test_echoed_route_is_ignored() {
    let (mut app, navigator) = setup();
    app.update();
    let before = clock(&app);

    let pushed = navigator.history()[0].clone();
    app.world_mut().write_message(RouteChanged::new(pushed));
    run(&mut app, 2);

    assert_eq!(clock(&app), before);
    assert_eq!(navigator.history().len(), 1);
}

#[test]
fn test_incoming_route_sets_clock() {
    let (mut app, _) = setup();
    app.update();
    app.world_mut()
        .write_message(RouteChanged::new("?time=1050&rate=5"));
    app.update();
    assert_eq!(clock(&app), (1_050.0, 5.0));
}

#[test]
fn test_unsupported_rate_falls_back_to_one() {
    let (mut app, _) = setup();
    app.world_mut()
        .write_message(RouteChanged::new("time=1050&rate=2"));
    app.update();
    assert_eq!(clock(&app), (1_050.0, 1.0));
}

#[test]
fn test_carousel_navigation_is_explicit() {
    let (mut app, navigator) = setup();
    app.update();
    app.world_mut().write_message(StoryNavigation::Next);
    app.update();

    assert_eq!(clock(&app), (1_100.0, 0.0));
    assert_eq!(app.world().resource::<StoryCarousel>().slide, 1);

    let phases = &app.world().resource::<Collected>().phases;
    let last = phases.last().unwrap();
    assert_eq!(last.id, "landing");
    assert_eq!(last.title, "Landing");
    assert!(last.explicit);

    let history = navigator.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.last().map(String::as_str), Some("id=landing&rate=0"));

    app.world_mut().write_message(StoryNavigation::Previous);
    app.update();
    assert_eq!(clock(&app), (1_000.0, 0.0));
    assert_eq!(
        navigator.history().last().map(String::as_str),
        Some("id=descent&rate=0")
    );
}

#[test]
fn test_navigating_to_displayed_phase_clears_route_time() {
    let (mut app, navigator) = setup();
    app.update();
    app.world_mut()
        .write_message(StoryNavigation::Phase("descent".to_string()));
    app.update();

    assert_eq!(clock(&app), (1_000.0, 0.0));
    let history = navigator.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1], "id=descent&rate=0");
    // Still the same phase on screen.
    assert_eq!(app.world().resource::<Collected>().phases.len(), 1);
}

#[test]
fn test_pausing_at_end_keeps_last_phase() {
    let (mut app, navigator) = setup();
    set_clock(&mut app, 1_999.0, 1.0);
    run(&mut app, 8);

    assert_eq!(clock(&app), (2_000.0, 0.0));
    assert_eq!(app.world().resource::<Narration>().index, Some(1));
    let phases = &app.world().resource::<Collected>().phases;
    assert_eq!(phases.len(), 1);
    assert_eq!(phases[0].id, "landing");
    assert_eq!(navigator.history().len(), 1);
}

#[test]
fn test_readout_follows_unit_system() {
    let (mut app, _) = setup();
    set_clock(&mut app, 1_012.0, 0.0);
    run(&mut app, 3);

    let readout = app
        .world()
        .resource::<Narration>()
        .readout
        .clone()
        .unwrap();
    assert_eq!(readout.distance, "6.2 mi");
    assert_eq!(readout.altitude, "6.2 mi");
    assert_eq!(readout.speed, "0 mph");
    assert_eq!(readout.touchdown, "00:08:08");
    assert_eq!(readout.next_phase.as_deref(), Some("00:01:28"));
    assert!(readout.live);

    app.world_mut().write_message(UnitsChanged {
        units: UnitSystem::Metric,
    });
    run(&mut app, 2);
    let readout = app
        .world()
        .resource::<Narration>()
        .readout
        .clone()
        .unwrap();
    assert_eq!(readout.distance, "10.0 km");
    assert_eq!(readout.speed, "0 km/h");
}

//! Stand-in scene for running the story without a renderer.
//!
//! Mars with flat terrain at the landing site elevation, the landing site,
//! a spacecraft following a scripted descent, and the camera rig.

use bevy::ecs::message::MessageReader;
use bevy::prelude::*;
use edl_core::{LatLonAlt, MissionConfig, Spheroid};
use edl_viewer::{
    EdlSet, Mission,
    camera_rig::CameraRig,
    clock::Clock,
    collision::{BodySpheroid, ConstantTerrain, Terrain, TerrainClamp},
    narration::{Narration, PhaseChanged},
    scene::{FrameParent, LocalOrientation, LocalPosition, OcclusionRadius, SceneId},
};
use glam::{DQuat, DVec3};

/// Jezero Crater landing site, degrees.
const SITE_LAT_DEG: f64 = 18.4447;
const SITE_LON_DEG: f64 = 77.4508;
/// Terrain elevation at the landing site, km.
const SITE_ALTITUDE: f64 = -2.231;
/// Altitude above the site at atmospheric entry, km.
const ENTRY_ALTITUDE: f64 = 125.0;
/// Downrange angle to the site at atmospheric entry, radians.
const ENTRY_RANGE: f64 = 0.2;
/// The scripted trajectory ends this far below the terrain model, km.
const TRAJECTORY_UNDERSHOOT: f64 = 0.05;
/// Spacecraft bounding radius, km.
const SPACECRAFT_RADIUS: f64 = 0.0025;
/// Seconds of frame time between periodic readout logs.
const REPORT_INTERVAL: f32 = 5.0;

/// Plugin for the demo scene.
pub struct DemoScenePlugin;

impl Plugin for DemoScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_scene).add_systems(
            Update,
            (
                fly_spacecraft.after(EdlSet::Route).before(EdlSet::Resolve),
                report_story.after(EdlSet::Camera),
            ),
        );
    }
}

/// Marker for the entity following the scripted descent.
#[derive(Component)]
struct Descent;

fn landing_site() -> LatLonAlt {
    LatLonAlt {
        lat: SITE_LAT_DEG.to_radians(),
        lon: SITE_LON_DEG.to_radians(),
        alt: SITE_ALTITUDE,
    }
}

/// Scripted spacecraft position relative to Mars.
///
/// Altitude falls quadratically and the downrange distance linearly with
/// time remaining until touchdown.
fn descent_position(time: f64, config: &MissionConfig) -> DVec3 {
    let span = config.landing - config.epoch;
    let remaining = ((config.landing - time) / span).max(0.0);
    let site = landing_site();
    Spheroid::MARS.xyz_from_lla(LatLonAlt {
        lat: site.lat,
        lon: site.lon - ENTRY_RANGE * remaining.min(2.0),
        alt: SITE_ALTITUDE - TRAJECTORY_UNDERSHOOT
            + (ENTRY_ALTITUDE + TRAJECTORY_UNDERSHOOT) * remaining * remaining,
    })
}

fn spawn_scene(mut commands: Commands, mission: Res<Mission>, clock: Res<Clock>) {
    let config = &mission.0;

    let mars = commands
        .spawn((
            SceneId::new(config.body_id.clone()),
            LocalPosition(DVec3::ZERO),
            LocalOrientation::default(),
            OcclusionRadius(Spheroid::MARS.equatorial_radius),
            BodySpheroid(Spheroid::MARS),
            Terrain::new(ConstantTerrain {
                altitude: SITE_ALTITUDE,
            }),
        ))
        .id();

    commands.spawn((
        SceneId::new(config.target_id.clone()),
        LocalPosition(Spheroid::MARS.xyz_from_lla(landing_site())),
        FrameParent(mars),
    ));

    let start = descent_position(clock.0.time(), config);
    let spacecraft = commands
        .spawn((
            SceneId::new(config.spacecraft_id.clone()),
            Descent,
            LocalPosition(start),
            LocalOrientation::default(),
            OcclusionRadius(SPACECRAFT_RADIUS),
            FrameParent(mars),
            TerrainClamp { body: mars },
        ))
        .id();

    let up = start.normalize_or(DVec3::Z);
    commands.spawn((
        CameraRig::new(up),
        LocalPosition(up * 0.05),
        LocalOrientation::default(),
        FrameParent(spacecraft),
    ));

    tracing::info!("Demo scene spawned");
}

/// Move the spacecraft along the scripted descent, facing its direction of
/// travel.
fn fly_spacecraft(
    clock: Res<Clock>,
    mission: Res<Mission>,
    mut spacecraft: Query<(&mut LocalPosition, &mut LocalOrientation), With<Descent>>,
) {
    let time = clock.0.time();
    let position = descent_position(time, &mission.0);
    let ahead = descent_position(time + 1.0, &mission.0);

    for (mut local, mut orientation) in &mut spacecraft {
        local.0 = position;
        if let Some(forward) = (ahead - position).try_normalize() {
            orientation.0 = DQuat::from_rotation_arc(DVec3::Z, forward);
        }
    }
}

/// Log phase changes and periodic readouts.
fn report_story(
    time: Res<Time>,
    mut changes: MessageReader<PhaseChanged>,
    narration: Res<Narration>,
    mut since_report: Local<f32>,
) {
    for change in changes.read() {
        tracing::info!("Now showing: {}", change.title);
    }

    *since_report += time.delta_secs();
    if *since_report < REPORT_INTERVAL {
        return;
    }
    *since_report = 0.0;

    if let Some(readout) = &narration.readout {
        tracing::info!(
            "{}distance {}, altitude {}, speed {}, touchdown in {}{}",
            if readout.live { "[live] " } else { "" },
            readout.distance,
            readout.altitude,
            readout.speed,
            readout.touchdown,
            readout
                .next_phase
                .as_ref()
                .map(|next| format!(", next phase in {next}"))
                .unwrap_or_default()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descent_ends_below_terrain() {
        let config = MissionConfig::default();
        let end = Spheroid::MARS.lla_from_xyz(descent_position(config.landing, &config));
        assert!((end.alt - (SITE_ALTITUDE - TRAJECTORY_UNDERSHOOT)).abs() < 1e-6);

        let entry = Spheroid::MARS.lla_from_xyz(descent_position(config.epoch, &config));
        assert!((entry.alt - (ENTRY_ALTITUDE + SITE_ALTITUDE)).abs() < 1e-6);
    }
}

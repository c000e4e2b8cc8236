//! Reference camera collaborator.
//!
//! Consumes [`CameraFlight`] messages: the camera is reparented to the flight
//! subject and eased from its current offset to the requested destination.
//! A newer flight replaces the one in progress; manual input cancels it.

use bevy::ecs::message::MessageReader;
use bevy::prelude::*;
use glam::{DMat3, DQuat, DVec3};

use crate::{
    EdlSet,
    guided_camera::{CameraFlight, ManualCameraInput},
    scene::{
        FrameParent, FrameQuery, LocalOrientation, LocalPosition, SceneId, find_entity,
        world_position,
    },
};

// ============================================================================
// Plugin
// ============================================================================

/// Plugin for the camera rig.
pub struct CameraRigPlugin;

impl Plugin for CameraRigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (start_flights, animate_flights)
                .chain()
                .after(EdlSet::Camera),
        );
    }
}

// ============================================================================
// Components
// ============================================================================

/// Camera controlled by story flights.
#[derive(Component, Debug, Default)]
pub struct CameraRig {
    /// Current up vector.
    pub up: DVec3,
    flight: Option<Flight>,
}

impl CameraRig {
    pub fn new(up: DVec3) -> Self {
        Self { up, flight: None }
    }

    /// Returns true while a flight is in progress.
    pub fn is_flying(&self) -> bool {
        self.flight.is_some()
    }

    /// Progress of the current flight from 0.0 to 1.0.
    pub fn progress(&self) -> Option<f64> {
        self.flight.as_ref().map(Flight::progress)
    }
}

/// An in-progress flight, relative to the subject.
#[derive(Debug, Clone)]
struct Flight {
    start: DVec3,
    target: DVec3,
    start_up: DVec3,
    target_up: DVec3,
    min_radius: f64,
    cinematic: bool,
    duration: f64,
    elapsed: f64,
}

impl Flight {
    fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Offset from the subject at the current progress.
    fn position(&self) -> DVec3 {
        let t = smootherstep(self.progress());
        let position = if self.cinematic {
            // Swing around the subject instead of cutting through it.
            let length = self.start.length() + (self.target.length() - self.start.length()) * t;
            match (self.start.try_normalize(), self.target.try_normalize()) {
                (Some(from), Some(to)) => slerp(from, to, t) * length,
                _ => self.start.lerp(self.target, t),
            }
        } else {
            self.start.lerp(self.target, t)
        };

        let distance = position.length();
        if distance < self.min_radius && distance > 0.0 {
            position * (self.min_radius / distance)
        } else {
            position
        }
    }

    fn up(&self) -> DVec3 {
        let t = smootherstep(self.progress());
        self.start_up
            .lerp(self.target_up, t)
            .try_normalize()
            .unwrap_or(self.target_up)
    }
}

/// Smootherstep easing (zero first and second derivatives at the ends).
pub fn smootherstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Spherical interpolation between unit vectors.
fn slerp(a: DVec3, b: DVec3, t: f64) -> DVec3 {
    let theta = a.dot(b).clamp(-1.0, 1.0).acos();
    if theta.abs() < 1e-10 {
        return a.lerp(b, t).normalize();
    }
    let axis = a
        .cross(b)
        .try_normalize()
        .unwrap_or_else(|| a.any_orthonormal_vector());
    DQuat::from_axis_angle(axis, theta * t) * a
}

/// Orientation looking from `offset` towards the frame origin with `up`.
fn look_at_origin(offset: DVec3, up: DVec3) -> Option<DQuat> {
    let forward = (-offset).try_normalize()?;
    let right = forward.cross(up).try_normalize()?;
    let up = right.cross(forward);
    Some(DQuat::from_mat3(&DMat3::from_cols(right, up, -forward)))
}

// ============================================================================
// Systems
// ============================================================================

/// Start the most recent flight, or cancel on manual input.
fn start_flights(
    mut flights: MessageReader<CameraFlight>,
    mut manual: MessageReader<ManualCameraInput>,
    ids: Query<(Entity, &SceneId)>,
    frames: FrameQuery,
    mut rigs: Query<(Entity, &mut CameraRig)>,
    mut commands: Commands,
) {
    let cancelled = manual.read().count() > 0;
    let latest = flights.read().last().cloned();

    let Ok((camera, mut rig)) = rigs.single_mut() else {
        return;
    };

    if cancelled && rig.flight.take().is_some() {
        tracing::debug!("Manual camera input, cancelling flight");
    }

    let Some(flight) = latest else {
        return;
    };
    let Some(subject) = find_entity(&ids, &flight.subject) else {
        tracing::warn!("Flight subject '{}' not found", flight.subject);
        return;
    };
    let (Some(camera_position), Some(subject_position)) = (
        world_position(camera, &frames),
        world_position(subject, &frames),
    ) else {
        tracing::warn!("Camera or flight subject has no position");
        return;
    };

    let start = camera_position - subject_position;
    commands
        .entity(camera)
        .insert((FrameParent(subject), LocalPosition(start)));

    let start_up = rig.up;
    rig.flight = Some(Flight {
        start,
        target: flight.destination,
        start_up,
        target_up: flight.up,
        min_radius: flight.min_radius,
        cinematic: flight.cinematic,
        duration: flight.duration,
        elapsed: 0.0,
    });
    tracing::debug!(
        "Flying to '{}' over {:.2}s",
        flight.subject,
        flight.duration
    );
}

/// Ease active flights towards their destination.
fn animate_flights(
    time: Res<Time>,
    mut rigs: Query<(&mut CameraRig, &mut LocalPosition, &mut LocalOrientation)>,
) {
    for (mut rig, mut position, mut orientation) in &mut rigs {
        let Some(flight) = rig.flight.as_mut() else {
            continue;
        };
        flight.elapsed += time.delta_secs_f64();

        let offset = flight.position();
        let up = flight.up();
        let done = flight.progress() >= 1.0;

        position.0 = offset;
        if let Some(look) = look_at_origin(offset, up) {
            orientation.0 = look;
        }
        rig.up = up;
        if done {
            rig.flight = None;
        }
    }
}

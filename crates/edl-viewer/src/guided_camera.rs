//! Guided camera sequencing.
//!
//! While guided mode is on and the clock is running, the preset that applies
//! at the current phase offset is turned into a [`CameraFlight`]. Each preset
//! fires at most once per phase visit; the record of what fired resets when
//! the phase changes.

use bevy::ecs::message::{Message, MessageReader, MessageWriter};
use bevy::prelude::*;
use edl_core::{CameraPreset, ShotContext, SyncKey, frame_shot, select_preset};
use glam::{DQuat, DVec3};

use crate::{
    Story,
    clock::Clock,
    narration::Narration,
    scene::{FrameQuery, LocalOrientation, OcclusionRadius, SceneId, find_entity, world_position},
};

/// Seconds of frame time a flight waits for its entities before it is
/// dropped.
pub const ENTITY_WAIT_TIMEOUT: f32 = 3.0;

/// Fly the camera to a subject-relative destination.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct CameraFlight {
    /// Scene id of the entity the camera attaches to.
    pub subject: String,
    /// Camera position relative to the subject, in kilometers.
    pub destination: DVec3,
    pub up: DVec3,
    /// Seconds the flight should take.
    pub duration: f64,
    /// Closest the camera may get to the subject.
    pub min_radius: f64,
    pub cinematic: bool,
}

/// The host turned guided mode on or off.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuidedModeToggled {
    pub enabled: bool,
}

/// The user moved the camera by hand.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManualCameraInput;

/// Sequencer state.
#[derive(Resource, Debug)]
pub struct GuidedCamera {
    pub enabled: bool,
    last_key: Option<SyncKey>,
    phase_id: Option<String>,
    pending: Option<PendingFlight>,
}

impl Default for GuidedCamera {
    fn default() -> Self {
        Self {
            enabled: true,
            last_key: None,
            phase_id: None,
            pending: None,
        }
    }
}

impl GuidedCamera {
    /// Key of the last preset that fired in the current phase.
    pub fn last_key(&self) -> Option<&SyncKey> {
        self.last_key.as_ref()
    }

    /// Returns true while a fired preset waits for its entities.
    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }
}

/// A fired preset waiting for its entities to be in place.
#[derive(Debug, Clone)]
struct PendingFlight {
    key: SyncKey,
    preset: CameraPreset,
    waited: f32,
}

/// Fire presets as the clock crosses their thresholds.
pub(crate) fn sequence_presets(
    mut toggles: MessageReader<GuidedModeToggled>,
    mut manual: MessageReader<ManualCameraInput>,
    mut guided: ResMut<GuidedCamera>,
    narration: Res<Narration>,
    clock: Res<Clock>,
    story: Res<Story>,
) {
    if let Some(toggle) = toggles.read().last() {
        guided.enabled = toggle.enabled;
        if !toggle.enabled {
            guided.pending = None;
        }
        tracing::info!("Guided camera {}", if toggle.enabled { "on" } else { "off" });
    }
    if manual.read().count() > 0 && guided.pending.take().is_some() {
        tracing::debug!("Manual camera input superseded pending flight");
    }

    // The sentinel index shows the last phase, so its presets stay reachable.
    let Some(index) = narration.index else {
        return;
    };
    let phase = story.0.display_phase(index);
    if guided.phase_id.as_deref() != Some(phase.id.as_str()) {
        guided.phase_id = Some(phase.id.clone());
        guided.last_key = None;
    }

    let rate = clock.0.rate();
    if !guided.enabled || rate == 0.0 {
        return;
    }

    let presets = phase.presets_for_rate(rate);
    let elapsed = clock.0.time() - phase.start;
    let Some(index) = select_preset(presets, elapsed, rate) else {
        return;
    };

    let key = SyncKey::new(&phase.id, index);
    if guided.last_key.as_ref() == Some(&key) {
        return;
    }

    tracing::info!("Camera preset {key} fired at {elapsed:.2}s into the phase");
    guided.last_key = Some(key.clone());
    guided.pending = Some(PendingFlight {
        key,
        preset: presets[index].scaled_for_rate(rate),
        waited: 0.0,
    });
}

/// Issue the pending flight once its entities are in place.
pub(crate) fn issue_flights(
    time: Res<Time>,
    mut guided: ResMut<GuidedCamera>,
    mut flights: MessageWriter<CameraFlight>,
    ids: Query<(Entity, &SceneId)>,
    frames: FrameQuery,
    entities: Query<(Option<&LocalOrientation>, Option<&OcclusionRadius>)>,
) {
    let Some(pending) = guided.pending.as_mut() else {
        return;
    };

    let pose = |id: &str| {
        let entity = find_entity(&ids, id)?;
        let position = world_position(entity, &frames)?;
        let (orientation, radius) = entities.get(entity).ok()?;
        Some((
            position,
            orientation.map_or(DQuat::IDENTITY, |o| o.0),
            radius.map_or(0.0, |r| r.0),
        ))
    };

    let preset = &pending.preset;
    let subject = pose(&preset.subject);
    let plane = pose(&preset.framing.plane);
    let target = preset.shot.target().map(|id| pose(id).map(|(position, ..)| position));
    let in_place = subject.is_some() && plane.is_some() && !matches!(target, Some(None));

    if !in_place {
        pending.waited += time.delta_secs();
        if pending.waited >= ENTITY_WAIT_TIMEOUT {
            tracing::warn!(
                "Entities for camera preset {} not in place after {ENTITY_WAIT_TIMEOUT}s, dropping it",
                pending.key
            );
            guided.pending = None;
        }
        return;
    }

    let (Some(subject), Some(plane)) = (subject, plane) else {
        return;
    };
    let context = ShotContext {
        subject_position: subject.0,
        subject_orientation: subject.1,
        subject_radius: subject.2,
        plane_position: plane.0,
        plane_orientation: plane.1,
        target_position: target.flatten(),
    };

    match frame_shot(&preset.shot, &preset.framing, &context) {
        Some(destination) => {
            flights.write(CameraFlight {
                subject: preset.subject.clone(),
                destination: destination.destination,
                up: destination.up,
                duration: destination.duration,
                min_radius: destination.min_radius,
                cinematic: destination.cinematic,
            });
        }
        None => {
            tracing::warn!("Camera preset {} has degenerate geometry, skipping", pending.key);
        }
    }
    guided.pending = None;
}

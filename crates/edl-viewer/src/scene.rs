//! Scene graph components shared by the story systems.
//!
//! Positions are stored in f64 kilometers relative to an optional parent
//! frame. Frames are translation-only: a parent's orientation describes the
//! parent itself and is not applied to its children. Rendered transforms are
//! computed relative to the camera so they stay within f32 precision.

use bevy::prelude::*;
use glam::{DQuat, DVec3};

use crate::camera_rig::CameraRig;

/// Parent chains deeper than this are treated as unresolvable (cycles).
const MAX_FRAME_DEPTH: usize = 16;

/// Plugin that keeps render transforms in step with the f64 scene.
pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PostUpdate,
            sync_render_transforms.after(crate::collision::clamp_to_terrain),
        );
    }
}

/// Stable string id used by stories and presets to refer to an entity.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Position relative to the [`FrameParent`], or to the scene origin.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalPosition(pub DVec3);

/// Orientation of the entity itself.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct LocalOrientation(pub DQuat);

impl Default for LocalOrientation {
    fn default() -> Self {
        Self(DQuat::IDENTITY)
    }
}

/// The entity whose frame [`LocalPosition`] is expressed in.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameParent(pub Entity);

/// Radius of the sphere that bounds the entity, in kilometers.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct OcclusionRadius(pub f64);

/// Read-only access to positions and parents.
pub type FrameQuery<'w, 's> =
    Query<'w, 's, (&'static LocalPosition, Option<&'static FrameParent>)>;

/// Find the entity carrying `id`.
pub fn find_entity(ids: &Query<(Entity, &SceneId)>, id: &str) -> Option<Entity> {
    ids.iter()
        .find_map(|(entity, scene_id)| (scene_id.0 == id).then_some(entity))
}

/// Absolute position of `entity`, walking its parent chain with `lookup`.
///
/// Returns `None` if any entity in the chain is missing, the chain is too
/// deep, or the result is not finite.
pub fn resolve_position(
    entity: Entity,
    lookup: impl Fn(Entity) -> Option<(DVec3, Option<Entity>)>,
) -> Option<DVec3> {
    let mut position = DVec3::ZERO;
    let mut current = Some(entity);
    for _ in 0..MAX_FRAME_DEPTH {
        let Some(entity) = current else {
            return position.is_finite().then_some(position);
        };
        let (local, parent) = lookup(entity)?;
        position += local;
        current = parent;
    }
    None
}

/// Absolute position of `entity`.
pub fn world_position(entity: Entity, frames: &FrameQuery) -> Option<DVec3> {
    resolve_position(entity, |entity| {
        frames
            .get(entity)
            .ok()
            .map(|(local, parent)| (local.0, parent.map(|parent| parent.0)))
    })
}

/// Move render transforms so the camera sits at the origin.
fn sync_render_transforms(
    frames: FrameQuery,
    camera: Query<Entity, With<CameraRig>>,
    mut transforms: Query<(Entity, &mut Transform, Option<&LocalOrientation>)>,
) {
    let origin = camera
        .single()
        .ok()
        .and_then(|camera| world_position(camera, &frames))
        .unwrap_or(DVec3::ZERO);

    for (entity, mut transform, orientation) in &mut transforms {
        let Some(position) = world_position(entity, &frames) else {
            continue;
        };
        transform.translation = (position - origin).as_vec3();
        if let Some(orientation) = orientation {
            transform.rotation = orientation.0.as_quat();
        }
    }
}

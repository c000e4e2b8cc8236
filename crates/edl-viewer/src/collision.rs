//! Terrain collision clamp.
//!
//! Keeps clamped entities from sinking below the ground of their body. Runs
//! in `PostUpdate`, after everything else has placed the entities.

use bevy::prelude::*;
use edl_core::{LatLonAlt, Spheroid};
use glam::{DQuat, DVec3};

use crate::scene::{FrameParent, LocalOrientation, LocalPosition, resolve_position};

/// Entities are only moved when this far below the ground, in kilometers.
const CLAMP_EPSILON: f64 = 1e-9;

/// Plugin for the terrain clamp.
pub struct CollisionPlugin;

impl Plugin for CollisionPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PostUpdate, clamp_to_terrain);
    }
}

/// Ground height lookup for a body.
pub trait TerrainSampler: Send + Sync + 'static {
    /// Ground altitude above the spheroid, in kilometers, at a planetocentric
    /// latitude and longitude (radians).
    fn ground_altitude(&self, lat: f64, lon: f64) -> f64;

    /// Whether the terrain tiles covering the body are available.
    fn tiles_loaded(&self) -> bool {
        true
    }
}

/// Terrain at a constant altitude everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantTerrain {
    pub altitude: f64,
}

impl TerrainSampler for ConstantTerrain {
    fn ground_altitude(&self, _lat: f64, _lon: f64) -> f64 {
        self.altitude
    }
}

/// Reference spheroid of a body.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct BodySpheroid(pub Spheroid);

/// Terrain of a body.
#[derive(Component)]
pub struct Terrain(pub Box<dyn TerrainSampler>);

impl Terrain {
    pub fn new(sampler: impl TerrainSampler) -> Self {
        Self(Box::new(sampler))
    }
}

/// Keeps the entity above the terrain of `body`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainClamp {
    pub body: Entity,
}

/// Body state needed to clamp against it.
struct Body<'a> {
    position: DVec3,
    orientation: DQuat,
    spheroid: Spheroid,
    terrain: &'a dyn TerrainSampler,
}

impl Body<'_> {
    /// New position relative to the body if `relative` lies below ground.
    fn clamp(&self, relative: DVec3) -> Option<DVec3> {
        let body_fixed = self.orientation.inverse() * relative;
        let lla = self.spheroid.lla_from_xyz(body_fixed);
        let ground = self.terrain.ground_altitude(lla.lat, lla.lon);
        if lla.alt >= ground - CLAMP_EPSILON {
            return None;
        }
        let grounded = self.spheroid.xyz_from_lla(LatLonAlt { alt: ground, ..lla });
        Some(self.orientation * grounded)
    }
}

/// Push clamped entities back up to the ground.
pub(crate) fn clamp_to_terrain(
    clamped: Query<(Entity, &TerrainClamp)>,
    bodies: Query<(&BodySpheroid, &Terrain, Option<&LocalOrientation>)>,
    mut frames: Query<(&mut LocalPosition, Option<&FrameParent>)>,
) {
    let mut updates = Vec::new();
    {
        let lookup = |entity: Entity| {
            frames
                .get(entity)
                .ok()
                .map(|(local, parent)| (local.0, parent.map(|parent| parent.0)))
        };

        for (entity, clamp) in &clamped {
            let Ok((spheroid, terrain, orientation)) = bodies.get(clamp.body) else {
                continue;
            };
            if !terrain.0.tiles_loaded() {
                continue;
            }
            let (Some(position), Some(body_position)) =
                (resolve_position(entity, lookup), resolve_position(clamp.body, lookup))
            else {
                continue;
            };
            let body = Body {
                position: body_position,
                orientation: orientation.map_or(DQuat::IDENTITY, |o| o.0),
                spheroid: spheroid.0,
                terrain: terrain.0.as_ref(),
            };
            let Some(grounded) = body.clamp(position - body.position) else {
                continue;
            };

            let parent_position = match frames.get(entity).ok().and_then(|(_, parent)| parent) {
                Some(parent) => match resolve_position(parent.0, lookup) {
                    Some(position) => position,
                    None => continue,
                },
                None => DVec3::ZERO,
            };
            updates.push((entity, grounded - (parent_position - body.position)));
        }
    }

    for (entity, local) in updates {
        if let Ok((mut position, _)) = frames.get_mut(entity) {
            position.0 = local;
        }
    }
}

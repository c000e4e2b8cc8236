//! Camera framing math for guided shots.
//!
//! Each shot yields a destination offset from the subject and an up vector;
//! the camera collaborator flies there over the requested duration.

use glam::{DQuat, DVec3};

use crate::preset::{Axis, Framing, Shot, UpMode};

/// Camera distance in occlusion radii when a preset gives none.
const DEFAULT_DISTANCE_RADII: f64 = 10.0;

/// Closest the camera may get to the subject, in occlusion radii.
const MIN_RADIUS_FACTOR: f64 = 1.2;

/// Vectors shorter than this have no usable direction.
const DIRECTION_EPSILON: f64 = 1e-9;

fn direction(v: DVec3) -> Option<DVec3> {
    (v.length() > DIRECTION_EPSILON).then(|| v.normalize())
}

/// Scene state a shot is computed from. Positions share one frame.
#[derive(Debug, Clone, Copy)]
pub struct ShotContext {
    pub subject_position: DVec3,
    pub subject_orientation: DQuat,
    pub subject_radius: f64,
    pub plane_position: DVec3,
    pub plane_orientation: DQuat,
    /// Position of the shot's target entity, when the shot has one.
    pub target_position: Option<DVec3>,
}

/// Where the camera should go, relative to the subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraDestination {
    pub destination: DVec3,
    pub up: DVec3,
    pub duration: f64,
    pub min_radius: f64,
    pub cinematic: bool,
}

/// Compute the camera destination for a shot.
///
/// Returns `None` when the geometry is degenerate (coincident entities,
/// view direction parallel to up) or a required target is missing.
#[must_use]
pub fn frame_shot(shot: &Shot, framing: &Framing, ctx: &ShotContext) -> Option<CameraDestination> {
    let radial = direction(ctx.subject_position - ctx.plane_position);

    let (dest, up) = match shot {
        Shot::AlignWithTarget { .. } => {
            let target = ctx.target_position?;
            let dest = direction(ctx.subject_position - target)?;
            let up = direction(target - ctx.plane_position)?;
            (dest, up)
        }
        Shot::ViewFromBehind { up } => {
            let dest = -direction(ctx.subject_orientation * DVec3::Z)?;
            let up = match up {
                UpMode::PlanetUp => direction(ctx.plane_orientation * DVec3::Z)?,
                UpMode::SurfaceUp => radial?,
            };
            (dest, up)
        }
        Shot::ViewFromSide { forward } => {
            let axis = match forward {
                Axis::XAxis => DVec3::X,
                Axis::YAxis => DVec3::Y,
                Axis::ZAxis => DVec3::Z,
            };
            let forward = direction(ctx.subject_orientation * axis)?;
            let radial = radial?;
            let dest = -direction(forward.cross(radial))?;
            (dest, radial)
        }
    };

    let horizontal = direction(dest.cross(up))?;
    let up = horizontal.cross(dest);

    let mut dest = dest;
    if framing.vertical_offset != 0.0 {
        dest = DQuat::from_axis_angle(horizontal, framing.vertical_offset.to_radians()) * dest;
    }
    if framing.horizontal_offset != 0.0 {
        dest = DQuat::from_axis_angle(up, framing.horizontal_offset.to_radians()) * dest;
    }

    let distance = framing
        .distance
        .unwrap_or(DEFAULT_DISTANCE_RADII * ctx.subject_radius);

    Some(CameraDestination {
        destination: dest * distance,
        up,
        duration: framing.duration,
        min_radius: MIN_RADIUS_FACTOR * ctx.subject_radius,
        cinematic: framing.cinematic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ShotContext {
        ShotContext {
            subject_position: DVec3::new(1.0, 0.0, 10.0),
            subject_orientation: DQuat::IDENTITY,
            subject_radius: 0.5,
            plane_position: DVec3::ZERO,
            plane_orientation: DQuat::IDENTITY,
            target_position: Some(DVec3::new(0.0, 0.0, 10.0)),
        }
    }

    fn assert_close(a: DVec3, b: DVec3) {
        assert!((a - b).length() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn test_align_with_target() {
        let shot = Shot::AlignWithTarget {
            target: "site".to_string(),
        };
        let result = frame_shot(&shot, &Framing::default(), &context()).unwrap();
        assert_close(result.destination, DVec3::new(5.0, 0.0, 0.0));
        assert_close(result.up, DVec3::Z);
        assert!((result.min_radius - 0.6).abs() < 1e-12);
        assert!((result.duration - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_vertical_offset_raises_view() {
        let shot = Shot::AlignWithTarget {
            target: "site".to_string(),
        };
        let framing = Framing {
            vertical_offset: 90.0,
            distance: Some(2.0),
            ..Framing::default()
        };
        let result = frame_shot(&shot, &framing, &context()).unwrap();
        assert_close(result.destination, DVec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_align_without_target_is_none() {
        let shot = Shot::AlignWithTarget {
            target: "site".to_string(),
        };
        let ctx = ShotContext {
            target_position: None,
            ..context()
        };
        assert!(frame_shot(&shot, &Framing::default(), &ctx).is_none());
    }

    #[test]
    fn test_view_from_behind_surface_up() {
        // Subject faces +X (its local Z axis), sitting above the pole.
        let ctx = ShotContext {
            subject_position: DVec3::new(0.0, 0.0, 10.0),
            subject_orientation: DQuat::from_rotation_y(std::f64::consts::FRAC_PI_2),
            ..context()
        };
        let shot = Shot::ViewFromBehind {
            up: UpMode::SurfaceUp,
        };
        let framing = Framing {
            distance: Some(1.0),
            ..Framing::default()
        };
        let result = frame_shot(&shot, &framing, &ctx).unwrap();
        assert_close(result.destination, DVec3::new(-1.0, 0.0, 0.0));
        assert_close(result.up, DVec3::Z);
    }

    #[test]
    fn test_view_from_side() {
        let ctx = ShotContext {
            subject_position: DVec3::new(0.0, 0.0, 10.0),
            ..context()
        };
        let shot = Shot::ViewFromSide {
            forward: Axis::XAxis,
        };
        let framing = Framing {
            distance: Some(1.0),
            ..Framing::default()
        };
        let result = frame_shot(&shot, &framing, &ctx).unwrap();
        // -(X cross Z) = +Y.
        assert_close(result.destination, DVec3::Y);
        assert_close(result.up, DVec3::Z);
    }

    #[test]
    fn test_degenerate_geometry_is_none() {
        // Planet up parallel to the view direction.
        let ctx = context();
        let shot = Shot::ViewFromBehind {
            up: UpMode::PlanetUp,
        };
        assert!(frame_shot(&shot, &Framing::default(), &ctx).is_none());
    }
}

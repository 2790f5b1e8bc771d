//! Keyframe interpolation of tracks.
//!
//! [`position_at`] finds the keyframes around a frame and hands them to the
//! geometry-specific [`Interpolatable`] strategy.

mod curve;

use serde::Serialize;

use crate::annotations::{Keyframes, Position};
use crate::error::FramelabelError;
use crate::format::{ClientId, ShapeType};
use crate::geometry::interpolate_angle;

/// Computes an intermediate position between two keyframes.
pub trait Interpolatable {
    /// `offset` is the relative distance from `left` (0) to `right` (1).
    fn interpolate(&self, left: &Position, right: &Position, offset: f64) -> Position;
}

impl Interpolatable for ShapeType {
    fn interpolate(&self, left: &Position, right: &Position, offset: f64) -> Position {
        if offset == 0.0 {
            return left.clone();
        }

        let points = match self {
            ShapeType::Rectangle | ShapeType::Ellipse | ShapeType::Cuboid => {
                linear_points(&left.points, &right.points, offset)
            }
            ShapeType::Points => {
                if left.points.len() == 2 && right.points.len() == 2 {
                    linear_points(&left.points, &right.points, offset)
                } else {
                    left.points.clone()
                }
            }
            ShapeType::Polyline => curve::interpolate_polyline(&left.points, &right.points, offset),
            ShapeType::Polygon => curve::interpolate_polygon(&left.points, &right.points, offset),
            ShapeType::Mask | ShapeType::Skeleton => left.points.clone(),
        };

        let rotation = match self {
            ShapeType::Rectangle | ShapeType::Ellipse | ShapeType::Cuboid => {
                interpolate_angle(left.rotation, right.rotation, offset)
            }
            _ => left.rotation,
        };

        Position {
            points,
            rotation,
            occluded: left.occluded,
            outside: left.outside,
            z_order: left.z_order,
        }
    }
}

fn linear_points(left: &[f64], right: &[f64], offset: f64) -> Vec<f64> {
    if left.len() != right.len() {
        return left.to_vec();
    }
    left.iter()
        .zip(right)
        .map(|(l, r)| l + (r - l) * offset)
        .collect()
}

/// A track position resolved at a frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InterpolatedPosition {
    pub position: Position,
    /// True when the frame holds a stored keyframe.
    pub keyframe: bool,
}

/// Nearest keyframes around a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KeyframesInfo {
    pub first: Option<u32>,
    pub prev: Option<u32>,
    pub next: Option<u32>,
    pub last: Option<u32>,
}

impl KeyframesInfo {
    pub fn around(keyframes: &Keyframes, frame: u32) -> Self {
        Self {
            first: keyframes.keys().next().copied(),
            prev: keyframes.range(..frame).next_back().map(|(f, _)| *f),
            next: keyframes
                .range(frame.saturating_add(1)..)
                .next()
                .map(|(f, _)| *f)
                .filter(|f| *f > frame),
            last: keyframes.keys().next_back().copied(),
        }
    }
}

/// Computes the position of a track at `frame`.
///
/// A stored keyframe is returned as is. Between two keyframes the geometry
/// strategy interpolates. Before the first or after the last keyframe the
/// nearest keyframe is returned with `outside = true`.
pub fn position_at(
    client_id: ClientId,
    shape_type: ShapeType,
    keyframes: &Keyframes,
    frame: u32,
) -> Result<InterpolatedPosition, FramelabelError> {
    if let Some(shape) = keyframes.get(&frame) {
        return Ok(InterpolatedPosition {
            position: shape.position.clone(),
            keyframe: true,
        });
    }

    let left = keyframes.range(..frame).next_back();
    let right = keyframes.range(frame..).next();

    match (left, right) {
        (Some((&left_frame, left)), Some((&right_frame, right))) => {
            let offset = f64::from(frame - left_frame) / f64::from(right_frame - left_frame);
            Ok(InterpolatedPosition {
                position: shape_type.interpolate(&left.position, &right.position, offset),
                keyframe: false,
            })
        }
        (Some((_, edge)), None) | (None, Some((_, edge))) => Ok(InterpolatedPosition {
            position: Position {
                outside: true,
                ..edge.position.clone()
            },
            keyframe: false,
        }),
        (None, None) => Err(FramelabelError::InterpolationNotPossible { client_id, frame }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::TrackedShape;

    fn rect_track() -> Keyframes {
        let mut keyframes = Keyframes::new();
        keyframes.insert(
            10,
            TrackedShape::new(Position {
                points: vec![0.0, 0.0, 10.0, 10.0],
                ..Default::default()
            }),
        );
        keyframes.insert(
            20,
            TrackedShape::new(Position {
                points: vec![10.0, 10.0, 30.0, 30.0],
                rotation: 40.0,
                ..Default::default()
            }),
        );
        keyframes
    }

    #[test]
    fn test_exact_keyframe() {
        let at = position_at(ClientId(1), ShapeType::Rectangle, &rect_track(), 20).unwrap();
        assert!(at.keyframe);
        assert_eq!(at.position.points, vec![10.0, 10.0, 30.0, 30.0]);
    }

    #[test]
    fn test_midpoint_is_linear() {
        let at = position_at(ClientId(1), ShapeType::Rectangle, &rect_track(), 15).unwrap();
        assert!(!at.keyframe);
        assert!(!at.position.outside);
        assert_eq!(at.position.points, vec![5.0, 5.0, 20.0, 20.0]);
        assert_eq!(at.position.rotation, 20.0);
    }

    #[test]
    fn test_outside_beyond_ends() {
        let after = position_at(ClientId(1), ShapeType::Rectangle, &rect_track(), 25).unwrap();
        assert!(after.position.outside);
        assert_eq!(after.position.points, vec![10.0, 10.0, 30.0, 30.0]);

        let before = position_at(ClientId(1), ShapeType::Rectangle, &rect_track(), 2).unwrap();
        assert!(before.position.outside);
        assert_eq!(before.position.points, vec![0.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_empty_track_fails() {
        let err = position_at(ClientId(9), ShapeType::Rectangle, &Keyframes::new(), 0).unwrap_err();
        assert!(matches!(
            err,
            FramelabelError::InterpolationNotPossible { frame: 0, .. }
        ));
    }

    #[test]
    fn test_points_snap_unless_single() {
        let left = Position {
            points: vec![0.0, 0.0, 4.0, 4.0],
            ..Default::default()
        };
        let right = Position {
            points: vec![10.0, 10.0, 14.0, 14.0],
            ..Default::default()
        };
        assert_eq!(ShapeType::Points.interpolate(&left, &right, 0.5).points, left.points);

        let single_left = Position {
            points: vec![0.0, 0.0],
            ..Default::default()
        };
        let single_right = Position {
            points: vec![10.0, 20.0],
            ..Default::default()
        };
        assert_eq!(
            ShapeType::Points.interpolate(&single_left, &single_right, 0.5).points,
            vec![5.0, 10.0]
        );
    }

    #[test]
    fn test_mask_snaps_left() {
        let left = Position {
            points: vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            ..Default::default()
        };
        let right = Position {
            points: vec![0.0, 1.0, 5.0, 5.0, 5.0, 5.0],
            ..Default::default()
        };
        assert_eq!(ShapeType::Mask.interpolate(&left, &right, 0.7), left);
    }

    #[test]
    fn test_keyframe_bounds() {
        let bounds = KeyframesInfo::around(&rect_track(), 15);
        assert_eq!(
            bounds,
            KeyframesInfo {
                first: Some(10),
                prev: Some(10),
                next: Some(20),
                last: Some(20)
            }
        );
        let at_first = KeyframesInfo::around(&rect_track(), 10);
        assert_eq!(at_first.prev, None);
        assert_eq!(at_first.next, Some(20));
    }
}

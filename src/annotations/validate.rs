//! Geometry validation applied before any points are stored.

use std::f64::consts::PI;

use crate::error::FramelabelError;
use crate::format::ShapeType;
use crate::geometry::BBoxXYXY;
use crate::mask::{self, MaskBorders, MIN_MASK_AREA};
use crate::schema::FrameSize;

/// Minimum bounding-box area, in square pixels, of area geometries.
pub const MIN_SHAPE_AREA: f64 = 9.0;

/// Minimum extent, in pixels, of a polyline along its longer axis.
pub const MIN_SHAPE_LENGTH: f64 = 3.0;

/// Checks point arity and finiteness for a geometry type.
pub fn check_points(shape_type: ShapeType, points: &[f64]) -> Result<(), FramelabelError> {
    let n = points.len();
    let arity_ok = match shape_type {
        ShapeType::Rectangle | ShapeType::Ellipse => n == 4,
        ShapeType::Cuboid => n == 16,
        ShapeType::Polygon => n >= 6,
        ShapeType::Polyline => n >= 4,
        ShapeType::Points => n >= 2,
        ShapeType::Mask => n >= 6,
        ShapeType::Skeleton => n == 0,
    };
    if !arity_ok {
        return Err(FramelabelError::argument(format!(
            "{} got {} coordinate(s), which is not a valid arity",
            shape_type, n
        )));
    }
    if shape_type != ShapeType::Mask && n % 2 != 0 {
        return Err(FramelabelError::argument(format!(
            "{} requires an even number of coordinates, got {}",
            shape_type, n
        )));
    }
    if points.iter().any(|v| !v.is_finite()) {
        return Err(FramelabelError::argument(format!(
            "{} points must be finite numbers",
            shape_type
        )));
    }
    Ok(())
}

/// Returns true if the geometry is large enough to keep.
pub fn check_shape_area(shape_type: ShapeType, points: &[f64]) -> bool {
    match shape_type {
        ShapeType::Points | ShapeType::Skeleton => true,
        ShapeType::Mask => match MaskBorders::from_points(points) {
            Some(b) => ((b.width() * b.height()) as f64) >= MIN_MASK_AREA && !mask::is_void(points),
            None => false,
        },
        ShapeType::Ellipse => {
            if points.len() < 4 {
                return false;
            }
            let rx = points[2] - points[0];
            let ry = points[1] - points[3];
            (rx * ry * PI).abs() > MIN_SHAPE_AREA
        }
        ShapeType::Polyline => {
            let bbox = BBoxXYXY::of_shape(shape_type, points);
            bbox.width().max(bbox.height()) >= MIN_SHAPE_LENGTH
        }
        _ => BBoxXYXY::of_shape(shape_type, points).area() >= MIN_SHAPE_AREA,
    }
}

/// Brings points into the frame.
///
/// Masks are cropped to the frame. Axis-aligned, unrotated geometries are
/// clamped to `[0, width] x [0, height]`; ellipses, cuboids and rotated
/// shapes are left untouched.
pub fn fit_points(shape_type: ShapeType, points: &[f64], rotation: f64, frame: FrameSize) -> Vec<f64> {
    match shape_type {
        ShapeType::Mask => mask::crop_mask(points, frame.width, frame.height),
        ShapeType::Ellipse | ShapeType::Cuboid | ShapeType::Skeleton => points.to_vec(),
        _ if rotation != 0.0 => points.to_vec(),
        _ => points
            .chunks_exact(2)
            .flat_map(|p| {
                [
                    p[0].clamp(0.0, f64::from(frame.width)),
                    p[1].clamp(0.0, f64::from(frame.height)),
                ]
            })
            .collect(),
    }
}

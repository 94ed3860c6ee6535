//! Mapping local geometry into document space.
//!
//! Items carry an axis-aligned box plus a rotation about its centre.  When
//! an element's transform is a rotation with axis scales that pair is
//! exact; otherwise the transformed outline's bounding box is used.

use annosvg_core::{Matrix, Point, Rect};
use tracing::debug;

/// An item box and its rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub rect: Rect,
    pub rotation: f64,
}

/// Place a local box through `matrix`.
#[must_use]
pub fn place(local: &Rect, matrix: &Matrix) -> Placement {
    if let Some(parts) = matrix.decompose() {
        let center = matrix.apply(local.center());
        let (w, h) = (local.width * parts.scale_x, local.height * parts.scale_y);
        return Placement {
            rect: Rect::new(center.x - w / 2.0, center.y - h / 2.0, w, h),
            rotation: parts.rotation,
        };
    }
    debug!(?matrix, "transform has skew or mirroring; fitting bounding box");
    let corners = local.corners().map(|p| matrix.apply(p));
    Placement {
        rect: Rect::from_points(&corners).unwrap_or(*local),
        rotation: 0.0,
    }
}

/// Place a set of outlines, returning them normalized to the placed box.
///
/// Returns `None` when there are no points.
#[must_use]
pub fn place_outline(rings: &[&[Point]], matrix: &Matrix) -> Option<(Placement, Vec<Vec<Point>>)> {
    let normalize = |rect: Rect, rings: &[Vec<Point>]| -> Vec<Vec<Point>> {
        rings
            .iter()
            .map(|ring| ring.iter().map(|p| rect.normalize(*p)).collect())
            .collect()
    };

    if matrix.decompose().is_some() {
        let local_rings: Vec<Vec<Point>> = rings.iter().map(|r| r.to_vec()).collect();
        let local = Rect::from_points(&local_rings.concat())?;
        return Some((place(&local, matrix), normalize(local, &local_rings)));
    }
    let mapped: Vec<Vec<Point>> = rings
        .iter()
        .map(|ring| ring.iter().map(|p| matrix.apply(*p)).collect())
        .collect();
    let rect = Rect::from_points(&mapped.concat())?;
    Some((
        Placement {
            rect,
            rotation: 0.0,
        },
        normalize(rect, &mapped),
    ))
}

//! Point reduction for decoded strokes using Ramer-Douglas-Peucker.
//!
//! Tessellated curves and dense SVG exports produce far more points than
//! a hand-drawn stroke needs.  The decoder runs this only when
//! [`CodecConfig::simplify_tolerance`](crate::config::CodecConfig) is
//! positive.

use crate::geometry::Point;

/// Simplify a point run.
///
/// Points within `tolerance` units of the chord between their kept
/// neighbours are removed.  A tolerance of `0.0` (or less) returns the
/// input unchanged, as do runs with fewer than 3 points.
#[must_use = "returns the simplified points"]
pub fn simplify_path(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 || tolerance <= 0.0 {
        return points.to_vec();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let (max_idx, max_dist) = ((start + 1)..end)
        .map(|i| (i, chord_distance(points[i], points[start], points[end])))
        .fold((start, 0.0), |best, cand| if cand.1 > best.1 { cand } else { best });

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Distance from `p` to the line through `a` and `b`, or to `a` when the
/// chord is degenerate (closed strokes start and end on the same point).
fn chord_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}

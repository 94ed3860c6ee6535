//! Outline geometry for named shapes.
//!
//! The encoder draws triangles, diamonds, stars, regular polygons and
//! arrows from their bounding box with the functions here; the decoder
//! recognises the same outlines by regenerating each candidate and
//! comparing vertex by vertex.

use crate::document::ShapeType;
use crate::geometry::{Point, Rect};

/// Star inner radius as a fraction of the outer radius.
pub const STAR_INNER_RATIO: f64 = 0.4;

/// Vertices of a polygonal named shape inside `rect`, in drawing order.
///
/// Regular shapes (star, pentagon, hexagon, octagon) are centred on the
/// box with radius `min(width, height) / 2`.  Returns `None` for shape
/// types that are not drawn as a fixed polygon.
#[must_use]
pub fn named_vertices(shape_type: ShapeType, rect: &Rect) -> Option<Vec<Point>> {
    let c = rect.center();
    let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);
    let r = w.min(h) / 2.0;
    let vertices = match shape_type {
        ShapeType::Triangle => vec![
            Point::new(c.x, y),
            Point::new(x, y + h),
            Point::new(x + w, y + h),
        ],
        ShapeType::Diamond => vec![
            Point::new(c.x, y),
            Point::new(x + w, c.y),
            Point::new(c.x, y + h),
            Point::new(x, c.y),
        ],
        ShapeType::Star => (0..10)
            .map(|i| {
                let radius = if i % 2 == 0 { r } else { r * STAR_INNER_RATIO };
                polar(c, radius, f64::from(i).mul_add(36.0, -90.0))
            })
            .collect(),
        ShapeType::Pentagon => regular(c, r, 5, -90.0),
        ShapeType::Hexagon => regular(c, r, 6, -30.0),
        ShapeType::Octagon => regular(c, r, 8, -22.5),
        ShapeType::Arrow => arrow_outline(rect),
        _ => return None,
    };
    Some(vertices)
}

/// Right-pointing block arrow filling `rect`.
#[must_use]
pub fn arrow_outline(rect: &Rect) -> Vec<Point> {
    let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);
    vec![
        Point::new(x, h.mul_add(0.3, y)),
        Point::new(w.mul_add(0.6, x), h.mul_add(0.3, y)),
        Point::new(w.mul_add(0.6, x), y),
        Point::new(x + w, y + h / 2.0),
        Point::new(w.mul_add(0.6, x), y + h),
        Point::new(w.mul_add(0.6, x), h.mul_add(0.7, y)),
        Point::new(x, h.mul_add(0.7, y)),
    ]
}

fn regular(center: Point, radius: f64, sides: u32, start_degrees: f64) -> Vec<Point> {
    let step = 360.0 / f64::from(sides);
    (0..sides)
        .map(|i| polar(center, radius, f64::from(i).mul_add(step, start_degrees)))
        .collect()
}

fn polar(center: Point, radius: f64, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Point::new(radius.mul_add(cos, center.x), radius.mul_add(sin, center.y))
}

/// Drop a trailing vertex that repeats the first (closed outlines).
#[must_use]
pub fn open_ring(points: &[Point]) -> &[Point] {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > 1 && first.approx_eq(*last, 1e-6) => {
            &points[..points.len() - 1]
        }
        _ => points,
    }
}

/// Returns `true` if `points` trace an axis-aligned rectangle.
///
/// Vertices closer than 1 unit are merged; exactly four must remain and
/// each must lie within 2 units of a corner of their bounding box.
#[must_use]
pub fn is_rect_like(points: &[Point]) -> bool {
    if !(4..=6).contains(&points.len()) {
        return false;
    }
    let mut corners: Vec<Point> = Vec::with_capacity(4);
    for p in points {
        if !corners
            .iter()
            .any(|c| (c.x - p.x).abs() < 1.0 && (c.y - p.y).abs() < 1.0)
        {
            corners.push(*p);
        }
    }
    if corners.len() != 4 {
        return false;
    }
    let Some(bounds) = Rect::from_points(&corners) else {
        return false;
    };
    let tolerance = 2.0;
    corners.iter().all(|c| {
        let at_x = (c.x - bounds.x).abs() < tolerance
            || (c.x - (bounds.x + bounds.width)).abs() < tolerance;
        let at_y = (c.y - bounds.y).abs() < tolerance
            || (c.y - (bounds.y + bounds.height)).abs() < tolerance;
        at_x && at_y
    })
}

/// Recognise a closed outline as a rectangle or named shape.
///
/// Returns the shape type and the bounding box that regenerates the
/// outline through [`named_vertices`].  `None` means the outline is an
/// arbitrary polygon.
#[must_use]
pub fn match_outline(points: &[Point]) -> Option<(ShapeType, Rect)> {
    let ring = open_ring(points);
    if is_rect_like(ring) {
        return Rect::from_points(ring).map(|r| (ShapeType::Rectangle, r));
    }
    let bounds = Rect::from_points(ring)?;
    let tolerance = 0.02f64.mul_add(bounds.width.max(bounds.height), 0.05);

    let by_bounds: &[ShapeType] = match ring.len() {
        3 => &[ShapeType::Triangle],
        4 => &[ShapeType::Diamond],
        7 => &[ShapeType::Arrow],
        _ => &[],
    };
    for &shape_type in by_bounds {
        if matches_vertices(shape_type, &bounds, ring, tolerance) {
            return Some((shape_type, bounds));
        }
    }

    let regular_type = match ring.len() {
        5 => ShapeType::Pentagon,
        6 => ShapeType::Hexagon,
        8 => ShapeType::Octagon,
        10 => ShapeType::Star,
        _ => return None,
    };
    let centroid = centroid(ring);
    let radius = ring[0].distance(centroid);
    let square = Rect::new(
        centroid.x - radius,
        centroid.y - radius,
        2.0 * radius,
        2.0 * radius,
    );
    matches_vertices(regular_type, &square, ring, tolerance).then_some((regular_type, square))
}

fn matches_vertices(shape_type: ShapeType, rect: &Rect, ring: &[Point], tolerance: f64) -> bool {
    named_vertices(shape_type, rect).is_some_and(|expected| {
        expected.len() == ring.len()
            && expected
                .iter()
                .zip(ring)
                .all(|(e, p)| e.approx_eq(*p, tolerance))
    })
}

#[allow(clippy::cast_precision_loss)]
fn centroid(points: &[Point]) -> Point {
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

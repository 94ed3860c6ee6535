//! Geometry kernel: points, bounding boxes, and 2D affine transforms.
//!
//! [`Matrix`] follows the SVG convention: a point `(x, y)` maps to
//! `(a*x + c*y + e, b*x + d*y + f)`.  Transform lists such as
//! `translate(10,10) rotate(90)` compose left to right, so the rightmost
//! function is applied to the point first.

use serde::{Deserialize, Serialize};

/// A 2D point in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Returns `true` if both coordinates are within `tolerance` of `other`.
    #[must_use]
    pub fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Rect {
    /// Create a new bounding box.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box containing every point, or `None` for an empty slice.
    #[must_use]
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Corners in drawing order: top-left, top-right, bottom-right,
    /// bottom-left.
    #[must_use]
    pub fn corners(&self) -> [Point; 4] {
        let right = self.x + self.width;
        let bottom = self.y + self.height;
        [
            Point::new(self.x, self.y),
            Point::new(right, self.y),
            Point::new(right, bottom),
            Point::new(self.x, bottom),
        ]
    }

    /// Map a point in this box to the unit square.
    ///
    /// Degenerate axes map to `0.0` instead of dividing by zero.
    #[must_use]
    pub fn normalize(&self, p: Point) -> Point {
        let nx = if self.width > 0.0 {
            (p.x - self.x) / self.width
        } else {
            0.0
        };
        let ny = if self.height > 0.0 {
            (p.y - self.y) / self.height
        } else {
            0.0
        };
        Point::new(nx, ny)
    }

    /// Inverse of [`normalize`](Self::normalize).
    #[must_use]
    pub fn denormalize(&self, p: Point) -> Point {
        Point::new(
            p.x.mul_add(self.width, self.x),
            p.y.mul_add(self.height, self.y),
        )
    }
}

/// A 2D affine transform stored as the SVG `matrix(a b c d e f)` tuple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rotation and per-axis scale recovered from a [`Matrix`] by
/// [`Matrix::decompose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    /// Rotation in degrees, in `(-180, 180]`.
    pub rotation: f64,
    /// Scale along the local x axis.
    pub scale_x: f64,
    /// Scale along the local y axis.
    pub scale_y: f64,
}

impl Matrix {
    /// The identity transform.
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    /// Create a matrix from its six SVG components.
    #[must_use]
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// `translate(tx, ty)`.
    #[must_use]
    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `scale(sx, sy)`.
    #[must_use]
    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// `rotate(degrees)` about the origin.
    #[must_use]
    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// `rotate(degrees, cx, cy)`: rotation about `center`.
    #[must_use]
    pub fn rotate_about(degrees: f64, center: Point) -> Self {
        Self::translate(center.x, center.y)
            .multiply(&Self::rotate(degrees))
            .multiply(&Self::translate(-center.x, -center.y))
    }

    /// `skewX(degrees)`.
    #[must_use]
    pub fn skew_x(degrees: f64) -> Self {
        Self::new(1.0, 0.0, degrees.to_radians().tan(), 1.0, 0.0, 0.0)
    }

    /// `skewY(degrees)`.
    #[must_use]
    pub fn skew_y(degrees: f64) -> Self {
        Self::new(1.0, degrees.to_radians().tan(), 0.0, 1.0, 0.0, 0.0)
    }

    /// Matrix product `self × other`: `other` is applied to a point first.
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        Self::new(
            self.a.mul_add(other.a, self.c * other.b),
            self.b.mul_add(other.a, self.d * other.b),
            self.a.mul_add(other.c, self.c * other.d),
            self.b.mul_add(other.c, self.d * other.d),
            self.a.mul_add(other.e, self.c.mul_add(other.f, self.e)),
            self.b.mul_add(other.e, self.d.mul_add(other.f, self.f)),
        )
    }

    /// Map a point through the transform.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a.mul_add(p.x, self.c.mul_add(p.y, self.e)),
            self.b.mul_add(p.x, self.d.mul_add(p.y, self.f)),
        )
    }

    /// Determinant of the linear part.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.a.mul_add(self.d, -(self.b * self.c))
    }

    /// Uniform length scale: `sqrt(|det|)`.
    ///
    /// Used to scale stroke widths and font sizes, which have no direction.
    #[must_use]
    pub fn scale_factor(&self) -> f64 {
        self.determinant().abs().sqrt()
    }

    /// Returns `true` if this is the identity transform.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Split the linear part into a rotation followed by axis scales.
    ///
    /// Succeeds only when the matrix equals `rotate(θ) · scale(sx, sy)`,
    /// i.e. its columns are orthogonal and it does not mirror.  Skews and
    /// reflections return `None`; callers fall back to a bounding-box fit.
    #[must_use]
    pub fn decompose(&self) -> Option<Decomposed> {
        let scale_x = self.a.hypot(self.b);
        let scale_y = self.c.hypot(self.d);
        if scale_x <= f64::EPSILON || scale_y <= f64::EPSILON {
            return None;
        }
        let dot = self.a.mul_add(self.c, self.b * self.d);
        if dot.abs() > 1e-9 * scale_x * scale_y || self.determinant() <= 0.0 {
            return None;
        }
        let mut rotation = self.b.atan2(self.a).to_degrees();
        if rotation.abs() < 1e-9 {
            rotation = 0.0;
        }
        Some(Decomposed {
            rotation,
            scale_x,
            scale_y,
        })
    }
}

/// Errors from [`parse_transform`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// A transform function name is not one of the SVG 1.1 functions.
    #[error("unknown transform function `{0}`")]
    UnknownFunction(String),

    /// A transform function is missing its parentheses.
    #[error("malformed transform list near `{0}`")]
    Malformed(String),

    /// An argument is not a number.
    #[error("invalid number `{value}` in `{function}`")]
    InvalidNumber {
        /// Transform function being parsed.
        function: String,
        /// Offending token.
        value: String,
    },

    /// A function received the wrong number of arguments.
    #[error("`{function}` does not accept {count} argument(s)")]
    Arity {
        /// Transform function being parsed.
        function: String,
        /// Number of arguments supplied.
        count: usize,
    },
}

/// Parse an SVG `transform` attribute into a single matrix.
///
/// Functions compose left to right in the order written.  An empty or
/// whitespace-only string yields the identity.
///
/// # Errors
///
/// Returns a [`TransformError`] for unknown functions, unbalanced
/// parentheses, non-numeric arguments or a wrong argument count.
///
/// # Examples
///
/// ```
/// use annosvg_core::geometry::{Point, parse_transform};
///
/// let m = parse_transform("translate(10,10) rotate(90)").unwrap();
/// let p = m.apply(Point::new(5.0, 0.0));
/// assert!((p.x - 10.0).abs() < 1e-9 && (p.y - 15.0).abs() < 1e-9);
/// ```
pub fn parse_transform(input: &str) -> Result<Matrix, TransformError> {
    let mut matrix = Matrix::IDENTITY;
    let mut rest = input.trim_start_matches(|c: char| c.is_whitespace() || c == ',');

    while !rest.is_empty() {
        let Some(open) = rest.find('(') else {
            return Err(TransformError::Malformed(rest.to_owned()));
        };
        let name = rest[..open].trim();
        let after = &rest[open + 1..];
        let Some(close) = after.find(')') else {
            return Err(TransformError::Malformed(rest.to_owned()));
        };

        let args = after[..close]
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>()
                    .map_err(|_| TransformError::InvalidNumber {
                        function: name.to_owned(),
                        value: s.to_owned(),
                    })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        matrix = matrix.multiply(&transform_function(name, &args)?);
        rest = after[close + 1..].trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    }

    Ok(matrix)
}

/// Build the matrix for one transform function.
fn transform_function(name: &str, args: &[f64]) -> Result<Matrix, TransformError> {
    let arity = || TransformError::Arity {
        function: name.to_owned(),
        count: args.len(),
    };
    match (name, args) {
        ("translate", [tx]) => Ok(Matrix::translate(*tx, 0.0)),
        ("translate", [tx, ty]) => Ok(Matrix::translate(*tx, *ty)),
        ("scale", [s]) => Ok(Matrix::scale(*s, *s)),
        ("scale", [sx, sy]) => Ok(Matrix::scale(*sx, *sy)),
        ("rotate", [deg]) => Ok(Matrix::rotate(*deg)),
        ("rotate", [deg, cx, cy]) => Ok(Matrix::rotate_about(*deg, Point::new(*cx, *cy))),
        ("skewX", [deg]) => Ok(Matrix::skew_x(*deg)),
        ("skewY", [deg]) => Ok(Matrix::skew_y(*deg)),
        ("matrix", [a, b, c, d, e, f]) => Ok(Matrix::new(*a, *b, *c, *d, *e, *f)),
        ("translate" | "scale" | "rotate" | "skewX" | "skewY" | "matrix", _) => Err(arity()),
        _ => Err(TransformError::UnknownFunction(name.to_owned())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn assert_point(actual: Point, x: f64, y: f64) {
        assert!(
            actual.approx_eq(Point::new(x, y), 1e-9),
            "expected ({x}, {y}), got ({}, {})",
            actual.x,
            actual.y,
        );
    }

    // --- Point / Rect ---

    #[test]
    fn distance_three_four_five() {
        assert!((Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn rect_from_points_spans_extremes() {
        let rect = Rect::from_points(&[
            Point::new(3.0, 7.0),
            Point::new(-1.0, 2.0),
            Point::new(5.0, 4.0),
        ])
        .unwrap();
        assert_eq!(rect, Rect::new(-1.0, 2.0, 6.0, 5.0));
        assert_point(rect.center(), 2.0, 4.5);
    }

    #[test]
    fn rect_from_no_points_is_none() {
        assert!(Rect::from_points(&[]).is_none());
    }

    #[test]
    fn normalize_degenerate_axis_is_zero() {
        let rect = Rect::new(10.0, 10.0, 0.0, 20.0);
        assert_point(rect.normalize(Point::new(10.0, 20.0)), 0.0, 0.5);
    }

    // --- Matrix ---

    #[test]
    fn rotate_about_center_keeps_center_fixed() {
        let m = Matrix::rotate_about(37.0, Point::new(50.0, 20.0));
        assert_point(m.apply(Point::new(50.0, 20.0)), 50.0, 20.0);
    }

    #[test]
    fn multiply_applies_right_operand_first() {
        let m = Matrix::translate(10.0, 0.0).multiply(&Matrix::scale(2.0, 2.0));
        // scale first: (1,1) -> (2,2), then translate -> (12,2)
        assert_point(m.apply(Point::new(1.0, 1.0)), 12.0, 2.0);
    }

    #[test]
    fn scale_factor_of_uniform_scale() {
        assert!((Matrix::scale(3.0, 3.0).scale_factor() - 3.0).abs() < 1e-12);
        assert!((Matrix::rotate(30.0).scale_factor() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn decompose_rotation_and_scale() {
        let m = Matrix::rotate(45.0).multiply(&Matrix::scale(2.0, 3.0));
        let d = m.decompose().unwrap();
        assert!((d.rotation - 45.0).abs() < 1e-9);
        assert!((d.scale_x - 2.0).abs() < 1e-9);
        assert!((d.scale_y - 3.0).abs() < 1e-9);
    }

    #[test]
    fn decompose_rejects_skew_and_mirror() {
        assert!(Matrix::skew_x(20.0).decompose().is_none());
        assert!(Matrix::scale(-1.0, 1.0).decompose().is_none());
    }

    #[test]
    fn decompose_identity_has_zero_rotation() {
        let d = Matrix::IDENTITY.decompose().unwrap();
        assert!(d.rotation.abs() < f64::EPSILON);
    }

    // --- parse_transform ---

    #[test]
    fn empty_transform_is_identity() {
        assert!(parse_transform("").unwrap().is_identity());
        assert!(parse_transform("   ").unwrap().is_identity());
    }

    #[test]
    fn translate_single_argument() {
        let m = parse_transform("translate(5)").unwrap();
        assert_point(m.apply(Point::new(1.0, 1.0)), 6.0, 1.0);
    }

    #[test]
    fn translate_then_rotate_matches_manual_composition() {
        let m = parse_transform("translate(10,10) rotate(90)").unwrap();
        let manual = |p: Point| {
            let r = Matrix::rotate(90.0).apply(p);
            Matrix::translate(10.0, 10.0).apply(r)
        };
        for p in [Point::new(0.0, 0.0), Point::new(5.0, 0.0)] {
            let expected = manual(p);
            assert_point(m.apply(p), expected.x, expected.y);
        }
        assert_point(m.apply(Point::new(5.0, 0.0)), 10.0, 15.0);
    }

    #[test]
    fn rotate_with_center() {
        let m = parse_transform("rotate(90 10 10)").unwrap();
        assert_point(m.apply(Point::new(20.0, 10.0)), 10.0, 20.0);
    }

    #[test]
    fn matrix_function_and_commas() {
        let m = parse_transform("matrix(1,0,0,1,7,-3)").unwrap();
        assert_point(m.apply(Point::new(0.0, 0.0)), 7.0, -3.0);
    }

    #[test]
    fn scale_single_argument_is_uniform() {
        let m = parse_transform("scale(2)").unwrap();
        assert_point(m.apply(Point::new(3.0, 4.0)), 6.0, 8.0);
    }

    #[test]
    fn skew_x_shifts_by_tangent() {
        let m = parse_transform("skewX(45)").unwrap();
        assert_point(m.apply(Point::new(0.0, 2.0)), 2.0, 2.0);
    }

    #[test]
    fn unknown_function_is_rejected() {
        assert_eq!(
            parse_transform("wobble(3)"),
            Err(TransformError::UnknownFunction("wobble".to_owned()))
        );
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(matches!(
            parse_transform("matrix(1,0,0)"),
            Err(TransformError::Arity { count: 3, .. })
        ));
        assert!(matches!(
            parse_transform("rotate(10, 5)"),
            Err(TransformError::Arity { count: 2, .. })
        ));
    }

    #[test]
    fn bad_number_and_unbalanced_parens_are_rejected() {
        assert!(matches!(
            parse_transform("translate(1, x)"),
            Err(TransformError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_transform("translate(1, 2"),
            Err(TransformError::Malformed(_))
        ));
    }

    mod properties {
        use proptest::prelude::*;

        use super::super::*;

        proptest! {
            #[test]
            fn composed_list_equals_sequential_application(
                tx in -500.0..500.0_f64,
                ty in -500.0..500.0_f64,
                deg in -360.0..360.0_f64,
                s in 0.1..10.0_f64,
                px in -1000.0..1000.0_f64,
                py in -1000.0..1000.0_f64,
            ) {
                let list = format!("translate({tx} {ty}) rotate({deg}) scale({s})");
                let m = parse_transform(&list).unwrap();
                let p = Point::new(px, py);
                let expected = Matrix::translate(tx, ty)
                    .apply(Matrix::rotate(deg).apply(Matrix::scale(s, s).apply(p)));
                let actual = m.apply(p);
                prop_assert!(actual.approx_eq(expected, 1e-6));
            }

            #[test]
            fn decompose_recovers_rotation(deg in -179.0..179.0_f64, s in 0.1..10.0_f64) {
                let d = Matrix::rotate(deg).multiply(&Matrix::scale(s, s)).decompose().unwrap();
                prop_assert!((d.rotation - deg).abs() < 1e-6);
                prop_assert!((d.scale_x - s).abs() < 1e-6);
            }
        }
    }
}

//! SVG path-data interpretation.
//!
//! Tokenizing is delegated to `svgtypes`, which reads every parameter as
//! `f64`; this module walks the resulting segments, resolves relative
//! coordinates and flattens every curve into straight segments.  The
//! result is a list of [`Subpath`]s in the path's own coordinate system.

use std::f64::consts::TAU;

use svgtypes::{PathParser, PathSegment};

use crate::geometry::Point;

/// One continuous run of points produced by a path's `d` attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Subpath {
    /// Vertices in drawing order, with consecutive duplicates removed.
    pub points: Vec<Point>,
    /// `true` if the run ended with a `Z` command.
    pub closed: bool,
}

/// Errors from [`parse_path_d`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path data could not be tokenized.
    #[error("invalid path data: {0}")]
    Syntax(String),

    /// A drawing command appeared before the first `M`.
    #[error("path data must begin with a moveto")]
    MissingMoveTo,
}

/// Parse path data into subpaths, flattening curves.
///
/// Each cubic, quadratic or arc segment becomes `curve_segments` straight
/// segments (at least one).  A subpath is reported only when at least one
/// drawing command followed its moveto.
///
/// # Errors
///
/// Returns [`PathError`] when the data is not valid SVG path syntax (a
/// dangling parameter included) or does not start with a moveto.
pub fn parse_path_d(d: &str, curve_segments: usize) -> Result<Vec<Subpath>, PathError> {
    let mut pen = PathPen::new(curve_segments.max(1));
    for segment in PathParser::from(d) {
        let segment = segment.map_err(|e| PathError::Syntax(e.to_string()))?;
        pen.segment(segment)?;
    }
    Ok(pen.finish())
}

/// Flatten every subpath into a single point run.
///
/// Convenience for callers that treat a whole `d` attribute as one stroke.
#[must_use]
pub fn concat_subpaths(subpaths: &[Subpath]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::new();
    for p in subpaths.iter().flat_map(|s| &s.points) {
        if out.last() != Some(p) {
            out.push(*p);
        }
    }
    out
}

/// Which smooth-curve reflection, if any, the previous command allows.
#[derive(Debug, Clone, Copy)]
enum LastControl {
    None,
    Cubic(Point),
    Quadratic(Point),
}

/// Path interpreter state.
struct PathPen {
    segments: usize,
    subpaths: Vec<Subpath>,
    current: Vec<Point>,
    drawn: bool,
    cursor: Point,
    start: Point,
    moved: bool,
    last_control: LastControl,
}

impl PathPen {
    const fn new(segments: usize) -> Self {
        Self {
            segments,
            subpaths: Vec::new(),
            current: Vec::new(),
            drawn: false,
            cursor: Point::new(0.0, 0.0),
            start: Point::new(0.0, 0.0),
            moved: false,
            last_control: LastControl::None,
        }
    }

    fn segment(&mut self, segment: PathSegment) -> Result<(), PathError> {
        let last_control = std::mem::replace(&mut self.last_control, LastControl::None);
        match segment {
            PathSegment::MoveTo { abs, x, y } => {
                let p = self.resolve(abs, x, y);
                self.move_to(p);
            }
            PathSegment::LineTo { abs, x, y } => {
                let p = self.resolve(abs, x, y);
                self.line_to(p)?;
            }
            PathSegment::HorizontalLineTo { abs, x } => {
                let x = if abs { x } else { self.cursor.x + x };
                self.line_to(Point::new(x, self.cursor.y))?;
            }
            PathSegment::VerticalLineTo { abs, y } => {
                let y = if abs { y } else { self.cursor.y + y };
                self.line_to(Point::new(self.cursor.x, y))?;
            }
            PathSegment::CurveTo {
                abs,
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                let c1 = self.resolve(abs, x1, y1);
                let c2 = self.resolve(abs, x2, y2);
                let end = self.resolve(abs, x, y);
                self.cubic_to(c1, c2, end)?;
            }
            PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => {
                let c1 = match last_control {
                    LastControl::Cubic(ctrl) => reflect(ctrl, self.cursor),
                    _ => self.cursor,
                };
                let c2 = self.resolve(abs, x2, y2);
                let end = self.resolve(abs, x, y);
                self.cubic_to(c1, c2, end)?;
            }
            PathSegment::Quadratic { abs, x1, y1, x, y } => {
                let ctrl = self.resolve(abs, x1, y1);
                let end = self.resolve(abs, x, y);
                self.quad_to(ctrl, end)?;
            }
            PathSegment::SmoothQuadratic { abs, x, y } => {
                let ctrl = match last_control {
                    LastControl::Quadratic(ctrl) => reflect(ctrl, self.cursor),
                    _ => self.cursor,
                };
                let end = self.resolve(abs, x, y);
                self.quad_to(ctrl, end)?;
            }
            PathSegment::EllipticalArc {
                abs,
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                x,
                y,
            } => {
                let end = self.resolve(abs, x, y);
                let arc = Arc {
                    rx: rx.abs(),
                    ry: ry.abs(),
                    rotation: x_axis_rotation,
                    large_arc,
                    sweep,
                };
                self.arc_to(&arc, end)?;
            }
            PathSegment::ClosePath { .. } => self.close()?,
        }
        Ok(())
    }

    fn resolve(&self, abs: bool, x: f64, y: f64) -> Point {
        if abs {
            Point::new(x, y)
        } else {
            Point::new(self.cursor.x + x, self.cursor.y + y)
        }
    }

    fn move_to(&mut self, p: Point) {
        self.flush(false);
        self.moved = true;
        self.cursor = p;
        self.start = p;
        self.current.push(p);
    }

    /// Begin drawing: re-opens a subpath at the last start after `Z`.
    fn begin_segment(&mut self) -> Result<(), PathError> {
        if !self.moved {
            return Err(PathError::MissingMoveTo);
        }
        if self.current.is_empty() {
            self.current.push(self.cursor);
        }
        self.drawn = true;
        Ok(())
    }

    fn push(&mut self, p: Point) {
        if self.current.last() != Some(&p) {
            self.current.push(p);
        }
    }

    fn line_to(&mut self, p: Point) -> Result<(), PathError> {
        self.begin_segment()?;
        self.push(p);
        self.cursor = p;
        Ok(())
    }

    fn cubic_to(&mut self, c1: Point, c2: Point, end: Point) -> Result<(), PathError> {
        self.begin_segment()?;
        let p0 = self.cursor;
        for i in 1..=self.segments {
            let t = step(i, self.segments);
            let mt = 1.0 - t;
            let w0 = mt * mt * mt;
            let w1 = 3.0 * mt * mt * t;
            let w2 = 3.0 * mt * t * t;
            let w3 = t * t * t;
            self.push(Point::new(
                w0.mul_add(p0.x, w1.mul_add(c1.x, w2.mul_add(c2.x, w3 * end.x))),
                w0.mul_add(p0.y, w1.mul_add(c1.y, w2.mul_add(c2.y, w3 * end.y))),
            ));
        }
        self.cursor = end;
        self.last_control = LastControl::Cubic(c2);
        Ok(())
    }

    fn quad_to(&mut self, ctrl: Point, end: Point) -> Result<(), PathError> {
        self.begin_segment()?;
        let p0 = self.cursor;
        for i in 1..=self.segments {
            let t = step(i, self.segments);
            let mt = 1.0 - t;
            let w0 = mt * mt;
            let w1 = 2.0 * mt * t;
            let w2 = t * t;
            self.push(Point::new(
                w0.mul_add(p0.x, w1.mul_add(ctrl.x, w2 * end.x)),
                w0.mul_add(p0.y, w1.mul_add(ctrl.y, w2 * end.y)),
            ));
        }
        self.cursor = end;
        self.last_control = LastControl::Quadratic(ctrl);
        Ok(())
    }

    fn arc_to(&mut self, arc: &Arc, end: Point) -> Result<(), PathError> {
        self.begin_segment()?;
        for p in arc.flatten(self.cursor, end, self.segments) {
            self.push(p);
        }
        self.cursor = end;
        Ok(())
    }

    fn close(&mut self) -> Result<(), PathError> {
        if !self.moved {
            return Err(PathError::MissingMoveTo);
        }
        if !self.current.is_empty() {
            self.drawn = true;
            self.push(self.start);
        }
        self.flush(true);
        self.cursor = self.start;
        Ok(())
    }

    fn flush(&mut self, closed: bool) {
        let points = std::mem::take(&mut self.current);
        if self.drawn && !points.is_empty() {
            self.subpaths.push(Subpath { points, closed });
        }
        self.drawn = false;
    }

    fn finish(mut self) -> Vec<Subpath> {
        self.flush(false);
        self.subpaths
    }
}

/// Endpoint-parameterized elliptical arc, as written in path data.
struct Arc {
    rx: f64,
    ry: f64,
    rotation: f64,
    large_arc: bool,
    sweep: bool,
}

impl Arc {
    /// Points along the arc from `from` (exclusive) to `to` (inclusive).
    ///
    /// Converts to centre parameterization, scaling the radii up when they
    /// are too small to span the endpoints.  Zero radii degrade to a line.
    fn flatten(&self, from: Point, to: Point, segments: usize) -> Vec<Point> {
        if self.rx == 0.0 || self.ry == 0.0 || from == to {
            return vec![to];
        }
        let (sin_phi, cos_phi) = self.rotation.to_radians().sin_cos();
        let dx = (from.x - to.x) / 2.0;
        let dy = (from.y - to.y) / 2.0;
        let x1p = cos_phi.mul_add(dx, sin_phi * dy);
        let y1p = (-sin_phi).mul_add(dx, cos_phi * dy);

        let (mut rx, mut ry) = (self.rx, self.ry);
        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            rx *= lambda.sqrt();
            ry *= lambda.sqrt();
        }
        let (rx_sq, ry_sq) = (rx * rx, ry * ry);
        let (x1p_sq, y1p_sq) = (x1p * x1p, y1p * y1p);
        let numerator = rx_sq * ry_sq - rx_sq * y1p_sq - ry_sq * x1p_sq;
        let denominator = rx_sq * y1p_sq + ry_sq * x1p_sq;
        let sq = if denominator > 0.0 {
            (numerator / denominator).max(0.0)
        } else {
            0.0
        };
        let sign = if self.large_arc == self.sweep { -1.0 } else { 1.0 };
        let coef = sign * sq.sqrt();
        let cxp = coef * rx * y1p / ry;
        let cyp = -coef * ry * x1p / rx;
        let cx = cos_phi.mul_add(cxp, -(sin_phi * cyp)) + (from.x + to.x) / 2.0;
        let cy = sin_phi.mul_add(cxp, cos_phi * cyp) + (from.y + to.y) / 2.0;

        let ux = (x1p - cxp) / rx;
        let uy = (y1p - cyp) / ry;
        let vx = (-x1p - cxp) / rx;
        let vy = (-y1p - cyp) / ry;
        let theta = vector_angle(1.0, 0.0, ux, uy);
        let mut delta = vector_angle(ux, uy, vx, vy);
        if !self.sweep && delta > 0.0 {
            delta -= TAU;
        } else if self.sweep && delta < 0.0 {
            delta += TAU;
        }

        let mut points = Vec::with_capacity(segments);
        for i in 1..segments {
            let angle = step(i, segments).mul_add(delta, theta);
            let (sin_a, cos_a) = angle.sin_cos();
            let xr = rx * cos_a;
            let yr = ry * sin_a;
            points.push(Point::new(
                cos_phi.mul_add(xr, -(sin_phi * yr)) + cx,
                sin_phi.mul_add(xr, cos_phi * yr) + cy,
            ));
        }
        // Land exactly on the written endpoint.
        points.push(to);
        points
    }
}

/// Signed angle from vector `u` to vector `v`.
fn vector_angle(ux: f64, uy: f64, vx: f64, vy: f64) -> f64 {
    let dot = ux.mul_add(vx, uy * vy);
    let len = (ux.hypot(uy) * vx.hypot(vy)).max(f64::MIN_POSITIVE);
    let angle = (dot / len).clamp(-1.0, 1.0).acos();
    if ux.mul_add(vy, -(uy * vx)) < 0.0 {
        -angle
    } else {
        angle
    }
}

fn reflect(control: Point, about: Point) -> Point {
    Point::new(2.0f64.mul_add(about.x, -control.x), 2.0f64.mul_add(about.y, -control.y))
}

#[allow(clippy::cast_precision_loss)]
fn step(i: usize, n: usize) -> f64 {
    i as f64 / n as f64
}

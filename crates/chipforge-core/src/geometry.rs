use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Positions closer than this are treated as the same vertex.
pub const POSITION_EPSILON: f64 = 1e-9;

/// A 2D point in feature coordinates (micrometres, y grows down the canvas).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Rigid rotation about `pivot`. Positive angles turn +x towards +y.
    pub fn rotate_about(&self, pivot: &Point, degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        let dx = self.x - pivot.x;
        let dy = self.y - pivot.y;
        Self {
            x: pivot.x + dx * c - dy * s,
            y: pivot.y + dx * s + dy * c,
        }
    }

    fn coincides(&self, other: &Point) -> bool {
        (self.x - other.x).abs() < POSITION_EPSILON && (self.y - other.y).abs() < POSITION_EPSILON
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        })
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow the box by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min: self.min.translate(-margin, -margin),
            max: self.max.translate(margin, margin),
        }
    }

    /// Merge an optional running box with another box.
    pub fn merge(acc: Option<BBox>, next: Option<BBox>) -> Option<BBox> {
        match (acc, next) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        }
    }
}

// ── Contours ─────────────────────────────────────────────────────────

/// A contour vertex. `bulge` describes the segment leaving this vertex:
/// 0 is a straight line, otherwise it is tan(θ/4) of the arc sweep θ
/// (positive sweeps turn from +x towards +y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub bulge: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64, bulge: f64) -> Self {
        Self { x, y, bulge }
    }

    pub fn line(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0)
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Circular arc recovered from a bulge segment.
#[derive(Debug, Clone, Copy)]
struct Arc {
    center: Point,
    radius: f64,
    start_angle: f64,
    sweep: f64,
}

impl Arc {
    fn from_bulge(p0: Point, p1: Point, bulge: f64) -> Option<Self> {
        let chord = p0.distance_to(&p1);
        if bulge.abs() < 1e-12 || chord < POSITION_EPSILON {
            return None;
        }
        let ux = (p1.x - p0.x) / chord;
        let uy = (p1.y - p0.y) / chord;
        // Signed distance from the chord midpoint to the centre, along the left normal.
        let offset = chord * (1.0 - bulge * bulge) / (4.0 * bulge);
        let center = Point::new(
            (p0.x + p1.x) / 2.0 - uy * offset,
            (p0.y + p1.y) / 2.0 + ux * offset,
        );
        Some(Self {
            center,
            radius: chord * (1.0 + bulge * bulge) / (4.0 * bulge.abs()),
            start_angle: (p0.y - center.y).atan2(p0.x - center.x),
            sweep: 4.0 * bulge.atan(),
        })
    }

    fn point_at(&self, t: f64) -> Point {
        let a = self.start_angle + self.sweep * t;
        Point::new(
            self.center.x + self.radius * a.cos(),
            self.center.y + self.radius * a.sin(),
        )
    }

    /// Area between the chord and the arc, signed like the sweep.
    fn segment_area(&self) -> f64 {
        0.5 * self.radius * self.radius * (self.sweep - self.sweep.sin())
    }

    fn contains_angle(&self, angle: f64) -> bool {
        let turn = 2.0 * PI;
        if self.sweep >= 0.0 {
            (angle - self.start_angle).rem_euclid(turn) <= self.sweep
        } else {
            (self.start_angle - angle).rem_euclid(turn) <= -self.sweep
        }
    }

    fn extremes(&self) -> Vec<Point> {
        [0.0, PI / 2.0, PI, 3.0 * PI / 2.0]
            .iter()
            .filter(|a| self.contains_angle(**a))
            .map(|a| {
                Point::new(
                    self.center.x + self.radius * a.cos(),
                    self.center.y + self.radius * a.sin(),
                )
            })
            .collect()
    }

    fn subdivisions(&self, tolerance: f64) -> usize {
        let step = 2.0 * (1.0 - tolerance / self.radius).clamp(-1.0, 1.0).acos();
        (self.sweep.abs() / step).ceil().clamp(1.0, 512.0) as usize
    }
}

/// A closed or open chain of line and arc segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    pub vertices: Vec<Vertex>,
    pub closed: bool,
}

impl Contour {
    pub fn closed(vertices: Vec<Vertex>) -> Self {
        Self {
            vertices,
            closed: true,
        }
    }

    pub fn open(vertices: Vec<Vertex>) -> Self {
        Self {
            vertices,
            closed: false,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// (start, end, bulge) for every segment in drawing order.
    fn segments(&self) -> impl Iterator<Item = (Point, Point, f64)> + '_ {
        let n = self.vertices.len();
        let count = match (self.closed, n) {
            (_, 0) | (_, 1) => 0,
            (true, _) => n,
            (false, _) => n - 1,
        };
        (0..count).map(move |i| {
            let a = &self.vertices[i];
            let b = &self.vertices[(i + 1) % n];
            (a.position(), b.position(), a.bulge)
        })
    }

    /// Signed enclosed area; positive for counter-clockwise contours, 0 when open.
    pub fn signed_area(&self) -> f64 {
        if !self.closed {
            return 0.0;
        }
        self.segments()
            .map(|(a, b, bulge)| {
                let chord = 0.5 * (a.x * b.y - b.x * a.y);
                chord + Arc::from_bulge(a, b, bulge).map_or(0.0, |arc| arc.segment_area())
            })
            .sum()
    }

    pub fn length(&self) -> f64 {
        self.segments()
            .map(|(a, b, bulge)| match Arc::from_bulge(a, b, bulge) {
                Some(arc) => arc.radius * arc.sweep.abs(),
                None => a.distance_to(&b),
            })
            .sum()
    }

    pub fn bbox(&self) -> Option<BBox> {
        let mut points: Vec<Point> = self.vertices.iter().map(Vertex::position).collect();
        for (a, b, bulge) in self.segments() {
            if let Some(arc) = Arc::from_bulge(a, b, bulge) {
                points.extend(arc.extremes());
            }
        }
        BBox::from_points(&points)
    }

    /// Approximate arcs by chords deviating at most `tolerance` from the true curve.
    pub fn flatten(&self, tolerance: f64) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.vertices.len());
        for (a, b, bulge) in self.segments() {
            points.push(a);
            if let Some(arc) = Arc::from_bulge(a, b, bulge) {
                let n = arc.subdivisions(tolerance);
                for k in 1..n {
                    points.push(arc.point_at(k as f64 / n as f64));
                }
            }
        }
        if !self.closed {
            if let Some(last) = self.vertices.last() {
                points.push(last.position());
            }
        }
        points
    }

    /// The same contour traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        let n = self.vertices.len();
        if n == 0 {
            return self.clone();
        }
        let vertices = if self.closed {
            (0..n)
                .map(|j| {
                    let idx = (n - j) % n;
                    let v = self.vertices[idx];
                    Vertex::new(v.x, v.y, -self.vertices[(idx + n - 1) % n].bulge)
                })
                .collect()
        } else {
            (0..n)
                .map(|j| {
                    let v = self.vertices[n - 1 - j];
                    let bulge = if j + 1 < n { -self.vertices[n - 2 - j].bulge } else { 0.0 };
                    Vertex::new(v.x, v.y, bulge)
                })
                .collect()
        };
        Self {
            vertices,
            closed: self.closed,
        }
    }

    fn map_points(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            vertices: self
                .vertices
                .iter()
                .map(|v| {
                    let p = f(v.position());
                    Vertex::new(p.x, p.y, v.bulge)
                })
                .collect(),
            closed: self.closed,
        }
    }
}

// ── Shapes ───────────────────────────────────────────────────────────

/// A fillable region: counter-clockwise outlines minus clockwise holes.
/// Open contours are carried in `outlines` as stroke-only paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub outlines: Vec<Contour>,
    pub holes: Vec<Contour>,
}

impl Shape {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_contour(contour: Contour) -> Self {
        Self {
            outlines: vec![contour],
            holes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outlines.is_empty() && self.holes.is_empty()
    }

    pub fn contours(&self) -> impl Iterator<Item = &Contour> {
        self.outlines.iter().chain(self.holes.iter())
    }

    pub fn contour_count(&self) -> usize {
        self.outlines.len() + self.holes.len()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.contours().flat_map(|c| c.vertices.iter())
    }

    pub fn area(&self) -> f64 {
        let outer: f64 = self.outlines.iter().map(|c| c.signed_area().abs()).sum();
        let inner: f64 = self.holes.iter().map(|c| c.signed_area().abs()).sum();
        outer - inner
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.outlines
            .iter()
            .fold(None, |acc, c| BBox::merge(acc, c.bbox()))
    }

    pub fn rotate(&self, degrees: f64, pivot: Point) -> Self {
        self.map_points(|p| p.rotate_about(&pivot, degrees))
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        self.map_points(|p| p.translate(dx, dy))
    }

    fn map_points(&self, f: impl Fn(Point) -> Point + Copy) -> Self {
        Self {
            outlines: self.outlines.iter().map(|c| c.map_points(f)).collect(),
            holes: self.holes.iter().map(|c| c.map_points(f)).collect(),
        }
    }
}

// ── Primitives ───────────────────────────────────────────────────────

fn quarter_turn_bulge() -> f64 {
    (PI / 8.0).tan()
}

/// Drop zero-length line segments from a closed vertex ring.
fn drop_degenerate(vertices: Vec<Vertex>) -> Vec<Vertex> {
    let n = vertices.len();
    (0..n)
        .filter(|&i| {
            let next = &vertices[(i + 1) % n];
            !(vertices[i].bulge == 0.0 && vertices[i].position().coincides(&next.position()))
        })
        .map(|i| vertices[i])
        .collect()
}

/// Axis-aligned rectangle with its minimum corner at `origin`, optionally with
/// rounded corners. The corner radius is clamped to half the shorter side.
pub fn rectangle(origin: Point, size: (f64, f64), corner_radius: f64) -> Shape {
    let (w, h) = size;
    if !(w > 0.0 && h > 0.0) {
        return Shape::empty();
    }
    let hw = w / 2.0;
    let hh = h / 2.0;
    let cx = origin.x + hw;
    let cy = origin.y + hh;
    let r = corner_radius.min(hw).min(hh).max(0.0);

    if r == 0.0 {
        return Shape::from_contour(Contour::closed(vec![
            Vertex::line(cx - hw, cy - hh),
            Vertex::line(cx + hw, cy - hh),
            Vertex::line(cx + hw, cy + hh),
            Vertex::line(cx - hw, cy + hh),
        ]));
    }

    let b = quarter_turn_bulge();
    let vertices = vec![
        Vertex::new(cx + hw - r, cy - hh, b),
        Vertex::line(cx + hw, cy - hh + r),
        Vertex::new(cx + hw, cy + hh - r, b),
        Vertex::line(cx + hw - r, cy + hh),
        Vertex::new(cx - hw + r, cy + hh, b),
        Vertex::line(cx - hw, cy + hh - r),
        Vertex::new(cx - hw, cy - hh + r, b),
        Vertex::line(cx - hw + r, cy - hh),
    ];
    Shape::from_contour(Contour::closed(drop_degenerate(vertices)))
}

/// Axis-aligned rectangle spanning two arbitrary opposite corners.
pub fn rectangle_between(a: Point, b: Point) -> Shape {
    let origin = Point::new(a.x.min(b.x), a.y.min(b.y));
    rectangle(origin, ((a.x - b.x).abs(), (a.y - b.y).abs()), 0.0)
}

/// Full circle, stored as two half-turn arcs.
pub fn circle(center: Point, radius: f64) -> Shape {
    if !(radius > 0.0) {
        return Shape::empty();
    }
    Shape::from_contour(Contour::closed(vec![
        Vertex::new(center.x - radius, center.y, 1.0),
        Vertex::new(center.x + radius, center.y, 1.0),
    ]))
}

/// Straight-edged polygon through `points`. Closed polygons are normalised to
/// counter-clockwise winding; degenerate input yields an empty shape.
pub fn polygon(points: &[Point], closed: bool) -> Shape {
    let vertices: Vec<Vertex> = points.iter().map(|p| Vertex::line(p.x, p.y)).collect();
    if closed {
        let vertices = drop_degenerate(vertices);
        if vertices.len() < 3 {
            return Shape::empty();
        }
        let contour = Contour::closed(vertices);
        let area = contour.signed_area();
        if area.abs() < POSITION_EPSILON {
            return Shape::empty();
        }
        if area < 0.0 {
            return Shape::from_contour(contour.reversed());
        }
        Shape::from_contour(contour)
    } else {
        let contour = Contour::open(vertices);
        if contour.vertex_count() < 2 || contour.length() < POSITION_EPSILON {
            return Shape::empty();
        }
        Shape::from_contour(contour)
    }
}

/// Rigid rotation of a whole shape about `pivot`.
pub fn rotate(shape: &Shape, degrees: f64, pivot: Point) -> Shape {
    shape.rotate(degrees, pivot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_point_rotation_quarter_turn() {
        let p = Point::new(10.0, 0.0).rotate_about(&Point::new(0.0, 0.0), 90.0);
        assert!(p.x.abs() < 1e-10);
        assert!((p.y - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = BBox::new(Point::new(5.0, 5.0), Point::new(15.0, 15.0));
        let c = BBox::new(Point::new(20.0, 20.0), Point::new(30.0, 30.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!a.expand(4.0).intersects(&c));
        assert!(a.expand(5.0).intersects(&c.expand(5.0)));
    }

    #[test]
    fn test_rectangle_area_and_bbox() {
        let r = rectangle(Point::new(-5.0, -2.0), (10.0, 4.0), 0.0);
        assert!((r.area() - 40.0).abs() < 1e-10);
        let bb = r.bbox().unwrap();
        assert_eq!(bb.min, Point::new(-5.0, -2.0));
        assert_eq!(bb.max, Point::new(5.0, 2.0));
        assert!(r.outlines[0].signed_area() > 0.0);
    }

    #[test]
    fn test_rounded_rectangle_area() {
        let r = rectangle(Point::new(0.0, 0.0), (10.0, 10.0), 2.0);
        let expected = 100.0 - (4.0 - PI) * 4.0;
        assert!((r.area() - expected).abs() < 1e-9);
        let bb = r.bbox().unwrap();
        assert!((bb.width() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_stadium_drops_zero_length_edges() {
        // Radius equal to half the width turns the short sides into semicircles.
        let r = rectangle(Point::new(0.0, 0.0), (4.0, 20.0), 2.0);
        assert_eq!(r.outlines[0].vertex_count(), 6);
        let expected = 4.0 * 16.0 + PI * 4.0;
        assert!((r.area() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_circle_area_and_bbox() {
        let c = circle(Point::new(1.0, 1.0), 3.0);
        assert!((c.area() - PI * 9.0).abs() < 1e-9);
        let bb = c.bbox().unwrap();
        assert!((bb.min.y + 2.0).abs() < 1e-9);
        assert!((bb.max.y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_primitives_are_empty() {
        assert!(circle(Point::origin(), 0.0).is_empty());
        assert!(rectangle(Point::origin(), (0.0, 5.0), 0.0).is_empty());
        assert!(polygon(&[Point::origin(), Point::new(1.0, 1.0)], true).is_empty());
        assert!(polygon(&[Point::origin(), Point::origin()], false).is_empty());
    }

    #[test]
    fn test_polygon_normalises_winding() {
        let cw = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
        ];
        let shape = polygon(&cw, true);
        assert!(shape.outlines[0].signed_area() > 0.0);
        assert!((shape.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reversed_circle_keeps_area_magnitude() {
        let c = circle(Point::origin(), 2.0);
        let rev = c.outlines[0].reversed();
        assert!((rev.signed_area() + PI * 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_flatten_circle_within_tolerance() {
        let c = circle(Point::new(0.0, 0.0), 100.0);
        let pts = c.outlines[0].flatten(0.5);
        assert!(pts.len() > 16);
        for p in &pts {
            assert!((p.distance_to(&Point::origin()) - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rotate_half_turn_about_pivot() {
        let r = rectangle(Point::new(0.0, 0.0), (2.0, 1.0), 0.0);
        let rotated = rotate(&r, 180.0, Point::new(0.0, 0.0));
        let bb = rotated.bbox().unwrap();
        assert!((bb.min.x + 2.0).abs() < 1e-9);
        assert!((bb.min.y + 1.0).abs() < 1e-9);
        assert!((rotated.area() - r.area()).abs() < 1e-9);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_rotation_round_trip(
                x in -5000.0f64..5000.0,
                y in -5000.0f64..5000.0,
                r in 1.0f64..2000.0,
                deg in -360.0f64..360.0,
                px in -1000.0f64..1000.0,
                py in -1000.0f64..1000.0,
            ) {
                let pivot = Point::new(px, py);
                let shape = rectangle(Point::new(x, y), (r, r * 0.5), r * 0.1);
                let back = rotate(&rotate(&shape, deg, pivot), -deg, pivot);
                for (a, b) in shape.vertices().zip(back.vertices()) {
                    prop_assert!((a.x - b.x).abs() < 1e-6);
                    prop_assert!((a.y - b.y).abs() < 1e-6);
                    prop_assert!((a.bulge - b.bulge).abs() < 1e-12);
                }
            }
        }
    }
}

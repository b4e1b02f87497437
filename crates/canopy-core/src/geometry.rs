//! Planar geometry: polygons, buffers, containment and rigid motions.
//! All coordinates are projected units (metres in the reference data).

use serde::{Deserialize, Serialize};

/// Number of vertices used to approximate a circular buffer.
pub const DEFAULT_CIRCLE_SEGMENTS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ── Bounding box ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    fn extend(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Whether `other` lies entirely inside this box.
    pub fn contains_bbox(&self, other: &BBox) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }
}

// ── Polygon ───────────────────────────────────────────────────────────────────

/// A polygon with one exterior ring and optional holes. Rings are implicitly
/// closed; a repeated closing vertex is tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<Point>,
    #[serde(default)]
    pub holes: Vec<Vec<Point>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Point>) -> Self {
        Self { exterior, holes: Vec::new() }
    }

    /// Axis-aligned rectangle.
    pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(vec![
            Point::new(min_x, min_y),
            Point::new(max_x, min_y),
            Point::new(max_x, max_y),
            Point::new(min_x, max_y),
        ])
    }

    /// Regular `segments`-gon approximating a circle of `radius` around `center`.
    pub fn circle(center: Point, radius: f64, segments: usize) -> Self {
        let n = segments.max(3);
        let ring = (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * std::f64::consts::TAU;
                Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
            })
            .collect();
        Self::new(ring)
    }

    pub fn is_degenerate(&self) -> bool {
        self.exterior.len() < 3
    }

    pub fn bbox(&self) -> BBox {
        let mut b = BBox::empty();
        for &p in &self.exterior {
            b.extend(p);
        }
        b
    }

    /// Even-odd containment over exterior and holes.
    pub fn contains(&self, p: Point) -> bool {
        if !ring_contains(&self.exterior, p) {
            return false;
        }
        !self.holes.iter().any(|h| ring_contains(h, p))
    }

    /// Area (exterior minus holes), always non-negative.
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| signed_area(h).abs()).sum();
        (signed_area(&self.exterior).abs() - holes).max(0.0)
    }

    /// Area centroid of the exterior ring; falls back to the vertex mean for
    /// zero-area rings.
    pub fn centroid(&self) -> Point {
        ring_centroid(&self.exterior)
    }

    fn rings(&self) -> impl Iterator<Item = &Vec<Point>> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    fn map_points(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            exterior: self.exterior.iter().map(|&p| f(p)).collect(),
            holes: self.holes.iter().map(|h| h.iter().map(|&p| f(p)).collect()).collect(),
        }
    }
}

// ── MultiPolygon ──────────────────────────────────────────────────────────────

/// The geometry type regions carry: one or more polygons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPolygon(pub Vec<Polygon>);

impl From<Polygon> for MultiPolygon {
    fn from(p: Polygon) -> Self {
        Self(vec![p])
    }
}

impl MultiPolygon {
    pub fn polygons(&self) -> &[Polygon] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Polygon::is_degenerate)
    }

    pub fn bbox(&self) -> BBox {
        let mut b = BBox::empty();
        for p in &self.0 {
            for &v in &p.exterior {
                b.extend(v);
            }
        }
        b
    }

    pub fn contains(&self, p: Point) -> bool {
        self.0.iter().any(|poly| poly.contains(p))
    }

    pub fn area(&self) -> f64 {
        self.0.iter().map(Polygon::area).sum()
    }

    /// Area-weighted centroid of the member polygons.
    pub fn centroid(&self) -> Point {
        let (mut ax, mut ay, mut total) = (0.0, 0.0, 0.0);
        for p in &self.0 {
            let a = signed_area(&p.exterior).abs();
            let c = p.centroid();
            ax += c.x * a;
            ay += c.y * a;
            total += a;
        }
        if total > 0.0 {
            return Point::new(ax / total, ay / total);
        }
        let pts: Vec<Point> = self.0.iter().flat_map(|p| p.exterior.iter().copied()).collect();
        vertex_mean(&pts)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self(self.0.iter().map(|p| p.map_points(|v| Point::new(v.x + dx, v.y + dy))).collect())
    }

    /// Rotate counter-clockwise by `angle_deg` degrees about `origin`.
    pub fn rotate(&self, angle_deg: f64, origin: Point) -> Self {
        let (s, c) = angle_deg.to_radians().sin_cos();
        Self(
            self.0
                .iter()
                .map(|p| {
                    p.map_points(|v| {
                        let (dx, dy) = (v.x - origin.x, v.y - origin.y);
                        Point::new(origin.x + dx * c - dy * s, origin.y + dx * s + dy * c)
                    })
                })
                .collect(),
        )
    }

    /// Whether the two geometries share any point.
    pub fn intersects(&self, other: &MultiPolygon) -> bool {
        if !self.bbox().intersects(&other.bbox()) {
            return false;
        }
        let any_vertex_in = |a: &MultiPolygon, b: &MultiPolygon| {
            a.0.iter().flat_map(|p| p.exterior.iter()).any(|&v| b.contains(v))
        };
        any_vertex_in(self, other) || any_vertex_in(other, self) || edges_cross(self, other)
    }

    /// Whether every point of `self` lies inside `other`.
    pub fn within(&self, other: &MultiPolygon) -> bool {
        let all_vertices_in = self
            .0
            .iter()
            .flat_map(|p| p.rings())
            .flat_map(|r| r.iter())
            .all(|&v| other.contains(v));
        // A hole of `other` enclosed by `self` leaves no vertex or crossing behind.
        let encloses_hole = other
            .0
            .iter()
            .flat_map(|p| p.holes.iter())
            .flat_map(|h| h.iter())
            .any(|&v| self.contains(v));
        all_vertices_in && !encloses_hole && !edges_cross(self, other)
    }
}

// ── Ring helpers ──────────────────────────────────────────────────────────────

fn ring_contains(ring: &[Point], p: Point) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn signed_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut s = 0.0;
    for i in 0..n {
        let (a, b) = (ring[i], ring[(i + 1) % n]);
        s += a.x * b.y - b.x * a.y;
    }
    s / 2.0
}

fn ring_centroid(ring: &[Point]) -> Point {
    let a = signed_area(ring);
    if a.abs() < 1e-12 {
        return vertex_mean(ring);
    }
    let n = ring.len();
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let (p, q) = (ring[i], ring[(i + 1) % n]);
        let cross = p.x * q.y - q.x * p.y;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    Point::new(cx / (6.0 * a), cy / (6.0 * a))
}

fn vertex_mean(pts: &[Point]) -> Point {
    if pts.is_empty() {
        return Point::new(0.0, 0.0);
    }
    let n = pts.len() as f64;
    Point::new(
        pts.iter().map(|p| p.x).sum::<f64>() / n,
        pts.iter().map(|p| p.y).sum::<f64>() / n,
    )
}

fn segments(m: &MultiPolygon) -> Vec<(Point, Point)> {
    m.0.iter()
        .flat_map(|p| p.rings())
        .filter(|r| r.len() >= 2)
        .flat_map(|r| (0..r.len()).map(move |i| (r[i], r[(i + 1) % r.len()])))
        .collect()
}

/// Proper crossing of any edge of `a` with any edge of `b` (touching ends do
/// not count).
fn edges_cross(a: &MultiPolygon, b: &MultiPolygon) -> bool {
    let sb = segments(b);
    segments(a)
        .iter()
        .any(|&(p1, p2)| sb.iter().any(|&(q1, q2)| segments_cross(p1, p2, q1, q2)))
}

fn segments_cross(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let orient = |a: Point, b: Point, c: Point| (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

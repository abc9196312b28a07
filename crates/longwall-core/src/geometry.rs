//! Planar geometry kernel: polygon predicates, segment projection,
//! axis-aligned rectangles, boundary-side traces, and frame rotation.
//! All coordinate math uses f64 in a unit-less local system.

use serde::{Deserialize, Serialize};

/// A point in the planar local coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// An axis-aligned rectangle, used in the packing frame and for locked panels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Build from a corner and non-negative extents.
    pub fn from_origin(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Corners in counter-clockwise order starting at the minimum corner.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ]
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

/// Separating-axis overlap test. Touching at an edge counts as non-overlap.
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.min_x < b.max_x && b.min_x < a.max_x && a.min_y < b.max_y && b.min_y < a.max_y
}

/// Ray-cast point-in-polygon with the odd-parity rule. Points exactly on an
/// edge may land on either side; the answer is deterministic for identical
/// inputs.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
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

/// Project `p` onto the segment `[a, b]`, clamping the parameter to [0, 1].
pub fn project_on_segment(p: Point, a: Point, b: Point) -> Point {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return a;
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    Point::new(a.x + t * dx, a.y + t * dy)
}

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    p.distance_to(project_on_segment(p, a, b))
}

/// Shortest distance from `p` to the closed ring of the polygon.
pub fn distance_to_boundary(p: Point, polygon: &[Point]) -> f64 {
    let n = polygon.len();
    let mut best = f64::INFINITY;
    for i in 0..n {
        let d = distance_to_segment(p, polygon[i], polygon[(i + 1) % n]);
        if d < best {
            best = d;
        }
    }
    best
}

/// Axis-aligned extents `(min_x, max_x, min_y, max_y)`.
pub fn polygon_extents(polygon: &[Point]) -> (f64, f64, f64, f64) {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in polygon {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    (min_x, max_x, min_y, max_y)
}

/// Vertex-mean centroid. Used only for rotation pivots and tie-breaks.
pub fn polygon_centroid(polygon: &[Point]) -> Point {
    let n = polygon.len().max(1) as f64;
    let sx: f64 = polygon.iter().map(|p| p.x).sum();
    let sy: f64 = polygon.iter().map(|p| p.y).sum();
    Point::new(sx / n, sy / n)
}

/// A compass side of the mining area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    North,
    South,
    East,
    West,
}

const SIDE_TOL: f64 = 1e-6;

/// The subsequence of polygon vertices lying on the extremum of `side`,
/// ordered along the side. Falls back to the two most extreme vertices when
/// fewer than two lie exactly on the extremum.
pub fn boundary_line(polygon: &[Point], side: Side) -> Vec<Point> {
    let (min_x, max_x, min_y, max_y) = polygon_extents(polygon);
    let on_side = |p: &Point| match side {
        Side::North => (p.y - max_y).abs() <= SIDE_TOL,
        Side::South => (p.y - min_y).abs() <= SIDE_TOL,
        Side::East => (p.x - max_x).abs() <= SIDE_TOL,
        Side::West => (p.x - min_x).abs() <= SIDE_TOL,
    };
    let mut line: Vec<Point> = polygon.iter().copied().filter(on_side).collect();
    if line.len() < 2 {
        // Fall back to the two vertices closest to the extremum.
        let mut sorted: Vec<Point> = polygon.to_vec();
        sorted.sort_by(|a, b| {
            let (ka, kb) = match side {
                Side::North => (-a.y, -b.y),
                Side::South => (a.y, b.y),
                Side::East => (-a.x, -b.x),
                Side::West => (a.x, b.x),
            };
            ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
        });
        line = sorted.into_iter().take(2).collect();
    }
    // Order along the side so the trace reads as a polyline.
    match side {
        Side::North | Side::South => {
            line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        }
        Side::East | Side::West => {
            line.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
        }
    }
    line
}

pub fn polyline_length(path: &[Point]) -> f64 {
    path.windows(2).map(|w| w[0].distance_to(w[1])).sum()
}

/// The point on the polyline closest to `p`.
pub fn closest_point_on_polyline(p: Point, path: &[Point]) -> Point {
    if path.len() < 2 {
        return path.first().copied().unwrap_or(p);
    }
    let mut best = path[0];
    let mut best_d = f64::INFINITY;
    for w in path.windows(2) {
        let q = project_on_segment(p, w[0], w[1]);
        let d = p.distance_to(q);
        if d < best_d {
            best_d = d;
            best = q;
        }
    }
    best
}

/// Rotate `p` by `angle` radians counter-clockwise about `pivot`.
pub fn rotate_about(p: Point, angle: f64, pivot: Point) -> Point {
    let (sin, cos) = angle.sin_cos();
    let dx = p.x - pivot.x;
    let dy = p.y - pivot.y;
    Point::new(
        pivot.x + dx * cos - dy * sin,
        pivot.y + dx * sin + dy * cos,
    )
}

//! Geometry primitives backing line/path clipping: points, segments and the
//! target rectangle, with orthogonal projection and pairwise intersection.

/// Tolerance for containment and intersection tests. Page coordinates are
/// quantized to millipoints at emission, so anything below this is noise.
const EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        libm::hypotf(self.x - other.x, self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Intersection of two finite segments. Parallel or collinear pairs
    /// yield nothing; a collinear overlap is handled upstream by the
    /// endpoint containment test.
    pub fn intersect(self, other: Segment) -> Option<Point> {
        let r = (self.end.x - self.start.x, self.end.y - self.start.y);
        let s = (other.end.x - other.start.x, other.end.y - other.start.y);
        let denom = r.0 * s.1 - r.1 * s.0;
        if denom.abs() < EPSILON * EPSILON {
            return None;
        }
        let qp = (other.start.x - self.start.x, other.start.y - self.start.y);
        let t = (qp.0 * s.1 - qp.1 * s.0) / denom;
        let u = (qp.0 * r.1 - qp.1 * r.0) / denom;
        if !(-EPSILON..=1.0 + EPSILON).contains(&t) || !(-EPSILON..=1.0 + EPSILON).contains(&u) {
            return None;
        }
        Some(Point::new(self.start.x + t * r.0, self.start.y + t * r.1))
    }
}

/// Axis-aligned rectangle stored as normalized min/max corners, so the
/// page-space axis flip cannot produce an inside-out rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeomRect {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl GeomRect {
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x_min: x0.min(x1),
            y_min: y0.min(y1),
            x_max: x0.max(x1),
            y_max: y0.max(y1),
        }
    }

    /// Orthogonal projection onto the rectangle (clamped to the boundary
    /// for outside points, identity for inside ones).
    pub fn project(self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.x_min, self.x_max),
            p.y.clamp(self.y_min, self.y_max),
        )
    }

    /// Membership test: a point is inside iff it coincides with its own
    /// orthogonal projection.
    pub fn contains(self, p: Point) -> bool {
        p.distance(self.project(p)) <= EPSILON
    }

    pub fn edges(self) -> [Segment; 4] {
        let tl = Point::new(self.x_min, self.y_max);
        let tr = Point::new(self.x_max, self.y_max);
        let bl = Point::new(self.x_min, self.y_min);
        let br = Point::new(self.x_max, self.y_min);
        [
            Segment::new(bl, br),
            Segment::new(br, tr),
            Segment::new(tr, tl),
            Segment::new(tl, bl),
        ]
    }

    /// All boundary intersections of a segment, in edge order.
    pub fn intersections(self, seg: Segment) -> Vec<Point> {
        let mut out = Vec::new();
        for edge in self.edges() {
            if let Some(p) = seg.intersect(edge) {
                out.push(p);
            }
        }
        out
    }
}

/// Visible sub-segment of `seg` against `rect`, or `None` when the segment
/// lies entirely outside. Endpoints already inside are kept as-is; each
/// outside endpoint is replaced by the nearest boundary intersection (first
/// minimal candidate on ties).
pub fn clip_segment(seg: Segment, rect: GeomRect) -> Option<Segment> {
    let start_in = rect.contains(seg.start);
    let end_in = rect.contains(seg.end);
    if start_in && end_in {
        return Some(seg);
    }

    let hits = rect.intersections(seg);
    if hits.is_empty() {
        return None;
    }

    let nearest = |anchor: Point| -> Point {
        let mut best = hits[0];
        let mut best_d = anchor.distance(best);
        for &p in &hits[1..] {
            let d = anchor.distance(p);
            if d < best_d {
                best = p;
                best_d = d;
            }
        }
        best
    };

    let start = if start_in { seg.start } else { nearest(seg.start) };
    let end = if end_in { seg.end } else { nearest(seg.end) };
    Some(Segment::new(start, end))
}

//! Segment primitives shared by highway snapping and grid collision.
//!
//! The containment tests are deliberately approximate (distance from
//! endpoints rather than exact parametric clamping); the growth
//! automaton's decision tables depend on these exact tolerances.

use bevy::prelude::*;

/// Ordered pair of endpoints; immutable once committed to the index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: Vec2,
    pub b: Vec2,
}

impl Segment {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    pub fn length(&self) -> f32 {
        self.a.distance(self.b)
    }

    pub fn midpoint(&self) -> Vec2 {
        (self.a + self.b) * 0.5
    }
}

/// Sentinel slope for vertical segments.
const STEEP: f32 = 100_000.0;
/// Sentinel slope for perpendiculars of horizontal segments.
const STEEP_PERP: f32 = 10_000.0;

/// Approximate vector equality, for matching recorded points.
pub fn approx_eq(a: Vec2, b: Vec2) -> bool {
    (a - b).abs().max_element() < 1e-4
}

/// Whether `point` lies on `segment`: collinear within epsilon and
/// projecting inside the endpoint span.
pub fn point_on_segment(point: Vec2, segment: &Segment) -> bool {
    let a = segment.a;
    let b = segment.b;
    let cross = (point.y - a.y) * (b.x - a.x) - (point.x - a.x) * (b.y - a.y);
    if cross.abs() > 0.01 {
        return false;
    }
    let dot = (point.x - a.x) * (b.x - a.x) + (point.y - a.y) * (b.y - a.y);
    if dot < 0.0 {
        return false;
    }
    dot <= (b - a).length_squared()
}

/// Closest point on `segment` to `point`, snapping to an endpoint when
/// the perpendicular foot falls outside the span or within one unit of
/// an endpoint.
pub fn closest_point_on_segment(point: Vec2, segment: &Segment) -> Vec2 {
    let a = segment.a;
    let b = segment.b;
    // Segment as y = m*x + c, perpendicular through `point` as y = pm*x + pc.
    let m = if b.x - a.x == 0.0 {
        STEEP
    } else {
        (b.y - a.y) / (b.x - a.x)
    };
    let c = a.y - m * a.x;
    let pm = if m == 0.0 { STEEP_PERP } else { -1.0 / m };
    let pc = point.y - pm * point.x;

    let x = (pc - c) / (m - pm);
    let y = m * x + c;
    if (x > a.x && x > b.x) || (x < a.x && x < b.x) || (y > a.y && y > b.y) || (y < a.y && y < b.y) {
        return if point.distance(a) > point.distance(b) {
            b
        } else {
            a
        };
    }
    let target = Vec2::new(x, y);
    if target.distance(a) < 1.0 {
        return a;
    }
    if target.distance(b) < 1.0 {
        return b;
    }
    target
}

/// Distance from `r1.a` to the point where `r1` crosses `r2`, if they
/// intersect. Segments chained end to start count as intersecting at
/// `r1`'s full length.
pub fn intersection_distance(r1: &Segment, r2: &Segment) -> Option<f32> {
    if approx_eq(r1.b, r2.a) || approx_eq(r1.b, r2.b) {
        return Some(r1.length());
    }
    let m1 = if r1.b.x - r1.a.x == 0.0 {
        STEEP
    } else {
        (r1.b.y - r1.a.y) / (r1.b.x - r1.a.x)
    };
    let c1 = r1.a.y - m1 * r1.a.x;

    let m2 = if r2.b.x - r2.a.x == 0.0 {
        STEEP
    } else {
        (r2.b.y - r2.a.y) / (r2.b.x - r2.a.x)
    };
    let c2 = r2.a.y - m2 * r2.a.x;

    if m1 - m2 == 0.0 {
        return None;
    }
    let x = (c2 - c1) / (m1 - m2);
    let y = m1 * x + c1;
    let point = Vec2::new(x, y);
    let d1 = r1.length();
    let d2 = r2.length();
    if point.distance(r1.a) <= d1
        && point.distance(r1.b) <= d1
        && point.distance(r2.a) <= d2
        && point.distance(r2.b) <= d2
    {
        return Some(r1.a.distance(point));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn point_on_segment_accepts_interior_points() {
        let seg = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0));
        assert!(point_on_segment(Vec2::new(2.0, 0.0), &seg));
        assert!(point_on_segment(Vec2::new(0.0, 0.0), &seg));
        assert!(point_on_segment(Vec2::new(4.0, 0.0), &seg));
    }

    #[test]
    fn point_on_segment_rejects_offsets_and_overshoots() {
        let seg = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0));
        assert!(!point_on_segment(Vec2::new(2.0, 1.0), &seg));
        assert!(!point_on_segment(Vec2::new(-1.0, 0.0), &seg));
        assert!(!point_on_segment(Vec2::new(5.0, 0.0), &seg));
    }

    #[test]
    fn closest_point_projects_onto_long_segments() {
        let seg = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        let closest = closest_point_on_segment(Vec2::new(5.0, 3.0), &seg);
        assert!(closest.distance(Vec2::new(5.0, 0.0)) < 0.05);
    }

    #[test]
    fn closest_point_snaps_near_endpoints() {
        let seg = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        // Foot within one unit of an endpoint collapses onto it.
        let closest = closest_point_on_segment(Vec2::new(0.5, 2.0), &seg);
        assert_eq!(closest, seg.a);
        // Foot beyond the span returns the nearer endpoint.
        let closest = closest_point_on_segment(Vec2::new(14.0, 2.0), &seg);
        assert_eq!(closest, seg.b);
    }

    #[test]
    fn closest_point_handles_vertical_segments() {
        let seg = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 8.0));
        let closest = closest_point_on_segment(Vec2::new(3.0, 4.0), &seg);
        assert!(closest.distance(Vec2::new(0.0, 4.0)) < 0.05);
    }

    #[test]
    fn crossing_segments_report_the_cut_distance() {
        let r1 = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(6.0, 0.0));
        let r2 = Segment::new(Vec2::new(2.0, -3.0), Vec2::new(2.0, 3.0));
        let d = intersection_distance(&r1, &r2).expect("segments cross");
        assert!((d - 2.0).abs() < 0.05);
    }

    #[test]
    fn parallel_segments_never_intersect() {
        let r1 = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(6.0, 0.0));
        let r2 = Segment::new(Vec2::new(0.0, 2.0), Vec2::new(6.0, 2.0));
        assert_eq!(intersection_distance(&r1, &r2), None);
    }

    #[test]
    fn chained_segments_intersect_at_full_length() {
        let r1 = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(3.0, 4.0));
        let r2 = Segment::new(Vec2::new(3.0, 4.0), Vec2::new(9.0, 4.0));
        assert_eq!(intersection_distance(&r1, &r2), Some(5.0));
    }

    #[test]
    fn disjoint_segments_report_no_intersection() {
        let r1 = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0));
        let r2 = Segment::new(Vec2::new(5.0, -3.0), Vec2::new(5.0, 3.0));
        assert_eq!(intersection_distance(&r1, &r2), None);
    }

    #[test]
    fn random_crossings_recover_the_construction_point() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let cross = Vec2::new(rng.gen_range(10.0..90.0), rng.gen_range(10.0..90.0));
            // Angles clear of the vertical so neither slope degenerates,
            // and clearly apart so the solve is stable.
            let angle1: f32 = rng.gen_range(1.65..2.95);
            let angle2 = angle1 + rng.gen_range(0.4..1.2);
            let dir1 = Vec2::new(angle1.cos(), angle1.sin());
            let dir2 = Vec2::new(angle2.cos(), angle2.sin());
            let before = rng.gen_range(1.0..5.0);
            let after = rng.gen_range(1.0..5.0);
            let r1 = Segment::new(cross - dir1 * before, cross + dir1 * after);
            let r2 = Segment::new(cross - dir2 * 4.0, cross + dir2 * 4.0);

            let d = intersection_distance(&r1, &r2).expect("constructed to cross");
            assert!(
                (d - before).abs() < 0.1,
                "expected cut at {before}, got {d}"
            );
        }
    }
}

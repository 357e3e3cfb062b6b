//! Planar outlines built from line and Bézier segments.

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Vec2),
    Quadratic { control: Vec2, to: Vec2 },
    Cubic { control1: Vec2, control2: Vec2, to: Vec2 },
}

impl Segment {
    fn end(&self) -> Vec2 {
        match *self {
            Segment::Line(to) => to,
            Segment::Quadratic { to, .. } | Segment::Cubic { to, .. } => to,
        }
    }
}

/// One closed contour.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub start: Vec2,
    pub segments: Vec<Segment>,
}

impl Path {
    /// Samples the contour; curves are split into `divisions` pieces.
    ///
    /// The result has no repeated consecutive points and does not repeat the
    /// first point at the end.
    pub fn points(&self, divisions: u32) -> Vec<Vec2> {
        let divisions = divisions.max(1);
        let mut points = vec![self.start];
        let mut from = self.start;
        for segment in &self.segments {
            match *segment {
                Segment::Line(to) => push_distinct(&mut points, to),
                Segment::Quadratic { control, to } => {
                    for step in 1..=divisions {
                        let t = step as f32 / divisions as f32;
                        push_distinct(&mut points, quadratic(from, control, to, t));
                    }
                }
                Segment::Cubic {
                    control1,
                    control2,
                    to,
                } => {
                    for step in 1..=divisions {
                        let t = step as f32 / divisions as f32;
                        push_distinct(&mut points, cubic(from, control1, control2, to, t));
                    }
                }
            }
            from = segment.end();
        }
        while points.len() > 1 && points.last() == points.first() {
            points.pop();
        }
        points
    }
}

fn push_distinct(points: &mut Vec<Vec2>, point: Vec2) {
    if points.last() != Some(&point) {
        points.push(point);
    }
}

fn quadratic(p0: Vec2, p1: Vec2, p2: Vec2, t: f32) -> Vec2 {
    let k = 1.0 - t;
    p0 * (k * k) + p1 * (2.0 * k * t) + p2 * (t * t)
}

fn cubic(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let k = 1.0 - t;
    p0 * (k * k * k) + p1 * (3.0 * k * k * t) + p2 * (3.0 * k * t * t) + p3 * (t * t * t)
}

/// Accumulates contours from move/line/curve commands.
#[derive(Debug, Default)]
pub struct PathBuilder {
    paths: Vec<Path>,
    current: Option<Path>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, point: Vec2) {
        self.close();
        self.current = Some(Path {
            start: point,
            segments: Vec::new(),
        });
    }

    pub fn line_to(&mut self, to: Vec2) {
        self.push(Segment::Line(to));
    }

    pub fn quadratic_to(&mut self, control: Vec2, to: Vec2) {
        self.push(Segment::Quadratic { control, to });
    }

    pub fn cubic_to(&mut self, control1: Vec2, control2: Vec2, to: Vec2) {
        self.push(Segment::Cubic {
            control1,
            control2,
            to,
        });
    }

    fn push(&mut self, segment: Segment) {
        // A drawing command without a preceding move starts at the origin.
        let path = self.current.get_or_insert_with(|| Path {
            start: Vec2::ZERO,
            segments: Vec::new(),
        });
        path.segments.push(segment);
    }

    fn close(&mut self) {
        if let Some(path) = self.current.take() {
            if !path.segments.is_empty() {
                self.paths.push(path);
            }
        }
    }

    pub fn finish(mut self) -> Vec<Path> {
        self.close();
        self.paths
    }
}

/// Signed area, positive for counter-clockwise winding (y up).
pub fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let p = points[(i + n - 1) % n];
        let q = points[i];
        area += p.x * q.y - q.x * p.y;
    }
    area * 0.5
}

pub fn is_clockwise(points: &[Vec2]) -> bool {
    signed_area(points) < 0.0
}

/// Even-odd point in polygon test.
pub fn contains(polygon: &[Vec2], point: Vec2) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > point.y) != (b.y > point.y)
            && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// A filled outline with zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub outline: Vec<Vec2>,
    pub holes: Vec<Vec<Vec2>>,
}

/// Groups sampled contours into shapes.
///
/// Clockwise contours are solids and counter-clockwise ones are holes, each
/// hole belonging to the smallest solid containing it. When no contour is
/// clockwise the font uses the opposite convention and every contour is a
/// solid.
pub fn shapes_from_contours(contours: Vec<Vec<Vec2>>) -> Vec<Shape> {
    let contours: Vec<Vec<Vec2>> = contours.into_iter().filter(|c| c.len() >= 3).collect();
    if !contours.iter().any(|c| is_clockwise(c)) {
        return contours
            .into_iter()
            .map(|outline| Shape {
                outline,
                holes: Vec::new(),
            })
            .collect();
    }

    let (solids, holes): (Vec<_>, Vec<_>) = contours.into_iter().partition(|c| is_clockwise(c));
    let mut shapes: Vec<Shape> = solids
        .into_iter()
        .map(|outline| Shape {
            outline,
            holes: Vec::new(),
        })
        .collect();

    for hole in holes {
        let probe = hole[0];
        let owner = shapes
            .iter()
            .enumerate()
            .filter(|(_, shape)| contains(&shape.outline, probe))
            .min_by(|(_, a), (_, b)| {
                signed_area(&a.outline)
                    .abs()
                    .total_cmp(&signed_area(&b.outline).abs())
            })
            .map(|(index, _)| index);
        match owner {
            Some(index) => shapes[index].holes.push(hole),
            None => log::debug!("dropping hole contour outside every solid"),
        }
    }
    shapes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f32, max: f32, clockwise: bool) -> Vec<Vec2> {
        let mut points = vec![
            Vec2::new(min, min),
            Vec2::new(max, min),
            Vec2::new(max, max),
            Vec2::new(min, max),
        ];
        if clockwise {
            points.reverse();
        }
        points
    }

    #[test]
    fn winding_follows_signed_area() {
        assert_eq!(signed_area(&square(0.0, 2.0, false)), 4.0);
        assert!(is_clockwise(&square(0.0, 2.0, true)));
    }

    #[test]
    fn curves_are_sampled_without_duplicates() {
        let mut builder = PathBuilder::new();
        builder.move_to(Vec2::ZERO);
        builder.line_to(Vec2::new(1.0, 0.0));
        builder.quadratic_to(Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0));
        builder.line_to(Vec2::ZERO);
        let paths = builder.finish();
        assert_eq!(paths.len(), 1);
        let points = paths[0].points(4);
        // start, line end, 4 curve samples; closing point folded into the start
        assert_eq!(points.len(), 6);
        assert_eq!(points[5], Vec2::new(0.0, 1.0));
        let mid = quadratic(Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0), 0.5);
        assert_eq!(points[3], mid);
    }

    #[test]
    fn cubic_hits_its_endpoints() {
        let p = [Vec2::ZERO, Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0)];
        assert_eq!(cubic(p[0], p[1], p[2], p[3], 0.0), p[0]);
        assert_eq!(cubic(p[0], p[1], p[2], p[3], 1.0), p[3]);
    }

    #[test]
    fn holes_are_assigned_to_enclosing_solids() {
        let contours = vec![
            square(0.0, 10.0, true),
            square(20.0, 30.0, true),
            square(2.0, 4.0, false),
            square(22.0, 24.0, false),
        ];
        let shapes = shapes_from_contours(contours);
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].holes.len(), 1);
        assert_eq!(shapes[0].holes[0][0], Vec2::new(2.0, 2.0));
        assert_eq!(shapes[1].holes.len(), 1);
    }

    #[test]
    fn all_counter_clockwise_contours_are_solids() {
        let shapes = shapes_from_contours(vec![square(0.0, 1.0, false), square(2.0, 3.0, false)]);
        assert_eq!(shapes.len(), 2);
        assert!(shapes.iter().all(|shape| shape.holes.is_empty()));
    }
}

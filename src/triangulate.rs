//! Ear-clipping triangulation of simple polygons with holes.
//!
//! Holes are merged into the outline through bridge edges (left-most hole
//! first, each bridged to the closest visible outline vertex on its left),
//! then ears are clipped from the resulting single ring.

use glam::{DVec2, Vec2};

/// Triangulates `outline` with `holes`.
///
/// Indices refer to the concatenation `outline ++ holes[0] ++ holes[1] ...`.
/// Triangles are counter-clockwise regardless of input winding.
pub fn triangulate(outline: &[Vec2], holes: &[Vec<Vec2>]) -> Vec<[u32; 3]> {
    if outline.len() < 3 {
        return Vec::new();
    }
    let points: Vec<DVec2> = outline
        .iter()
        .chain(holes.iter().flatten())
        .map(|p| p.as_dvec2())
        .collect();

    let mut ring: Vec<usize> = (0..outline.len()).collect();
    if ring_area(&points, &ring) < 0.0 {
        ring.reverse();
    }

    let mut offset = outline.len();
    let mut hole_rings: Vec<Vec<usize>> = Vec::with_capacity(holes.len());
    for hole in holes {
        let mut hole_ring: Vec<usize> = (offset..offset + hole.len()).collect();
        offset += hole.len();
        if hole_ring.len() < 3 {
            continue;
        }
        if ring_area(&points, &hole_ring) > 0.0 {
            hole_ring.reverse();
        }
        hole_rings.push(hole_ring);
    }
    hole_rings.sort_by(|a, b| {
        let ax = points[leftmost(&points, a)].x;
        let bx = points[leftmost(&points, b)].x;
        ax.total_cmp(&bx)
    });

    for hole in &hole_rings {
        eliminate_hole(&points, &mut ring, hole);
    }

    clip_ears(&points, ring)
}

fn cross(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

fn ring_area(points: &[DVec2], ring: &[usize]) -> f64 {
    let n = ring.len();
    let mut area = 0.0;
    for i in 0..n {
        let p = points[ring[(i + n - 1) % n]];
        let q = points[ring[i]];
        area += p.x * q.y - q.x * p.y;
    }
    area * 0.5
}

/// Position in `ring` of the left-most (then lowest) vertex.
fn leftmost_position(points: &[DVec2], ring: &[usize]) -> usize {
    let mut best = 0;
    for (position, &index) in ring.iter().enumerate() {
        let p = points[index];
        let b = points[ring[best]];
        if p.x < b.x || (p.x == b.x && p.y < b.y) {
            best = position;
        }
    }
    best
}

fn leftmost(points: &[DVec2], ring: &[usize]) -> usize {
    ring[leftmost_position(points, ring)]
}

fn point_in_triangle(a: DVec2, b: DVec2, c: DVec2, p: DVec2) -> bool {
    cross(a, b, p) >= 0.0 && cross(b, c, p) >= 0.0 && cross(c, a, p) >= 0.0
}

/// Whether the diagonal from ring position `at` towards `to` starts inside
/// the polygon.
fn locally_inside(points: &[DVec2], ring: &[usize], at: usize, to: DVec2) -> bool {
    let n = ring.len();
    let prev = points[ring[(at + n - 1) % n]];
    let a = points[ring[at]];
    let next = points[ring[(at + 1) % n]];
    if cross(prev, a, next) >= 0.0 {
        cross(a, next, to) >= 0.0 && cross(a, to, prev) >= 0.0
    } else {
        cross(a, prev, to) <= 0.0 || cross(a, to, next) <= 0.0
    }
}

/// Splices `hole` into `ring` through a bridge from its left-most vertex.
fn eliminate_hole(points: &[DVec2], ring: &mut Vec<usize>, hole: &[usize]) {
    let start = leftmost_position(points, hole);
    let h = points[hole[start]];
    let Some(bridge) = find_bridge(points, ring, h) else {
        log::debug!("no bridge found for hole at ({}, {}); hole ignored", h.x, h.y);
        return;
    };

    let mut spliced = Vec::with_capacity(hole.len() + 2);
    spliced.extend(hole[start..].iter().chain(hole[..start].iter()).copied());
    spliced.push(hole[start]);
    spliced.push(ring[bridge]);
    let insert_at = bridge + 1;
    ring.splice(insert_at..insert_at, spliced);
}

fn find_bridge(points: &[DVec2], ring: &[usize], h: DVec2) -> Option<usize> {
    let n = ring.len();
    let mut best_x = f64::NEG_INFINITY;
    let mut candidate = None;

    for i in 0..n {
        let p = points[ring[i]];
        let q = points[ring[(i + 1) % n]];
        if p.y == q.y {
            continue;
        }
        let spans = (p.y >= h.y && q.y <= h.y) || (p.y <= h.y && q.y >= h.y);
        if !spans {
            continue;
        }
        let x = p.x + (h.y - p.y) * (q.x - p.x) / (q.y - p.y);
        if x <= h.x && x > best_x {
            best_x = x;
            let pick = if p.x < q.x { i } else { (i + 1) % n };
            if x == h.x {
                return Some(pick);
            }
            candidate = Some(pick);
        }
    }

    let mut bridge = candidate?;
    let m = points[ring[bridge]];
    let mut best_tan = f64::INFINITY;
    let (t1, t3) = if h.y < m.y {
        (DVec2::new(h.x, h.y), DVec2::new(best_x, h.y))
    } else {
        (DVec2::new(best_x, h.y), DVec2::new(h.x, h.y))
    };

    for position in 0..n {
        let p = points[ring[position]];
        if !(h.x >= p.x && p.x >= m.x && h.x != p.x) {
            continue;
        }
        let (a, b, c) = (t1, m, t3);
        let inside = point_in_triangle(a, b, c, p) || point_in_triangle(a, c, b, p);
        if !inside {
            continue;
        }
        let tan = (h.y - p.y).abs() / (h.x - p.x);
        if locally_inside(points, ring, position, h)
            && (tan < best_tan || (tan == best_tan && p.x > points[ring[bridge]].x))
        {
            bridge = position;
            best_tan = tan;
        }
    }
    Some(bridge)
}

fn is_ear(points: &[DVec2], ring: &[usize], at: usize) -> bool {
    let n = ring.len();
    let (ia, ib, ic) = (ring[(at + n - 1) % n], ring[at], ring[(at + 1) % n]);
    let (a, b, c) = (points[ia], points[ib], points[ic]);
    if cross(a, b, c) <= 0.0 {
        return false;
    }
    ring.iter().all(|&index| {
        if index == ia || index == ib || index == ic {
            return true;
        }
        let p = points[index];
        if p == a || p == b || p == c {
            return true;
        }
        !point_in_triangle(a, b, c, p)
    })
}

fn clip_ears(points: &[DVec2], mut ring: Vec<usize>) -> Vec<[u32; 3]> {
    let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));
    let mut at = 0;
    let mut misses = 0;

    while ring.len() > 3 {
        let n = ring.len();
        at %= n;
        if is_ear(points, &ring, at) {
            let triangle = [ring[(at + n - 1) % n], ring[at], ring[(at + 1) % n]];
            triangles.push(triangle.map(|index| index as u32));
            ring.remove(at);
            at = at.saturating_sub(1);
            misses = 0;
            continue;
        }

        misses += 1;
        at += 1;
        if misses < n {
            continue;
        }

        // A full pass without an ear: drop a flat vertex if there is one,
        // otherwise cut the current corner to guarantee progress.
        misses = 0;
        let flat = (0..n).find(|&i| {
            let a = points[ring[(i + n - 1) % n]];
            let b = points[ring[i]];
            let c = points[ring[(i + 1) % n]];
            cross(a, b, c).abs() <= f64::EPSILON * (b - a).length().max(1.0)
        });
        match flat {
            Some(i) => {
                ring.remove(i);
            }
            None => {
                let i = at % n;
                let triangle = [ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]];
                log::debug!("forcing clip of non-ear vertex {}", ring[i]);
                if cross(points[triangle[0]], points[triangle[1]], points[triangle[2]]) > 0.0 {
                    triangles.push(triangle.map(|index| index as u32));
                }
                ring.remove(i);
            }
        }
    }

    if ring.len() == 3 && cross(points[ring[0]], points[ring[1]], points[ring[2]]) > 0.0 {
        triangles.push([ring[0] as u32, ring[1] as u32, ring[2] as u32]);
    }
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area_of(points: &[Vec2], triangles: &[[u32; 3]]) -> f32 {
        triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| points[i as usize]);
                (b - a).perp_dot(c - a) * 0.5
            })
            .sum()
    }

    fn square(min: f32, max: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(min, min),
            Vec2::new(max, min),
            Vec2::new(max, max),
            Vec2::new(min, max),
        ]
    }

    #[test]
    fn square_becomes_two_ccw_triangles() {
        let outline = square(0.0, 1.0);
        let triangles = triangulate(&outline, &[]);
        assert_eq!(triangles.len(), 2);
        assert!((area_of(&outline, &triangles) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn clockwise_input_still_yields_ccw_triangles() {
        let mut outline = square(0.0, 2.0);
        outline.reverse();
        let triangles = triangulate(&outline, &[]);
        for t in &triangles {
            let [a, b, c] = t.map(|i| outline[i as usize]);
            assert!((b - a).perp_dot(c - a) > 0.0);
        }
        assert!((area_of(&outline, &triangles) - 4.0).abs() < 1e-5);
    }

    #[test]
    fn concave_polygon_area_is_preserved() {
        // L shape
        let outline = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let triangles = triangulate(&outline, &[]);
        assert_eq!(triangles.len(), 4);
        assert!((area_of(&outline, &triangles) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn square_with_hole_covers_the_ring() {
        let outline = square(0.0, 4.0);
        let hole = square(1.0, 3.0);
        let triangles = triangulate(&outline, &[hole.clone()]);
        let all: Vec<Vec2> = outline.iter().chain(hole.iter()).copied().collect();
        assert!((area_of(&all, &triangles) - 12.0).abs() < 1e-4);
        // two rings of four vertices joined by a bridge: n + 2 triangles
        assert_eq!(triangles.len(), 8);
        assert!(triangles.iter().flatten().all(|&i| (i as usize) < all.len()));
    }

    #[test]
    fn two_holes_are_both_cut_out() {
        let outline = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 4.0),
            Vec2::new(0.0, 4.0),
        ];
        let holes = vec![square(1.0, 3.0), square(6.0, 8.0)];
        let triangles = triangulate(&outline, &holes);
        let all: Vec<Vec2> = outline
            .iter()
            .chain(holes.iter().flatten())
            .copied()
            .collect();
        assert!((area_of(&all, &triangles) - (40.0 - 8.0)).abs() < 1e-4);
    }

    #[test]
    fn degenerate_outline_yields_nothing() {
        assert!(triangulate(&[Vec2::ZERO, Vec2::X], &[]).is_empty());
    }
}

//! Triangle meshes and the extrusion of planar shapes into solids.

use std::f32::consts::FRAC_PI_2;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Vec2, Vec3};

use crate::shape::{is_clockwise, Shape};
use crate::triangulate::triangulate;

/// Floats per vertex: `position.xyz` followed by `normal.xyz`.
pub const VERTEX_STRIDE: usize = 6;

/// Identity of a mesh, used by renderers to cache GPU buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

impl MeshId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// GPU ready mesh: interleaved vertices and triangle indices.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub id: MeshId,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            id: MeshId::next(),
            vertices,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.vertices[index * VERTEX_STRIDE..index * VERTEX_STRIDE + 3])
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.vertices[index * VERTEX_STRIDE + 3..index * VERTEX_STRIDE + 6])
    }

    /// Axis-aligned bounds, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut positions = (0..self.vertex_count()).map(|i| self.position(i));
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Replaces every normal with the area-weighted average of the faces
    /// sharing the vertex.
    pub fn compute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertex_count()];

        for triangle in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let p0 = self.position(i0);
            let p1 = self.position(i1);
            let p2 = self.position(i2);
            let normal = (p1 - p0).cross(p2 - p0);
            if normal.length_squared() > f32::EPSILON {
                let normal = normal.normalize();
                accum[i0] += normal;
                accum[i1] += normal;
                accum[i2] += normal;
            }
        }

        for (i, normal) in accum.into_iter().enumerate() {
            let normal = normal.normalize_or_zero();
            self.vertices[i * VERTEX_STRIDE + 3..i * VERTEX_STRIDE + 6]
                .copy_from_slice(&normal.to_array());
        }
    }
}

/// Collects unshared triangles with per-face normals.
#[derive(Debug, Default)]
struct FlatMeshBuilder {
    vertices: Vec<f32>,
    indices: Vec<u32>,
}

impl FlatMeshBuilder {
    fn triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        for p in [a, b, c] {
            self.indices.push((self.vertices.len() / VERTEX_STRIDE) as u32);
            self.vertices.extend_from_slice(&p.to_array());
            self.vertices.extend_from_slice(&normal.to_array());
        }
    }

    /// Quad `a b c d`, split along `b d`.
    fn quad(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
        self.triangle(a, b, d);
        self.triangle(b, c, d);
    }

    fn finish(self) -> MeshData {
        MeshData::new(self.vertices, self.indices)
    }
}

/// Parameters of [`extrude`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrudeOptions {
    pub depth: f32,
    pub steps: u32,
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_offset: f32,
    pub bevel_segments: u32,
}

impl Default for ExtrudeOptions {
    fn default() -> Self {
        Self {
            depth: 1.0,
            steps: 1,
            curve_segments: 12,
            bevel_enabled: true,
            bevel_thickness: 0.2,
            bevel_size: 0.1,
            bevel_offset: 0.0,
            bevel_segments: 3,
        }
    }
}

/// Extrudes shapes along +Z from `-bevel_thickness` to
/// `depth + bevel_thickness`.
///
/// The front lid faces -Z, the back lid faces +Z and side walls face
/// outwards. Every triangle carries its own vertices and a flat normal.
pub fn extrude(shapes: &[Shape], options: &ExtrudeOptions) -> MeshData {
    let mut builder = FlatMeshBuilder::default();
    for shape in shapes {
        extrude_shape(&mut builder, shape, options);
    }
    builder.finish()
}

fn extrude_shape(builder: &mut FlatMeshBuilder, shape: &Shape, options: &ExtrudeOptions) {
    let steps = options.steps.max(1);
    let (segments, thickness, size, offset) = if options.bevel_enabled {
        (
            options.bevel_segments,
            options.bevel_thickness,
            options.bevel_size,
            options.bevel_offset,
        )
    } else {
        (0, 0.0, 0.0, 0.0)
    };

    // Solid contours wind clockwise and holes counter-clockwise so that the
    // side walls below face outwards.
    let mut contour = shape.outline.clone();
    if !is_clockwise(&contour) {
        contour.reverse();
    }
    let holes: Vec<Vec<Vec2>> = shape
        .holes
        .iter()
        .map(|hole| {
            let mut hole = hole.clone();
            if is_clockwise(&hole) {
                hole.reverse();
            }
            hole
        })
        .collect();

    let faces = triangulate(&contour, &holes);
    if faces.is_empty() {
        log::debug!("skipping shape without area");
        return;
    }

    let rings: Vec<&[Vec2]> = std::iter::once(contour.as_slice())
        .chain(holes.iter().map(Vec::as_slice))
        .collect();
    let flat: Vec<Vec2> = rings.iter().flat_map(|ring| ring.iter().copied()).collect();
    let movements: Vec<Vec2> = rings.iter().flat_map(|ring| bevel_vectors(ring)).collect();
    let vlen = flat.len();

    let ring_at = |bevel: f32, z: f32| -> Vec<Vec3> {
        flat.iter()
            .zip(&movements)
            .map(|(&p, &m)| (p + m * bevel).extend(z))
            .collect()
    };

    let mut layers: Vec<Vec<Vec3>> = Vec::new();
    for b in 0..segments {
        let t = b as f32 / segments as f32;
        let z = thickness * (t * FRAC_PI_2).cos();
        let bs = size * (t * FRAC_PI_2).sin() + offset;
        layers.push(ring_at(bs, -z));
    }
    let body = size + offset;
    for s in 0..=steps {
        let z = options.depth / steps as f32 * s as f32;
        if options.bevel_enabled {
            layers.push(ring_at(body, z));
        } else {
            layers.push(flat.iter().map(|p| p.extend(z)).collect());
        }
    }
    for b in (0..segments).rev() {
        let t = b as f32 / segments as f32;
        let z = thickness * (t * FRAC_PI_2).cos();
        let bs = size * (t * FRAC_PI_2).sin() + offset;
        layers.push(ring_at(bs, options.depth + z));
    }
    debug_assert_eq!(layers.len(), (steps + 2 * segments + 1) as usize);

    let front = &layers[0];
    let back = &layers[layers.len() - 1];
    for face in &faces {
        let [a, b, c] = face.map(|i| i as usize);
        builder.triangle(front[c], front[b], front[a]);
        builder.triangle(back[a], back[b], back[c]);
    }

    let mut ring_offset = 0;
    for ring in &rings {
        let len = ring.len();
        for j in (0..len).rev() {
            let k = if j == 0 { len - 1 } else { j - 1 };
            for pair in layers.windows(2) {
                let (lower, upper) = (&pair[0], &pair[1]);
                builder.quad(
                    lower[ring_offset + j],
                    lower[ring_offset + k],
                    upper[ring_offset + k],
                    upper[ring_offset + j],
                );
            }
        }
        ring_offset += len;
    }
    debug_assert_eq!(ring_offset, vlen);
}

fn bevel_vectors(ring: &[Vec2]) -> Vec<Vec2> {
    let n = ring.len();
    (0..n)
        .map(|i| bevel_vector(ring[i], ring[(i + n - 1) % n], ring[(i + 1) % n]))
        .collect()
}

/// Direction a contour point moves when the outline grows by one unit.
///
/// Corners are limited so that sharp angles do not shoot the point far away.
fn bevel_vector(point: Vec2, prev: Vec2, next: Vec2) -> Vec2 {
    let v_prev = point - prev;
    let v_next = next - point;
    let prev_len_sq = v_prev.length_squared();
    let collinear = v_prev.perp_dot(v_next);

    let (translation, shrink) = if collinear.abs() > f32::EPSILON {
        let prev_len = prev_len_sq.sqrt();
        let next_len = v_next.length();
        let prev_shift = Vec2::new(prev.x - v_prev.y / prev_len, prev.y + v_prev.x / prev_len);
        let next_shift = Vec2::new(next.x - v_next.y / next_len, next.y + v_next.x / next_len);
        let sf = ((next_shift.x - prev_shift.x) * v_next.y
            - (next_shift.y - prev_shift.y) * v_next.x)
            / (v_prev.x * v_next.y - v_prev.y * v_next.x);
        let translation = prev_shift + v_prev * sf - point;
        let len_sq = translation.length_squared();
        if len_sq <= 2.0 {
            return translation;
        }
        (translation, (len_sq / 2.0).sqrt())
    } else {
        let same_direction = if v_prev.x > f32::EPSILON {
            v_next.x > f32::EPSILON
        } else if v_prev.x < -f32::EPSILON {
            v_next.x < -f32::EPSILON
        } else {
            v_prev.y.signum() == v_next.y.signum()
        };
        if same_direction {
            (Vec2::new(-v_prev.y, v_prev.x), prev_len_sq.sqrt())
        } else {
            (v_prev, (prev_len_sq / 2.0).sqrt())
        }
    };
    if shrink <= 0.0 {
        return Vec2::ZERO;
    }
    translation / shrink
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Shape {
        Shape {
            outline: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            holes: Vec::new(),
        }
    }

    fn flat_box() -> ExtrudeOptions {
        ExtrudeOptions {
            depth: 2.0,
            bevel_enabled: false,
            ..ExtrudeOptions::default()
        }
    }

    /// Signed volume via the divergence theorem; positive for outward faces.
    fn volume(mesh: &MeshData) -> f32 {
        mesh.indices
            .chunks_exact(3)
            .map(|t| {
                let [a, b, c] = [t[0], t[1], t[2]].map(|i| mesh.position(i as usize));
                a.dot(b.cross(c)) / 6.0
            })
            .sum()
    }

    #[test]
    fn unbevelled_square_is_a_closed_box() {
        let mesh = extrude(&[unit_square()], &flat_box());
        // two lids of two triangles, four walls of two triangles
        assert_eq!(mesh.triangle_count(), 12);
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Vec3::new(1.0, 1.0, 2.0));
        assert!((volume(&mesh) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn normals_point_out_of_the_solid() {
        let mesh = extrude(&[unit_square()], &flat_box());
        let center = Vec3::new(0.5, 0.5, 1.0);
        for t in mesh.indices.chunks_exact(3) {
            let i = t[0] as usize;
            let outward = mesh.position(i) - center;
            assert!(mesh.normal(i).dot(outward) > 0.0);
        }
    }

    #[test]
    fn bevel_extends_depth_by_thickness_on_both_sides() {
        let options = ExtrudeOptions {
            depth: 0.2,
            bevel_thickness: 0.03,
            bevel_size: 0.02,
            bevel_segments: 5,
            ..ExtrudeOptions::default()
        };
        let mesh = extrude(&[unit_square()], &options);
        let (min, max) = mesh.bounds().unwrap();
        assert!((max.z - min.z - 0.26).abs() < 1e-5);
        assert!((min.z + 0.03).abs() < 1e-6);
        // the outline grows by the bevel size in the body
        assert!((max.x - 1.02).abs() < 1e-4);
        assert!(volume(&mesh) > 0.2);
    }

    #[test]
    fn holes_are_tunnels() {
        let shape = Shape {
            outline: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(4.0, 0.0),
                Vec2::new(4.0, 4.0),
                Vec2::new(0.0, 4.0),
            ],
            holes: vec![vec![
                Vec2::new(1.0, 1.0),
                Vec2::new(3.0, 1.0),
                Vec2::new(3.0, 3.0),
                Vec2::new(1.0, 3.0),
            ]],
        };
        let mesh = extrude(&[shape], &flat_box());
        assert!((volume(&mesh) - 24.0).abs() < 1e-3);
    }

    #[test]
    fn square_corner_bevel_vector_points_outwards() {
        // clockwise square, corner at the origin
        let v = bevel_vector(Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0));
        assert!((v - Vec2::new(-1.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn smooth_normals_are_unit_length() {
        let mut mesh = MeshData::new(
            vec![
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, 0.0, 0.0,
            ],
            vec![0, 1, 2],
        );
        mesh.compute_normals();
        for i in 0..3 {
            assert_eq!(mesh.normal(i), Vec3::Z);
        }
    }

    #[test]
    fn mesh_ids_are_unique() {
        let a = MeshData::new(Vec::new(), Vec::new());
        let b = MeshData::new(Vec::new(), Vec::new());
        assert_ne!(a.id, b.id);
    }
}

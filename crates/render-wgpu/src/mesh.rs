use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use nebula_scene::Mesh;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Where one primitive lives inside the shared vertex and index buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MeshRange {
    pub first_index: u32,
    pub index_count: u32,
    pub base_vertex: i32,
}

/// All primitives packed into one vertex list and one index list.
#[derive(Debug, Default)]
pub(crate) struct MeshAtlas {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    ranges: Vec<(Mesh, MeshRange)>,
}

pub(crate) const ALL_MESHES: [Mesh; 5] = [
    Mesh::Cube,
    Mesh::Sphere,
    Mesh::Cone,
    Mesh::Cylinder,
    Mesh::Octahedron,
];

const SEGMENTS: u32 = 16;
const STACKS: u32 = 12;

impl MeshAtlas {
    pub fn build() -> Self {
        let mut atlas = Self::default();
        for mesh in ALL_MESHES {
            let (vertices, indices) = geometry(mesh);
            let range = MeshRange {
                first_index: atlas.indices.len() as u32,
                index_count: indices.len() as u32,
                base_vertex: atlas.vertices.len() as i32,
            };
            atlas.vertices.extend(vertices);
            atlas.indices.extend(indices);
            atlas.ranges.push((mesh, range));
        }
        atlas
    }

    pub fn range(&self, mesh: Mesh) -> Option<MeshRange> {
        self.ranges
            .iter()
            .find(|(m, _)| *m == mesh)
            .map(|(_, r)| *r)
    }
}

/// Unit-sized geometry for a primitive, centred on the origin.
pub(crate) fn geometry(mesh: Mesh) -> (Vec<Vertex>, Vec<u16>) {
    let mut b = Builder::default();
    match mesh {
        Mesh::Cube => b.cube(),
        Mesh::Sphere => b.sphere(),
        Mesh::Cone => b.cone(),
        Mesh::Cylinder => b.cylinder(),
        Mesh::Octahedron => b.octahedron(),
    }
    (b.vertices, b.indices)
}

#[derive(Default)]
struct Builder {
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
}

impl Builder {
    fn push(&mut self, position: Vec3, normal: Vec3) -> u16 {
        self.vertices.push(Vertex {
            position: position.to_array(),
            normal: normal.to_array(),
        });
        (self.vertices.len() - 1) as u16
    }

    fn tri(&mut self, a: u16, b: u16, c: u16) {
        self.indices.extend([a, b, c]);
    }

    fn cube(&mut self) {
        let faces = [Vec3::Z, Vec3::NEG_Z, Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y];
        for n in faces {
            // Two in-plane axes with u x v = n.
            let u = n.any_orthonormal_vector();
            let v = n.cross(u);
            let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
                .map(|(su, sv)| self.push((n + u * su + v * sv) * 0.5, n));
            self.tri(corners[0], corners[1], corners[2]);
            self.tri(corners[2], corners[3], corners[0]);
        }
    }

    fn sphere(&mut self) {
        let r = 0.5;
        let first = self.vertices.len() as u16;
        for i in 0..=STACKS {
            let phi = PI * i as f32 / STACKS as f32;
            for j in 0..=SEGMENTS {
                let theta = TAU * j as f32 / SEGMENTS as f32;
                let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                self.push(n * r, n);
            }
        }
        let row = (SEGMENTS + 1) as u16;
        for i in 0..STACKS as u16 {
            for j in 0..SEGMENTS as u16 {
                let top0 = first + i * row + j;
                let top1 = top0 + 1;
                let bottom0 = top0 + row;
                let bottom1 = bottom0 + 1;
                self.tri(bottom0, top0, top1);
                self.tri(bottom0, top1, bottom1);
            }
        }
    }

    fn cone(&mut self) {
        let (r, h) = (0.5, 1.0);
        let apex = Vec3::new(0.0, h / 2.0, 0.0);
        for j in 0..SEGMENTS {
            let (a0, a1) = angles(j);
            let (d0, d1) = (ring(a0), ring(a1));
            // Slant normal of a cone with radius r and height h.
            let n0 = Vec3::new(d0.x, r / h, d0.z).normalize();
            let n1 = Vec3::new(d1.x, r / h, d1.z).normalize();
            let mid = ((n0 + n1) * 0.5).normalize();
            let b0 = self.push(d0 * r - Vec3::Y * (h / 2.0), n0);
            let b1 = self.push(d1 * r - Vec3::Y * (h / 2.0), n1);
            let tip = self.push(apex, mid);
            self.tri(b0, tip, b1);
        }
        self.cap(-h / 2.0, r, Vec3::NEG_Y);
    }

    fn cylinder(&mut self) {
        let (r, h) = (0.5, 1.0);
        for j in 0..SEGMENTS {
            let (a0, a1) = angles(j);
            let (d0, d1) = (ring(a0), ring(a1));
            let b0 = self.push(d0 * r - Vec3::Y * (h / 2.0), d0);
            let b1 = self.push(d1 * r - Vec3::Y * (h / 2.0), d1);
            let t0 = self.push(d0 * r + Vec3::Y * (h / 2.0), d0);
            let t1 = self.push(d1 * r + Vec3::Y * (h / 2.0), d1);
            self.tri(b0, t0, t1);
            self.tri(b0, t1, b1);
        }
        self.cap(h / 2.0, r, Vec3::Y);
        self.cap(-h / 2.0, r, Vec3::NEG_Y);
    }

    /// Flat disc at height `y` facing `normal` (+Y or -Y).
    fn cap(&mut self, y: f32, r: f32, normal: Vec3) {
        let centre = self.push(Vec3::new(0.0, y, 0.0), normal);
        for j in 0..SEGMENTS {
            let (a0, a1) = angles(j);
            let p0 = self.push(ring(a0) * r + Vec3::Y * y, normal);
            let p1 = self.push(ring(a1) * r + Vec3::Y * y, normal);
            if normal.y > 0.0 {
                self.tri(centre, p1, p0);
            } else {
                self.tri(centre, p0, p1);
            }
        }
    }

    fn octahedron(&mut self) {
        for sx in [1.0_f32, -1.0] {
            for sy in [1.0_f32, -1.0] {
                for sz in [1.0_f32, -1.0] {
                    let n = Vec3::new(sx, sy, sz).normalize();
                    let a = self.push(Vec3::X * sx * 0.5, n);
                    let b = self.push(Vec3::Y * sy * 0.5, n);
                    let c = self.push(Vec3::Z * sz * 0.5, n);
                    // An odd number of mirrored axes flips the winding.
                    if sx * sy * sz > 0.0 {
                        self.tri(a, b, c);
                    } else {
                        self.tri(a, c, b);
                    }
                }
            }
        }
    }
}

fn angles(j: u32) -> (f32, f32) {
    (
        TAU * j as f32 / SEGMENTS as f32,
        TAU * (j + 1) as f32 / SEGMENTS as f32,
    )
}

fn ring(angle: f32) -> Vec3 {
    Vec3::new(angle.cos(), 0.0, angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(v: &Vertex) -> Vec3 {
        Vec3::from_array(v.position)
    }

    #[test]
    fn every_mesh_fits_the_unit_cube() {
        for mesh in ALL_MESHES {
            let (vertices, _) = geometry(mesh);
            assert!(!vertices.is_empty(), "{mesh:?}");
            for v in &vertices {
                let p = pos(v);
                assert!(p.abs().max_element() <= 0.5 + 1e-5, "{mesh:?} {p}");
                assert!((Vec3::from_array(v.normal).length() - 1.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn faces_wind_outward() {
        for mesh in ALL_MESHES {
            let (vertices, indices) = geometry(mesh);
            assert_eq!(indices.len() % 3, 0);
            for tri in indices.chunks(3) {
                let [a, b, c] = [0, 1, 2].map(|k| pos(&vertices[tri[k] as usize]));
                let normal = (b - a).cross(c - a);
                // Pole triangles of the sphere collapse to zero area.
                if normal.length() < 1e-6 {
                    continue;
                }
                let centroid = (a + b + c) / 3.0;
                assert!(normal.dot(centroid) > 0.0, "{mesh:?} face points inward");
            }
        }
    }

    #[test]
    fn atlas_ranges_cover_all_indices() {
        let atlas = MeshAtlas::build();
        let total: u32 = ALL_MESHES
            .iter()
            .map(|m| atlas.range(*m).unwrap().index_count)
            .sum();
        assert_eq!(total as usize, atlas.indices.len());

        let cube = atlas.range(Mesh::Cube).unwrap();
        assert_eq!(cube.first_index, 0);
        assert_eq!(cube.index_count, 36);
        let sphere = atlas.range(Mesh::Sphere).unwrap();
        assert_eq!(sphere.base_vertex, 24);
        assert!(atlas.vertices.len() < u16::MAX as usize);
    }
}

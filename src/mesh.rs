use std::f32::consts::PI;
use std::io::BufRead;

use nalgebra as na;
use na::{vector, Vector2, Vector3};
use obj::{load_obj, Obj, TexturedVertex};

use crate::error::Result;

/// One vertex as the rasterizer consumes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub uv: Vector2<f32>,       // (0, 0) is the bottom left corner of a texture.
    pub tangent: Vector3<f32>,  // Points along +u, needed only by normal mapping.
}

impl Vertex {
    pub fn new(position: Vector3<f32>, normal: Vector3<f32>, uv: Vector2<f32>) -> Self {
        return Self {
            position,
            normal,
            uv,
            tangent: vector![1.0, 0.0, 0.0],
        };
    }
}

/// Decoded, indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,  // Three per triangle.
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        return self.indices.len() / 3;
    }

    /// Unit square in the XY plane spanning (0, 0)..(1, 1), facing +Z.
    pub fn unit_quad() -> Self {
        return Self::quad_from_corners(
            vector![0.0, 0.0, 0.0],
            vector![1.0, 0.0, 0.0],
            vector![0.0, 1.0, 0.0],
        );
    }

    /// Parallelogram given by its origin, the corner along the x extent and the corner along
    /// the y extent. UV (0, 0) lands on the origin and (1, 1) on the opposite corner.
    pub fn quad_from_corners(p0: Vector3<f32>, p1: Vector3<f32>, p2: Vector3<f32>) -> Self {
        let p3 = p1 + p2 - p0;
        let edge_u = p1 - p0;
        let edge_v = p2 - p0;
        let normal = edge_u
            .cross(&edge_v)
            .try_normalize(f32::EPSILON)
            .unwrap_or(vector![0.0, 0.0, 1.0]);
        let tangent = edge_u.try_normalize(f32::EPSILON).unwrap_or(vector![1.0, 0.0, 0.0]);

        let corners = [
            (p0, vector![0.0, 0.0]),
            (p1, vector![1.0, 0.0]),
            (p3, vector![1.0, 1.0]),
            (p2, vector![0.0, 1.0]),
        ];
        let vertices = corners
            .iter()
            .map(|(position, uv)| Vertex {
                position: *position,
                normal,
                uv: *uv,
                tangent,
            })
            .collect();

        return Self {
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
        };
    }

    /// Cube spanning [-1, 1] on every axis, meant to be seen from the inside.
    /// Positions double as cubemap lookup directions, so normals and uvs are left empty.
    pub fn skybox_cube() -> Self {
        let mut vertices = Vec::with_capacity(8);
        for i in 0..8 {
            let position = vector![
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 }
            ];
            vertices.push(Vertex::new(position, Vector3::zeros(), Vector2::zeros()));
        }
        // Each face as two triangles wound to face the cube center.
        let indices = vec![
            1, 5, 7, 1, 7, 3, // +x
            0, 2, 6, 0, 6, 4, // -x
            2, 3, 7, 2, 7, 6, // +y
            0, 4, 5, 0, 5, 1, // -y
            4, 6, 7, 4, 7, 5, // +z
            0, 1, 3, 0, 3, 2, // -z
        ];
        return Self { vertices, indices };
    }

    /// Torus around the Z axis with analytic normals and tangents.
    pub fn torus(major_radius: f32, minor_radius: f32, rings: u32, sides: u32) -> Self {
        let rings = rings.max(3);
        let sides = sides.max(3);
        let mut vertices = Vec::with_capacity(((rings + 1) * (sides + 1)) as usize);
        for i in 0..=rings {
            let u = i as f32 / rings as f32;
            let theta = 2.0 * PI * u;
            for j in 0..=sides {
                let v = j as f32 / sides as f32;
                let phi = 2.0 * PI * v;
                let ring_radius = major_radius + minor_radius * phi.cos();
                let position = vector![
                    ring_radius * theta.cos(),
                    ring_radius * theta.sin(),
                    minor_radius * phi.sin()
                ];
                let normal = vector![phi.cos() * theta.cos(), phi.cos() * theta.sin(), phi.sin()];
                vertices.push(Vertex {
                    position,
                    normal,
                    uv: vector![u, v],
                    tangent: vector![-theta.sin(), theta.cos(), 0.0],
                });
            }
        }

        let mut indices = Vec::with_capacity((rings * sides * 6) as usize);
        let stride = sides + 1;
        for i in 0..rings {
            for j in 0..sides {
                let a = i * stride + j;
                let b = (i + 1) * stride + j;
                indices.extend_from_slice(&[a, b, b + 1, a, b + 1, a + 1]);
            }
        }

        return Self { vertices, indices };
    }

    /// Decodes a Wavefront OBJ with positions, normals and texture coordinates.
    pub fn from_obj_reader<R: BufRead>(reader: R) -> Result<Self> {
        let model: Obj<TexturedVertex, u32> = load_obj(reader)?;
        log::debug!(
            "obj decoded: {} vertices, {} indices",
            model.vertices.len(),
            model.indices.len()
        );

        let vertices = model
            .vertices
            .iter()
            .map(|v| {
                Vertex::new(
                    vector![v.position[0], v.position[1], v.position[2]],
                    vector![v.normal[0], v.normal[1], v.normal[2]],
                    vector![v.texture[0], v.texture[1]],
                )
            })
            .collect();
        let mut mesh = Self {
            vertices,
            indices: model.indices,
        };
        mesh.compute_tangents();

        return Ok(mesh);
    }

    /// Recomputes per-vertex tangents from uv gradients, orthogonalized against the normal.
    pub fn compute_tangents(&mut self) {
        let mut accumulated = vec![Vector3::<f32>::zeros(); self.vertices.len()];
        for face in self.indices.chunks_exact(3) {
            let [a, b, c] = [face[0] as usize, face[1] as usize, face[2] as usize];
            let edge_1 = self.vertices[b].position - self.vertices[a].position;
            let edge_2 = self.vertices[c].position - self.vertices[a].position;
            let duv_1 = self.vertices[b].uv - self.vertices[a].uv;
            let duv_2 = self.vertices[c].uv - self.vertices[a].uv;
            let det = duv_1.x * duv_2.y - duv_2.x * duv_1.y;
            if det.abs() < 1e-12 {
                // Degenerate uv mapping, contributes nothing.
                continue;
            }
            let tangent = (edge_1 * duv_2.y - edge_2 * duv_1.y) / det;
            for index in [a, b, c] {
                accumulated[index] += tangent;
            }
        }

        for (vertex, tangent) in self.vertices.iter_mut().zip(accumulated) {
            let n = vertex.normal;
            let orthogonal = tangent - n * n.dot(&tangent);
            vertex.tangent = match orthogonal.try_normalize(1e-6) {
                Some(t) => t,
                None => any_perpendicular(n),
            };
        }
    }
}

/// Some unit vector perpendicular to `n`, used when uvs give no tangent direction.
fn any_perpendicular(n: Vector3<f32>) -> Vector3<f32> {
    let helper = if n.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    return n.cross(&helper).try_normalize(f32::EPSILON).unwrap_or(Vector3::x());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TRIANGLE_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn quad_from_corners_closes_the_parallelogram() {
        let quad = MeshData::quad_from_corners(
            vector![0.0, 0.0, 1.0],
            vector![4.0, 0.0, 1.0],
            vector![0.0, 2.0, 1.0],
        );
        assert_eq!(quad.triangle_count(), 2);
        assert_eq!(quad.vertices[2].position, vector![4.0, 2.0, 1.0]);
        assert_eq!(quad.vertices[2].uv, vector![1.0, 1.0]);
        assert_eq!(quad.vertices[0].normal, vector![0.0, 0.0, 1.0]);
    }

    #[test]
    fn torus_tangents_are_perpendicular_to_normals() {
        let torus = MeshData::torus(1.0, 0.4, 12, 8);
        assert_eq!(torus.vertices.len(), 13 * 9);
        assert_eq!(torus.triangle_count(), 12 * 8 * 2);
        for vertex in &torus.vertices {
            assert!(vertex.normal.dot(&vertex.tangent).abs() < 1e-5);
            assert!((vertex.normal.norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn skybox_cube_indices_stay_in_range() {
        let cube = MeshData::skybox_cube();
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.vertices.len()));
    }

    #[test]
    fn obj_reader_decodes_and_derives_tangents() {
        let mesh = MeshData::from_obj_reader(Cursor::new(TRIANGLE_OBJ)).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertices.len(), 3);
        for vertex in &mesh.vertices {
            assert!((vertex.tangent - vector![1.0, 0.0, 0.0]).norm() < 1e-5);
        }
    }

    #[test]
    fn obj_reader_rejects_garbage() {
        assert!(MeshData::from_obj_reader(Cursor::new("v 0 zero 0\n")).is_err());
    }
}

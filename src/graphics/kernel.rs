//! Built-in shading kernels of the software context.
//!
//! A draw goes through three steps per program: `DrawState::prepare` snapshots the uniforms
//! once, `vertex` runs per vertex and `fragment` per covered pixel.

use nalgebra as na;
use na::{vector, Matrix3, Matrix4, Point3, Vector2, Vector3, Vector4};

use super::UniformValue;
use crate::light::{self, Material, SceneLights, SurfacePoint};
use crate::mesh::Vertex;
use crate::uniforms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelKind {
    Main,    // Textured quad.
    Skybox,  // Cubemap background.
    Lit,     // Blinn-Phong with optional normal map.
}

impl KernelKind {
    pub fn from_name(name: &str) -> Option<Self> {
        return match name {
            "main" => Some(KernelKind::Main),
            "skybox" => Some(KernelKind::Skybox),
            "lit" => Some(KernelKind::Lit),
            _ => None,
        };
    }

    pub fn name(&self) -> &'static str {
        return match self {
            KernelKind::Main => "main",
            KernelKind::Skybox => "skybox",
            KernelKind::Lit => "lit",
        };
    }
}

/// Per-vertex outputs, interpolated across a triangle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Varyings {
    pub world: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub tangent: Vector3<f32>,
    pub uv: Vector2<f32>,
    pub local: Vector3<f32>,  // Untransformed position, the skybox lookup direction.
}

impl Varyings {
    pub fn lerp(a: &Varyings, b: &Varyings, t: f32) -> Varyings {
        return Varyings {
            world: a.world.lerp(&b.world, t),
            normal: a.normal.lerp(&b.normal, t),
            tangent: a.tangent.lerp(&b.tangent, t),
            uv: a.uv.lerp(&b.uv, t),
            local: a.local.lerp(&b.local, t),
        };
    }

    /// Weighted sum with barycentric weights.
    pub fn blend(v: [&Varyings; 3], weights: Vector3<f32>) -> Varyings {
        return Varyings {
            world: v[0].world * weights.x + v[1].world * weights.y + v[2].world * weights.z,
            normal: v[0].normal * weights.x + v[1].normal * weights.y + v[2].normal * weights.z,
            tangent: v[0].tangent * weights.x + v[1].tangent * weights.y + v[2].tangent * weights.z,
            uv: v[0].uv * weights.x + v[1].uv * weights.y + v[2].uv * weights.z,
            local: v[0].local * weights.x + v[1].local * weights.y + v[2].local * weights.z,
        };
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClipVertex {
    pub clip: Vector4<f32>,
    pub varyings: Varyings,
}

/// Texture access for the fragment stage, by texture unit.
pub trait Samplers {
    fn sample_2d(&self, unit: u32, uv: Vector2<f32>) -> Option<Vector4<f32>>;
    fn sample_cube(&self, unit: u32, direction: Vector3<f32>) -> Option<Vector4<f32>>;
}

/// Uniform snapshot of one draw.
pub struct DrawState {
    kind: KernelKind,
    model: Matrix4<f32>,
    normal_matrix: Matrix3<f32>,
    mvp: Matrix4<f32>,
    sky_vp: Matrix4<f32>,  // Projection times the rotation part of the view.
    view_position: Vector3<f32>,
    use_normal_map: bool,
    lighting: Option<(SceneLights, Material)>,
}

fn read_mat4(lookup: &dyn Fn(&str) -> Option<UniformValue>, name: &str) -> Matrix4<f32> {
    return match lookup(name) {
        Some(UniformValue::Mat4(m)) => m,
        _ => Matrix4::identity(),
    };
}

impl DrawState {
    pub fn prepare(kind: KernelKind, lookup: &dyn Fn(&str) -> Option<UniformValue>) -> Self {
        let model = read_mat4(lookup, uniforms::MODEL);
        let view = read_mat4(lookup, uniforms::VIEW);
        let projection = read_mat4(lookup, uniforms::PROJECTION);

        let model_3 = model.fixed_slice::<3, 3>(0, 0).into_owned();
        let normal_matrix = model_3
            .try_inverse()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix3::identity);
        let mut view_rotation = Matrix4::identity();
        view_rotation
            .fixed_slice_mut::<3, 3>(0, 0)
            .copy_from(&view.fixed_slice::<3, 3>(0, 0));

        let view_position = match lookup(uniforms::VIEW_POSITION) {
            Some(UniformValue::Vec3(position)) => position,
            _ => Vector3::zeros(),
        };
        let use_normal_map = matches!(lookup(uniforms::USE_NORMAL_MAP), Some(UniformValue::Int(1)));
        let lighting = match kind {
            KernelKind::Lit => Some((SceneLights::from_uniforms(lookup), Material::from_uniforms(lookup))),
            _ => None,
        };

        return Self {
            kind,
            model,
            normal_matrix,
            mvp: projection * view * model,
            sky_vp: projection * view_rotation,
            view_position,
            use_normal_map,
            lighting,
        };
    }

    /// Full model-view-projection transform, also used for debug lines.
    pub fn mvp(&self) -> &Matrix4<f32> {
        return &self.mvp;
    }

    pub fn vertex(&self, vertex: &Vertex) -> ClipVertex {
        let position = Point3::from(vertex.position).to_homogeneous();
        match self.kind {
            KernelKind::Main => ClipVertex {
                clip: self.mvp * position,
                varyings: Varyings {
                    uv: vertex.uv,
                    ..Default::default()
                },
            },
            KernelKind::Skybox => {
                let mut clip = self.sky_vp * position;
                // Pin the sky to the far plane.
                clip.z = clip.w;
                ClipVertex {
                    clip,
                    varyings: Varyings {
                        local: vertex.position,
                        ..Default::default()
                    },
                }
            }
            KernelKind::Lit => {
                let world = self.model * position;
                let tangent = self.model.fixed_slice::<3, 3>(0, 0) * vertex.tangent;
                ClipVertex {
                    clip: self.mvp * position,
                    varyings: Varyings {
                        world: world.xyz(),
                        normal: self.normal_matrix * vertex.normal,
                        tangent,
                        uv: vertex.uv,
                        local: vertex.position,
                    },
                }
            }
        }
    }

    /// Color of one fragment, rgba in [0, 1].
    pub fn fragment(&self, varyings: &Varyings, samplers: &dyn Samplers) -> Vector4<f32> {
        let opaque_black = vector![0.0, 0.0, 0.0, 1.0];
        return match self.kind {
            KernelKind::Main => samplers
                .sample_2d(uniforms::TEXTURE_UNIT, varyings.uv)
                .unwrap_or(opaque_black),
            KernelKind::Skybox => samplers
                .sample_cube(uniforms::TEXTURE_UNIT, varyings.local)
                .unwrap_or(opaque_black),
            KernelKind::Lit => self.lit_fragment(varyings, samplers),
        };
    }

    fn lit_fragment(&self, varyings: &Varyings, samplers: &dyn Samplers) -> Vector4<f32> {
        let Some((lights, material)) = &self.lighting else {
            return Vector4::zeros();
        };

        let mut normal = varyings
            .normal
            .try_normalize(f32::EPSILON)
            .unwrap_or(vector![0.0, 0.0, 1.0]);
        if self.use_normal_map {
            if let Some(texel) = samplers.sample_2d(uniforms::NORMAL_MAP_UNIT, varyings.uv) {
                let tangent_normal = texel.xyz() * 2.0 - vector![1.0, 1.0, 1.0];
                let tangent = varyings.tangent - normal * normal.dot(&varyings.tangent);
                if let Some(t) = tangent.try_normalize(f32::EPSILON) {
                    let tbn = Matrix3::from_columns(&[t, normal.cross(&t), normal]);
                    normal = (tbn * tangent_normal).try_normalize(f32::EPSILON).unwrap_or(normal);
                }
            }
        }

        let point = SurfacePoint {
            position: varyings.world,
            normal,
            view_position: self.view_position,
        };
        let light = light::shade(&point, lights, material).map(|c| c.min(1.0));
        let albedo = samplers
            .sample_2d(uniforms::TEXTURE_UNIT, varyings.uv)
            .unwrap_or(vector![1.0, 1.0, 1.0, 1.0]);

        return vector![light.x * albedo.x, light.y * albedo.y, light.z * albedo.z, albedo.w];
    }
}

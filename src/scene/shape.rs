use image::RgbaImage;

use crate::graphics::{GraphicsContext, MeshHandle, TextureHandle, UniformValue};
use crate::mesh::MeshData;
use crate::uniforms;

/// Lit, textured mesh. A normal map is an optional capability, switching the lit kernel to
/// per-fragment normal perturbation.
pub struct Shape {
    mesh: MeshHandle,
    texture: TextureHandle,
    normal_map: Option<TextureHandle>,
    triangles: usize,
}

impl Shape {
    pub fn new(gfx: &mut dyn GraphicsContext, mesh: &MeshData, albedo: &RgbaImage) -> Self {
        return Self {
            mesh: gfx.upload_mesh(mesh),
            texture: gfx.create_texture(albedo),
            normal_map: None,
            triangles: mesh.triangle_count(),
        };
    }

    /// Adds (or replaces) the tangent space normal map.
    pub fn add_normal_map(&mut self, gfx: &mut dyn GraphicsContext, normal_map: &RgbaImage) {
        if let Some(previous) = self.normal_map.take() {
            gfx.delete_texture(previous);
        }
        self.normal_map = Some(gfx.create_texture(normal_map));
    }

    pub fn has_normal_map(&self) -> bool {
        return self.normal_map.is_some();
    }

    pub fn triangle_count(&self) -> usize {
        return self.triangles;
    }

    /// Binds the textures and draws with the model matrix last applied.
    pub fn prepare_and_draw(&self, gfx: &mut dyn GraphicsContext) {
        debug_assert!(gfx.current_program().is_some(), "shape drawn with no program in use");
        gfx.bind_texture(uniforms::TEXTURE_UNIT, self.texture);
        match self.normal_map {
            Some(normal_map) => {
                gfx.bind_texture(uniforms::NORMAL_MAP_UNIT, normal_map);
                gfx.set_uniform(uniforms::USE_NORMAL_MAP, UniformValue::Int(1));
            }
            None => gfx.set_uniform(uniforms::USE_NORMAL_MAP, UniformValue::Int(0)),
        }
        gfx.draw_indexed(self.mesh);
    }

    pub fn destroy(self, gfx: &mut dyn GraphicsContext) {
        gfx.delete_mesh(self.mesh);
        gfx.delete_texture(self.texture);
        if let Some(normal_map) = self.normal_map {
            gfx.delete_texture(normal_map);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{builtin_shader, LIGHT_FRAGMENT, LIGHT_VERTEX};
    use crate::graphics::SoftwareContext;
    use crate::shader::{LightShaderAdaptor, ShaderProgram};
    use image::Rgba;

    fn lit_context() -> (SoftwareContext, ShaderProgram) {
        let mut gfx = SoftwareContext::new(8, 8).unwrap();
        let shader = ShaderProgram::new(
            &mut gfx,
            builtin_shader(LIGHT_VERTEX).unwrap(),
            builtin_shader(LIGHT_FRAGMENT).unwrap(),
            Box::new(LightShaderAdaptor),
        )
        .unwrap();
        shader.apply(&mut gfx);
        return (gfx, shader);
    }

    #[test]
    fn normal_map_flag_follows_the_capability() {
        let (mut gfx, shader) = lit_context();
        let albedo = RgbaImage::from_pixel(2, 2, Rgba([200, 200, 200, 255]));
        let mut shape = Shape::new(&mut gfx, &MeshData::unit_quad(), &albedo);
        assert!(!shape.has_normal_map());
        shape.prepare_and_draw(&mut gfx);
        assert_eq!(gfx.uniform(shader.handle(), uniforms::USE_NORMAL_MAP), Some(UniformValue::Int(0)));

        shape.add_normal_map(&mut gfx, &RgbaImage::from_pixel(2, 2, Rgba([128, 128, 255, 255])));
        assert!(shape.has_normal_map());
        shape.prepare_and_draw(&mut gfx);
        assert_eq!(gfx.uniform(shader.handle(), uniforms::USE_NORMAL_MAP), Some(UniformValue::Int(1)));
        assert_eq!(gfx.draw_calls(), 2);
    }

    #[test]
    fn replacing_the_normal_map_frees_the_old_one() {
        let (mut gfx, _shader) = lit_context();
        let image = RgbaImage::new(1, 1);
        let mut shape = Shape::new(&mut gfx, &MeshData::unit_quad(), &image);
        shape.add_normal_map(&mut gfx, &image);
        shape.add_normal_map(&mut gfx, &image);
        assert_eq!(gfx.live_textures(), 2);
        shape.destroy(&mut gfx);
        assert_eq!(gfx.live_textures(), 0);
        assert_eq!(gfx.live_meshes(), 0);
    }
}

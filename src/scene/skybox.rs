use image::RgbaImage;

use crate::error::Result;
use crate::graphics::{DepthMode, GraphicsContext, MeshHandle, TextureHandle};
use crate::mesh::MeshData;
use crate::uniforms;

/// Cubemap background drawn on the far plane.
pub struct SkyBox {
    cubemap: TextureHandle,
    mesh: MeshHandle,
}

impl SkyBox {
    /// Faces in +x, -x, +y, -y, +z, -z order.
    pub fn new(gfx: &mut dyn GraphicsContext, faces: &[RgbaImage; 6]) -> Result<Self> {
        let cubemap = gfx.create_cubemap(faces)?;
        let mesh = gfx.upload_mesh(&MeshData::skybox_cube());
        return Ok(Self { cubemap, mesh });
    }

    /// Draws with a less-or-equal depth test, so anything drawn later in front of the far plane
    /// wins. Leaves the depth mode at `Less`, whatever it was before.
    pub fn prepare_and_draw(&self, gfx: &mut dyn GraphicsContext) {
        debug_assert!(gfx.current_program().is_some(), "skybox drawn with no program in use");
        gfx.set_depth_mode(DepthMode::LessEqual);
        gfx.bind_texture(uniforms::TEXTURE_UNIT, self.cubemap);
        gfx.draw_indexed(self.mesh);
        gfx.set_depth_mode(DepthMode::Less);
    }

    pub fn destroy(self, gfx: &mut dyn GraphicsContext) {
        gfx.delete_mesh(self.mesh);
        gfx.delete_texture(self.cubemap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{builtin_shader, SKYBOX_FRAGMENT, SKYBOX_VERTEX};
    use crate::camera::{Camera, CameraSettings};
    use crate::graphics::SoftwareContext;
    use crate::shader::{MainShaderAdaptor, ShaderProgram};
    use image::Rgba;

    const SKY: Rgba<u8> = Rgba([40, 90, 160, 255]);

    fn draw_sky(width: u32, height: u32) -> SoftwareContext {
        let mut gfx = SoftwareContext::new(width, height).unwrap();
        let shader = ShaderProgram::new(
            &mut gfx,
            builtin_shader(SKYBOX_VERTEX).unwrap(),
            builtin_shader(SKYBOX_FRAGMENT).unwrap(),
            Box::new(MainShaderAdaptor),
        )
        .unwrap();
        shader.apply(&mut gfx);
        let mut camera = Camera::new(width, height, CameraSettings::default()).unwrap();
        camera.reset_for_3d();
        camera.apply(&mut gfx);

        let faces: [RgbaImage; 6] = std::array::from_fn(|_| RgbaImage::from_pixel(2, 2, SKY));
        let skybox = SkyBox::new(&mut gfx, &faces).unwrap();
        gfx.set_depth_mode(DepthMode::Disabled);
        skybox.prepare_and_draw(&mut gfx);
        return gfx;
    }

    #[test]
    fn sky_fills_a_square_view() {
        let gfx = draw_sky(16, 16);
        assert!(gfx.surface().pixels().all(|p| *p == SKY));
        assert_eq!(gfx.depth_mode(), DepthMode::Less);
    }

    #[test]
    fn sky_fills_a_view_wider_than_ninety_degrees() {
        // 4:1 at a 60 degree vertical field of view shows the side faces of the cube,
        // whose corners lie behind the eye.
        let gfx = draw_sky(64, 16);
        assert!(gfx.surface().pixels().all(|p| *p == SKY));
    }
}

use image::Rgba;
use nalgebra as na;
use na::Vector3;

use crate::error::Result;
use crate::graphics::{GraphicsContext, MeshHandle, TargetHandle, TextureHandle};
use crate::mesh::MeshData;
use crate::uniforms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBufferState {
    Unbound,
    BoundAsTarget,
}

/// Offscreen color target that can be presented as a textured quad.
pub struct FrameBuffer {
    target: TargetHandle,
    texture: TextureHandle,
    quad: MeshHandle,
    width: u32,
    height: u32,
    clear_color: Rgba<u8>,
    state: FrameBufferState,
}

impl FrameBuffer {
    /// Allocates a `width` x `height` target, already cleared to `clear_color`.
    pub fn new(gfx: &mut dyn GraphicsContext, width: u32, height: u32, clear_color: Rgba<u8>) -> Result<Self> {
        let (target, texture) = gfx.create_render_target(width, height)?;

        let previous = gfx.current_render_target();
        gfx.bind_render_target(Some(target));
        gfx.clear(clear_color);
        gfx.bind_render_target(previous);

        let quad = gfx.upload_mesh(&MeshData::unit_quad());
        log::debug!("frame buffer {}x{} on target {}", width, height, target.id());
        return Ok(Self {
            target,
            texture,
            quad,
            width,
            height,
            clear_color,
            state: FrameBufferState::Unbound,
        });
    }

    /// Redirects subsequent draws into this buffer and clears it.
    pub fn apply(&mut self, gfx: &mut dyn GraphicsContext) {
        debug_assert_eq!(self.state, FrameBufferState::Unbound, "frame buffer applied twice");
        gfx.bind_render_target(Some(self.target));
        gfx.clear(self.clear_color);
        self.state = FrameBufferState::BoundAsTarget;
    }

    /// Restores the visible surface as the render target.
    pub fn connect_default_frame_buffer(&mut self, gfx: &mut dyn GraphicsContext) {
        debug_assert_eq!(self.state, FrameBufferState::BoundAsTarget, "frame buffer was not applied");
        debug_assert_eq!(gfx.current_render_target(), Some(self.target));
        gfx.bind_render_target(None);
        self.state = FrameBufferState::Unbound;
    }

    /// Draws the captured image on the parallelogram spanned by `p0` (origin), `p1` (x extent
    /// corner) and `p2` (y extent corner), with the program in use and the model matrix last
    /// applied.
    pub fn draw_texture(&self, gfx: &mut dyn GraphicsContext, p0: Vector3<f32>, p1: Vector3<f32>, p2: Vector3<f32>) {
        debug_assert_eq!(self.state, FrameBufferState::Unbound, "frame buffer sampled while bound");
        debug_assert!(gfx.current_program().is_some(), "frame buffer drawn with no program in use");
        if let Err(error) = gfx.update_mesh(self.quad, &MeshData::quad_from_corners(p0, p1, p2)) {
            log::error!("frame buffer quad lost: {}", error);
            return;
        }
        gfx.bind_texture(uniforms::TEXTURE_UNIT, self.texture);
        gfx.draw_indexed(self.quad);
    }

    pub fn state(&self) -> FrameBufferState {
        return self.state;
    }

    pub fn target(&self) -> TargetHandle {
        return self.target;
    }

    pub fn texture(&self) -> TextureHandle {
        return self.texture;
    }

    pub fn size(&self) -> (u32, u32) {
        return (self.width, self.height);
    }

    pub fn destroy(self, gfx: &mut dyn GraphicsContext) {
        gfx.delete_mesh(self.quad);
        gfx.delete_texture(self.texture);
        gfx.delete_render_target(self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::builtin_shader;
    use crate::graphics::SoftwareContext;
    use crate::shader::{MainShaderAdaptor, ShaderProgram};
    use image::RgbaImage;
    use na::vector;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn main_shader(gfx: &mut SoftwareContext) -> ShaderProgram {
        return ShaderProgram::new(
            gfx,
            builtin_shader("vertex_shader.glsl").unwrap(),
            builtin_shader("fragment_shader.glsl").unwrap(),
            Box::new(MainShaderAdaptor),
        )
        .unwrap();
    }

    #[test]
    fn starts_cleared_and_unbound() {
        let mut gfx = SoftwareContext::new(4, 4).unwrap();
        let buffer = FrameBuffer::new(&mut gfx, 4, 4, Rgba([1, 2, 3, 255])).unwrap();
        assert_eq!(buffer.state(), FrameBufferState::Unbound);
        assert_eq!(gfx.current_render_target(), None);
        let image = gfx.target_image(buffer.target()).unwrap();
        assert!(image.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));
        assert!(FrameBuffer::new(&mut gfx, 0, 4, WHITE).is_err());
    }

    #[test]
    fn solid_color_survives_the_round_trip() {
        let mut gfx = SoftwareContext::new(8, 6).unwrap();
        let shader = main_shader(&mut gfx);
        let mut buffer = FrameBuffer::new(&mut gfx, 8, 6, WHITE).unwrap();
        let solid = Rgba([200, 40, 90, 255]);
        let solid_texture = gfx.create_texture(&RgbaImage::from_pixel(3, 3, solid));
        let full_screen = gfx.upload_mesh(&MeshData::quad_from_corners(
            vector![-1.0, -1.0, 0.0],
            vector![1.0, -1.0, 0.0],
            vector![-1.0, 1.0, 0.0],
        ));

        buffer.apply(&mut gfx);
        assert_eq!(buffer.state(), FrameBufferState::BoundAsTarget);
        shader.apply(&mut gfx);
        gfx.bind_texture(uniforms::TEXTURE_UNIT, solid_texture);
        gfx.draw_indexed(full_screen);
        buffer.connect_default_frame_buffer(&mut gfx);
        assert_eq!(buffer.state(), FrameBufferState::Unbound);

        gfx.clear(WHITE);
        buffer.draw_texture(
            &mut gfx,
            vector![-1.0, -1.0, 0.0],
            vector![1.0, -1.0, 0.0],
            vector![-1.0, 1.0, 0.0],
        );
        assert!(gfx.surface().pixels().all(|p| *p == solid));
    }

    #[test]
    fn destroy_releases_everything() {
        let mut gfx = SoftwareContext::new(4, 4).unwrap();
        let buffer = FrameBuffer::new(&mut gfx, 4, 4, WHITE).unwrap();
        buffer.destroy(&mut gfx);
        assert_eq!(gfx.live_render_targets(), 0);
        assert_eq!(gfx.live_textures(), 0);
        assert_eq!(gfx.live_meshes(), 0);
    }
}

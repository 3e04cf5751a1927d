use image::RgbaImage;
use nalgebra as na;
use na::{vector, Matrix4};

use crate::graphics::{GraphicsContext, MeshHandle, TextureHandle};
use crate::matrix::apply_matrix;
use crate::mesh::MeshData;
use crate::uniforms;

/// Source of the pixels a `SimplePolygon` shows.
pub trait ImageProducer {
    fn produce(&mut self) -> RgbaImage;
}

impl<F: FnMut() -> RgbaImage> ImageProducer for F {
    fn produce(&mut self) -> RgbaImage {
        return self();
    }
}

/// Flat color of a fixed size, the overlay content of the demo.
pub struct SolidFill {
    pub width: u32,
    pub height: u32,
    pub color: image::Rgba<u8>,
}

impl ImageProducer for SolidFill {
    fn produce(&mut self) -> RgbaImage {
        return RgbaImage::from_pixel(self.width, self.height, self.color);
    }
}

/// Screen quad whose texture comes from an `ImageProducer`.
///
/// The producer runs once at construction. With `redraw` set it runs again on every
/// `prepare_and_draw` and the new pixels are uploaded before drawing.
pub struct SimplePolygon {
    producer: Box<dyn ImageProducer>,
    redraw: bool,
    texture: TextureHandle,
    mesh: MeshHandle,
    transform: Matrix4<f32>,
}

impl SimplePolygon {
    pub fn new(gfx: &mut dyn GraphicsContext, mut producer: Box<dyn ImageProducer>, redraw: bool) -> Self {
        let image = producer.produce();
        let texture = gfx.create_texture(&image);
        let mesh = gfx.upload_mesh(&MeshData::unit_quad());
        return Self {
            producer,
            redraw,
            texture,
            mesh,
            transform: Matrix4::identity(),
        };
    }

    /// Draws the quad centred on (`center_x`, `center_y`), `size` wide and
    /// `size * aspect_correction` tall, in the units of the camera in use.
    pub fn prepare_and_draw(
        &mut self,
        gfx: &mut dyn GraphicsContext,
        center_x: f32,
        center_y: f32,
        size: f32,
        aspect_correction: f32,
    ) {
        debug_assert!(gfx.current_program().is_some(), "polygon drawn with no program in use");
        if self.redraw {
            let image = self.producer.produce();
            if let Err(error) = gfx.update_texture(self.texture, &image) {
                log::error!("polygon texture upload failed: {}", error);
            }
        }

        self.transform = Matrix4::new_translation(&vector![center_x, center_y, 1.0])
            * Matrix4::new_nonuniform_scaling(&vector![size, size * aspect_correction, 1.0])
            * Matrix4::new_translation(&vector![-0.5, -0.5, 0.0]);
        apply_matrix(gfx, &self.transform);
        gfx.bind_texture(uniforms::TEXTURE_UNIT, self.texture);
        gfx.draw_indexed(self.mesh);
    }

    pub fn redraw(&self) -> bool {
        return self.redraw;
    }

    pub fn transform(&self) -> &Matrix4<f32> {
        return &self.transform;
    }

    pub fn destroy(self, gfx: &mut dyn GraphicsContext) {
        gfx.delete_mesh(self.mesh);
        gfx.delete_texture(self.texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::builtin_shader;
    use crate::camera::{Camera, CameraSettings};
    use crate::graphics::SoftwareContext;
    use crate::shader::{MainShaderAdaptor, ShaderProgram};
    use image::Rgba;
    use std::cell::Cell;
    use std::rc::Rc;

    const MAGENTA: Rgba<u8> = Rgba([255, 0, 255, 255]);

    fn setup(width: u32, height: u32) -> SoftwareContext {
        let mut gfx = SoftwareContext::new(width, height).unwrap();
        let shader = ShaderProgram::new(
            &mut gfx,
            builtin_shader("vertex_shader.glsl").unwrap(),
            builtin_shader("fragment_shader.glsl").unwrap(),
            Box::new(MainShaderAdaptor),
        )
        .unwrap();
        shader.apply(&mut gfx);
        let camera = Camera::new(width, height, CameraSettings::default()).unwrap();
        camera.apply(&mut gfx);
        return gfx;
    }

    fn counting_producer(calls: Rc<Cell<u32>>) -> Box<dyn ImageProducer> {
        return Box::new(move || {
            calls.set(calls.get() + 1);
            RgbaImage::from_pixel(2, 2, MAGENTA)
        });
    }

    #[test]
    fn static_polygon_never_calls_back_after_construction() {
        let mut gfx = setup(16, 16);
        let calls = Rc::new(Cell::new(0));
        let mut polygon = SimplePolygon::new(&mut gfx, counting_producer(calls.clone()), false);
        assert_eq!(calls.get(), 1);
        for _ in 0..5 {
            polygon.prepare_and_draw(&mut gfx, 8.0, 8.0, 4.0, 1.0);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn redrawn_polygon_calls_back_once_per_draw() {
        let mut gfx = setup(16, 16);
        let calls = Rc::new(Cell::new(0));
        let mut polygon = SimplePolygon::new(&mut gfx, counting_producer(calls.clone()), true);
        for expected in 2..6 {
            polygon.prepare_and_draw(&mut gfx, 8.0, 8.0, 4.0, 1.0);
            assert_eq!(calls.get(), expected);
        }
    }

    #[test]
    fn quad_lands_around_its_center() {
        let mut gfx = setup(20, 20);
        gfx.clear(Rgba([255, 255, 255, 255]));
        let producer = SolidFill {
            width: 4,
            height: 4,
            color: MAGENTA,
        };
        let mut polygon = SimplePolygon::new(&mut gfx, Box::new(producer), false);
        // 6 wide, 12 tall around (5, 10) in pixel units with y up.
        polygon.prepare_and_draw(&mut gfx, 5.0, 10.0, 6.0, 2.0);
        let surface = gfx.surface();
        assert_eq!(*surface.get_pixel(5, 10), MAGENTA);
        assert_eq!(*surface.get_pixel(3, 5), MAGENTA);
        assert_eq!(*surface.get_pixel(9, 10), Rgba([255, 255, 255, 255]));
        assert_eq!(*surface.get_pixel(5, 17), Rgba([255, 255, 255, 255]));
    }
}

use nalgebra as na;
use na::{Matrix4, Point3, Vector3, Vector4};

use crate::error::{RenderError, Result};
use crate::graphics::{GraphicsContext, UniformValue};
use crate::uniforms;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub eye_z: f32,         // Eye distance along +Z in 3D mode.
    pub fov_degrees: f32,   // Vertical field of view.
    pub near: f32,
    pub far: f32,
    pub eye_z_2d: f32,      // Reference eye position of the 2D mode.
}

impl Default for CameraSettings {
    fn default() -> Self {
        return Self {
            eye_z: 5.0,
            fov_degrees: 60.0,
            near: 0.1,
            far: 100.0,
            eye_z_2d: 10.0,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    TwoD,
    ThreeD,
}

/// View and projection for one of two modes.
///
/// `reset_for_2d`/`reset_for_3d` only configure the matrices; `apply` uploads them to the
/// program in use and has to be repeated after every program switch, uniforms being
/// program-local.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    width: u32,
    height: u32,
    pub settings: CameraSettings,
    mode: CameraMode,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
}

impl Camera {
    /// Camera for a `width` x `height` viewport, starting in 2D mode.
    pub fn new(width: u32, height: u32, settings: CameraSettings) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        let mut camera = Self {
            width,
            height,
            settings,
            mode: CameraMode::TwoD,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        };
        camera.reset_for_2d();
        return Ok(camera);
    }

    /// Orthographic projection in pixel units: (0, 0) is the bottom left corner of the viewport,
    /// (width, height) the top right one.
    pub fn reset_for_2d(&mut self) {
        self.mode = CameraMode::TwoD;
        self.view = look_along_z(self.settings.eye_z_2d);
        self.projection = Matrix4::new_orthographic(
            0.0,
            self.width as f32,
            0.0,
            self.height as f32,
            self.settings.near,
            self.settings.far,
        );
    }

    /// Perspective projection with the eye at (0, 0, eye_z) looking at the origin.
    pub fn reset_for_3d(&mut self) {
        self.mode = CameraMode::ThreeD;
        self.view = look_along_z(self.settings.eye_z);
        self.projection = Matrix4::new_perspective(
            self.width as f32 / self.height as f32,
            self.settings.fov_degrees.to_radians(),
            self.settings.near,
            self.settings.far,
        );
    }

    /// Uploads view, projection and eye position to the program in use.
    pub fn apply(&self, gfx: &mut dyn GraphicsContext) {
        debug_assert!(gfx.current_program().is_some(), "camera applied with no program in use");
        gfx.set_uniform(uniforms::VIEW, UniformValue::Mat4(self.view));
        gfx.set_uniform(uniforms::PROJECTION, UniformValue::Mat4(self.projection));
        gfx.set_uniform(uniforms::VIEW_POSITION, UniformValue::Vec3(self.eye().coords));
    }

    /// New viewport size, the active mode is rebuilt for it.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        self.width = width;
        self.height = height;
        match self.mode {
            CameraMode::TwoD => self.reset_for_2d(),
            CameraMode::ThreeD => self.reset_for_3d(),
        }
        return Ok(());
    }

    /// Clip space position of a world point.
    pub fn project(&self, point: Point3<f32>) -> Vector4<f32> {
        return self.projection * self.view * point.to_homogeneous();
    }

    pub fn eye(&self) -> Point3<f32> {
        let z = match self.mode {
            CameraMode::TwoD => self.settings.eye_z_2d,
            CameraMode::ThreeD => self.settings.eye_z,
        };
        return Point3::new(0.0, 0.0, z);
    }

    pub fn mode(&self) -> CameraMode {
        return self.mode;
    }

    pub fn view(&self) -> &Matrix4<f32> {
        return &self.view;
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        return &self.projection;
    }

    pub fn width(&self) -> u32 {
        return self.width;
    }

    pub fn height(&self) -> u32 {
        return self.height;
    }
}

fn look_along_z(eye_z: f32) -> Matrix4<f32> {
    return Matrix4::look_at_rh(
        &Point3::new(0.0, 0.0, eye_z),
        &Point3::origin(),
        &Vector3::y(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::builtin_shader;
    use crate::graphics::SoftwareContext;

    const EPS: f32 = 1e-5;

    fn ndc(clip: Vector4<f32>) -> Vector3<f32> {
        return clip.xyz() / clip.w;
    }

    #[test]
    fn two_d_maps_viewport_corners_to_clip_extremes() {
        let camera = Camera::new(800, 600, CameraSettings::default()).unwrap();
        let bottom_left = ndc(camera.project(Point3::new(0.0, 0.0, 1.0)));
        let top_right = ndc(camera.project(Point3::new(800.0, 600.0, 1.0)));
        assert!((bottom_left.x + 1.0).abs() < EPS && (bottom_left.y + 1.0).abs() < EPS);
        assert!((top_right.x - 1.0).abs() < EPS && (top_right.y - 1.0).abs() < EPS);
        assert!(bottom_left.z.abs() <= 1.0);
    }

    #[test]
    fn mode_round_trip_is_bit_identical() {
        let mut camera = Camera::new(640, 480, CameraSettings::default()).unwrap();
        let view = *camera.view();
        let projection = *camera.projection();
        camera.reset_for_3d();
        assert_eq!(camera.mode(), CameraMode::ThreeD);
        assert_ne!(*camera.projection(), projection);
        camera.reset_for_2d();
        assert_eq!(*camera.view(), view);
        assert_eq!(*camera.projection(), projection);
    }

    #[test]
    fn three_d_centers_the_origin() {
        let mut camera = Camera::new(100, 100, CameraSettings::default()).unwrap();
        camera.reset_for_3d();
        let center = ndc(camera.project(Point3::origin()));
        assert!(center.x.abs() < EPS && center.y.abs() < EPS);
        assert!(center.z > -1.0 && center.z < 1.0);
        assert_eq!(camera.eye(), Point3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn resize_keeps_the_mode() {
        let mut camera = Camera::new(100, 100, CameraSettings::default()).unwrap();
        camera.reset_for_3d();
        camera.resize(200, 100).unwrap();
        assert_eq!(camera.mode(), CameraMode::ThreeD);
        assert_eq!((camera.width(), camera.height()), (200, 100));
        assert!(camera.resize(0, 100).is_err());
        assert!(Camera::new(10, 0, CameraSettings::default()).is_err());
    }

    #[test]
    fn apply_uploads_to_the_program_in_use() {
        let mut gfx = SoftwareContext::new(10, 10).unwrap();
        let program = gfx
            .compile_program(
                builtin_shader("shape/vertex_shader_light.glsl").unwrap(),
                builtin_shader("shape/fragment_shader_light.glsl").unwrap(),
            )
            .unwrap();
        gfx.use_program(program);
        let mut camera = Camera::new(10, 10, CameraSettings::default()).unwrap();
        camera.reset_for_3d();
        camera.apply(&mut gfx);
        assert_eq!(gfx.uniform(program, uniforms::VIEW), Some(UniformValue::Mat4(*camera.view())));
        assert_eq!(
            gfx.uniform(program, uniforms::VIEW_POSITION),
            Some(UniformValue::Vec3(Vector3::new(0.0, 0.0, 5.0)))
        );
    }
}

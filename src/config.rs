use image::Rgba;
use nalgebra as na;
use na::{vector, Vector3};

use crate::camera::CameraSettings;
use crate::error::{RenderError, Result};
use crate::light::{Material, SceneLights};

/// How the overlay polygon moves: its centre is `(elapsed / speed_divisor + offset) * k`.
/// It drifts off the viewport after a while unless `wrap` is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonAnimation {
    pub speed_divisor: f32,
    pub offset: f32,
    pub size: f32,              // Width in reference pixels, scaled by kx.
    pub aspect_correction: f32, // Height over width.
    pub wrap: bool,             // Keep the centre inside the viewport.
}

impl Default for PolygonAnimation {
    fn default() -> Self {
        return Self {
            speed_divisor: 100.0,
            offset: 100.0,
            size: 30.0,
            aspect_correction: 1.1,
            wrap: false,
        };
    }
}

/// Debug axes drawn in the lit pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxesSettings {
    pub show: bool,
    pub length: f32,
    pub arrow_length: f32,
    pub arrow_width: f32,
}

impl Default for AxesSettings {
    fn default() -> Self {
        return Self {
            show: false,
            length: 6.0,
            arrow_length: 0.5,
            arrow_width: 0.2,
        };
    }
}

/// Tunables of the frame. The defaults reproduce the demo scene.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub camera: CameraSettings,
    pub rotation_divisor: f32,       // Milliseconds per degree of shape spin.
    pub rotation_axis: Vector3<f32>,
    pub background: Rgba<u8>,
    pub offscreen_clear: Rgba<u8>,
    pub reference_size: (u32, u32),  // Viewport size the 2D overlay was laid out for.
    pub polygon: PolygonAnimation,
    pub axes: AxesSettings,
    pub lights: SceneLights,
    pub material: Material,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        return Self {
            camera: CameraSettings::default(),
            rotation_divisor: 50.0,
            rotation_axis: vector![0.0, 1.0, 1.0],
            background: Rgba([255, 255, 255, 255]),
            offscreen_clear: Rgba([0, 0, 0, 255]),
            reference_size: (800, 800),
            polygon: PolygonAnimation::default(),
            axes: AxesSettings::default(),
            lights: SceneLights::default(),
            material: Material::default(),
        };
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.rotation_divisor > 0.0) || !(self.polygon.speed_divisor > 0.0) {
            return Err(RenderError::InvalidConfig(String::from(
                "speed divisors must be positive",
            )));
        }
        let camera = &self.camera;
        if !(camera.near > 0.0 && camera.far > camera.near) {
            return Err(RenderError::InvalidConfig(format!(
                "bad clip planes near {} far {}",
                camera.near, camera.far
            )));
        }
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(RenderError::InvalidConfig(format!(
                "field of view {} out of range",
                camera.fov_degrees
            )));
        }
        if self.reference_size.0 == 0 || self.reference_size.1 == 0 {
            return Err(RenderError::InvalidViewport {
                width: self.reference_size.0,
                height: self.reference_size.1,
            });
        }
        self.lights.validate()?;
        self.material.validate()?;
        return Ok(());
    }
}

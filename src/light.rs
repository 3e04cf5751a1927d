//! Light and material descriptors plus the Blinn-Phong equations the lit kernel evaluates.
//!
//! Descriptors are plain values: `apply` copies them into the current program's uniforms and
//! nothing keeps a reference to them afterwards.

use nalgebra as na;
use na::{vector, Vector3};

use crate::error::{RenderError, Result};
use crate::graphics::{GraphicsContext, UniformValue};
use crate::uniforms;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Vector3<f32>,  // Normalized rgb.
}

impl Default for AmbientLight {
    fn default() -> Self {
        return Self {
            color: vector![0.3, 0.3, 0.3],
        };
    }
}

impl AmbientLight {
    pub fn apply(&self, gfx: &mut dyn GraphicsContext) {
        gfx.set_uniform(uniforms::AMBIENT_COLOR, UniformValue::Vec3(self.color));
    }
}

/// Light infinitely far away, `direction` is where the rays travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectedLight {
    pub direction: Vector3<f32>,
    pub color: Vector3<f32>,
    pub diffuse: f32,
    pub specular: f32,
}

impl Default for DirectedLight {
    fn default() -> Self {
        return Self {
            direction: vector![0.0, -1.0, 0.0],
            color: vector![1.0, 1.0, 1.0],
            diffuse: 1.0,
            specular: 0.5,
        };
    }
}

impl DirectedLight {
    pub fn apply(&self, gfx: &mut dyn GraphicsContext, index: usize) {
        let direction = self.direction.try_normalize(f32::EPSILON).unwrap_or(self.direction);
        gfx.set_uniform(&uniforms::directed(index, "direction"), UniformValue::Vec3(direction));
        gfx.set_uniform(&uniforms::directed(index, "color"), UniformValue::Vec3(self.color));
        gfx.set_uniform(&uniforms::directed(index, "diffuse"), UniformValue::Float(self.diffuse));
        gfx.set_uniform(&uniforms::directed(index, "specular"), UniformValue::Float(self.specular));
    }
}

/// Point light with a spot cone. Cut-offs are cosines, `cut_off` bounds the full intensity
/// cone and `outer_cut_off` the zero intensity one, so `outer_cut_off <= cut_off`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceLight {
    pub position: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub color: Vector3<f32>,
    pub diffuse: f32,
    pub specular: f32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub cut_off: f32,
    pub outer_cut_off: f32,
}

impl Default for SourceLight {
    fn default() -> Self {
        return Self::spot(vector![0.0, 0.0, 5.0], vector![0.0, 0.0, -1.0], 12.5, 17.5);
    }
}

impl SourceLight {
    /// Spot light with cone half-angles in degrees. The angles may come in either order.
    pub fn spot(position: Vector3<f32>, direction: Vector3<f32>, inner_degrees: f32, outer_degrees: f32) -> Self {
        let inner = inner_degrees.min(outer_degrees).to_radians();
        let outer = inner_degrees.max(outer_degrees).to_radians();
        return Self {
            position,
            direction,
            color: vector![1.0, 1.0, 1.0],
            diffuse: 1.0,
            specular: 1.0,
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
            cut_off: inner.cos(),
            outer_cut_off: outer.cos(),
        };
    }

    pub fn apply(&self, gfx: &mut dyn GraphicsContext) {
        debug_assert!(self.outer_cut_off <= self.cut_off, "spot cone is inverted");
        let direction = self.direction.try_normalize(f32::EPSILON).unwrap_or(self.direction);
        gfx.set_uniform(uniforms::SOURCE_POSITION, UniformValue::Vec3(self.position));
        gfx.set_uniform(uniforms::SOURCE_DIRECTION, UniformValue::Vec3(direction));
        gfx.set_uniform(uniforms::SOURCE_COLOR, UniformValue::Vec3(self.color));
        gfx.set_uniform(uniforms::SOURCE_DIFFUSE, UniformValue::Float(self.diffuse));
        gfx.set_uniform(uniforms::SOURCE_SPECULAR, UniformValue::Float(self.specular));
        gfx.set_uniform(uniforms::SOURCE_CONSTANT, UniformValue::Float(self.constant));
        gfx.set_uniform(uniforms::SOURCE_LINEAR, UniformValue::Float(self.linear));
        gfx.set_uniform(uniforms::SOURCE_QUADRATIC, UniformValue::Float(self.quadratic));
        gfx.set_uniform(uniforms::SOURCE_CUT_OFF, UniformValue::Float(self.cut_off));
        gfx.set_uniform(uniforms::SOURCE_OUTER_CUT_OFF, UniformValue::Float(self.outer_cut_off));
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        return Self {
            ambient: vector![1.0, 1.0, 1.0],
            diffuse: vector![1.0, 1.0, 1.0],
            specular: vector![1.0, 1.0, 1.0],
            shininess: 1.1,
        };
    }
}

impl Material {
    pub fn apply(&self, gfx: &mut dyn GraphicsContext) {
        gfx.set_uniform(uniforms::MATERIAL_AMBIENT, UniformValue::Vec3(self.ambient));
        gfx.set_uniform(uniforms::MATERIAL_DIFFUSE, UniformValue::Vec3(self.diffuse));
        gfx.set_uniform(uniforms::MATERIAL_SPECULAR, UniformValue::Vec3(self.specular));
        gfx.set_uniform(uniforms::MATERIAL_SHININESS, UniformValue::Float(self.shininess));
    }

    pub fn validate(&self) -> Result<()> {
        check_color("material ambient", self.ambient)?;
        check_color("material diffuse", self.diffuse)?;
        check_color("material specular", self.specular)?;
        check_scalar("material shininess", self.shininess)?;
        return Ok(());
    }

    /// Reads a material back from uniform storage, missing slots read as zero.
    pub fn from_uniforms(lookup: &dyn Fn(&str) -> Option<UniformValue>) -> Self {
        return Self {
            ambient: read_vec3(lookup, uniforms::MATERIAL_AMBIENT),
            diffuse: read_vec3(lookup, uniforms::MATERIAL_DIFFUSE),
            specular: read_vec3(lookup, uniforms::MATERIAL_SPECULAR),
            shininess: read_float(lookup, uniforms::MATERIAL_SHININESS),
        };
    }
}

/// Every light of the scene, uploaded together by the lit pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLights {
    pub ambient: AmbientLight,
    pub directed: Vec<DirectedLight>,
    pub source: SourceLight,
}

impl Default for SceneLights {
    /// The demo scene: one grey directed light from +x and a spot light parked on the x axis.
    fn default() -> Self {
        let directed = DirectedLight {
            direction: vector![-1.0, 0.0, 0.0],
            color: vector![0.9, 0.9, 0.9],
            diffuse: 0.2,
            specular: 0.8,
        };
        let mut source = SourceLight::spot(vector![5.0, 0.0, 0.0], vector![-0.3, 0.0, 0.0], 30.0, 40.0);
        source.diffuse = 0.8;
        source.specular = 0.9;
        source.constant = 1.0;
        source.linear = 0.01;
        source.quadratic = 0.01;
        source.color = vector![0.5, 0.5, 0.5];

        return Self {
            ambient: AmbientLight::default(),
            directed: vec![directed],
            source,
        };
    }
}

impl SceneLights {
    pub fn apply(&self, gfx: &mut dyn GraphicsContext) {
        debug_assert!(self.directed.len() <= uniforms::MAX_DIRECTED_LIGHTS);
        self.ambient.apply(gfx);
        let count = self.directed.len().min(uniforms::MAX_DIRECTED_LIGHTS);
        for (index, light) in self.directed.iter().take(count).enumerate() {
            light.apply(gfx, index);
        }
        gfx.set_uniform(uniforms::DIRECTED_COUNT, UniformValue::Int(count as i32));
        self.source.apply(gfx);
    }

    pub fn validate(&self) -> Result<()> {
        check_color("ambient color", self.ambient.color)?;
        if self.directed.len() > uniforms::MAX_DIRECTED_LIGHTS {
            return Err(RenderError::InvalidLight(format!(
                "{} directed lights, at most {} are supported",
                self.directed.len(),
                uniforms::MAX_DIRECTED_LIGHTS
            )));
        }
        for light in &self.directed {
            check_color("directed light color", light.color)?;
            check_scalar("directed light diffuse", light.diffuse)?;
            check_scalar("directed light specular", light.specular)?;
        }

        let source = &self.source;
        check_color("source light color", source.color)?;
        check_scalar("source light diffuse", source.diffuse)?;
        check_scalar("source light specular", source.specular)?;
        check_scalar("source light constant", source.constant)?;
        check_scalar("source light linear", source.linear)?;
        check_scalar("source light quadratic", source.quadratic)?;
        if source.constant + source.linear + source.quadratic <= 0.0 {
            return Err(RenderError::InvalidLight(String::from(
                "source light attenuation terms are all zero",
            )));
        }
        if source.outer_cut_off > source.cut_off {
            return Err(RenderError::InvalidLight(format!(
                "outer cut-off cosine {} exceeds inner cut-off cosine {}",
                source.outer_cut_off, source.cut_off
            )));
        }
        return Ok(());
    }

    /// Reads the lights back from uniform storage, missing slots read as zero.
    pub fn from_uniforms(lookup: &dyn Fn(&str) -> Option<UniformValue>) -> Self {
        let count = match lookup(uniforms::DIRECTED_COUNT) {
            Some(UniformValue::Int(count)) => (count.max(0) as usize).min(uniforms::MAX_DIRECTED_LIGHTS),
            _ => 0,
        };
        let directed = (0..count)
            .map(|index| DirectedLight {
                direction: read_vec3(lookup, &uniforms::directed(index, "direction")),
                color: read_vec3(lookup, &uniforms::directed(index, "color")),
                diffuse: read_float(lookup, &uniforms::directed(index, "diffuse")),
                specular: read_float(lookup, &uniforms::directed(index, "specular")),
            })
            .collect();
        let source = SourceLight {
            position: read_vec3(lookup, uniforms::SOURCE_POSITION),
            direction: read_vec3(lookup, uniforms::SOURCE_DIRECTION),
            color: read_vec3(lookup, uniforms::SOURCE_COLOR),
            diffuse: read_float(lookup, uniforms::SOURCE_DIFFUSE),
            specular: read_float(lookup, uniforms::SOURCE_SPECULAR),
            constant: read_float(lookup, uniforms::SOURCE_CONSTANT),
            linear: read_float(lookup, uniforms::SOURCE_LINEAR),
            quadratic: read_float(lookup, uniforms::SOURCE_QUADRATIC),
            cut_off: read_float(lookup, uniforms::SOURCE_CUT_OFF),
            outer_cut_off: read_float(lookup, uniforms::SOURCE_OUTER_CUT_OFF),
        };

        return Self {
            ambient: AmbientLight {
                color: read_vec3(lookup, uniforms::AMBIENT_COLOR),
            },
            directed,
            source,
        };
    }
}

fn read_vec3(lookup: &dyn Fn(&str) -> Option<UniformValue>, name: &str) -> Vector3<f32> {
    return match lookup(name) {
        Some(UniformValue::Vec3(value)) => value,
        _ => Vector3::zeros(),
    };
}

fn read_float(lookup: &dyn Fn(&str) -> Option<UniformValue>, name: &str) -> f32 {
    return match lookup(name) {
        Some(UniformValue::Float(value)) => value,
        _ => 0.0,
    };
}

fn check_color(what: &str, color: Vector3<f32>) -> Result<()> {
    if color.iter().any(|c| !c.is_finite() || *c < 0.0) {
        return Err(RenderError::InvalidLight(format!("{} {:?} has a negative component", what, color)));
    }
    return Ok(());
}

fn check_scalar(what: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(RenderError::InvalidLight(format!("{} is {}", what, value)));
    }
    return Ok(());
}

/// Smooth spot cone factor for a fragment at cosine `cos_theta` off the spot axis.
/// 1 inside the inner cone, 0 outside the outer one, linear in between.
pub fn spot_falloff(cos_theta: f32, cut_off: f32, outer_cut_off: f32) -> f32 {
    let epsilon = cut_off - outer_cut_off;
    if epsilon <= f32::EPSILON {
        // Hard edged cone.
        return if cos_theta >= cut_off { 1.0 } else { 0.0 };
    }
    return ((cos_theta - outer_cut_off) / epsilon).clamp(0.0, 1.0);
}

/// Distance attenuation `1 / (constant + linear * d + quadratic * d^2)`.
pub fn attenuation(distance: f32, constant: f32, linear: f32, quadratic: f32) -> f32 {
    let denominator = constant + linear * distance + quadratic * distance * distance;
    if denominator <= f32::EPSILON {
        return 0.0;
    }
    return 1.0 / denominator;
}

/// Diffuse plus specular response of one light.
/// `n`, `l` (towards the light) and `v` (towards the viewer) are unit vectors.
pub fn blinn_phong(
    n: Vector3<f32>,
    l: Vector3<f32>,
    v: Vector3<f32>,
    color: Vector3<f32>,
    diffuse: f32,
    specular: f32,
    material: &Material,
) -> Vector3<f32> {
    let n_dot_l = n.dot(&l).max(0.0);
    let diffuse_term = (color * (n_dot_l * diffuse)).component_mul(&material.diffuse);

    // No highlight on surfaces the light can't reach.
    let spec_coef = match (l + v).try_normalize(f32::EPSILON) {
        Some(half) if n_dot_l > 0.0 => n.dot(&half).max(0.0).powf(material.shininess),
        _ => 0.0,
    };
    let specular_term = (color * (spec_coef * specular)).component_mul(&material.specular);

    return diffuse_term + specular_term;
}

/// Surface sample as the fragment stage sees it.
#[derive(Debug, Clone, Copy)]
pub struct SurfacePoint {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,       // Unit length.
    pub view_position: Vector3<f32>,
}

/// Total light reaching `point`, before texturing and unclamped.
pub fn shade(point: &SurfacePoint, lights: &SceneLights, material: &Material) -> Vector3<f32> {
    let n = point.normal;
    let v = (point.view_position - point.position)
        .try_normalize(f32::EPSILON)
        .unwrap_or(n);

    let mut total = material.ambient.component_mul(&lights.ambient.color);
    for light in &lights.directed {
        let Some(l) = (-light.direction).try_normalize(f32::EPSILON) else {
            continue;
        };
        total += blinn_phong(n, l, v, light.color, light.diffuse, light.specular, material);
    }

    let source = &lights.source;
    let to_light = source.position - point.position;
    let distance = to_light.norm();
    if distance > f32::EPSILON {
        let l = to_light / distance;
        let axis = (-source.direction).try_normalize(f32::EPSILON).unwrap_or(l);
        let cone = spot_falloff(l.dot(&axis), source.cut_off, source.outer_cut_off);
        if cone > 0.0 {
            let falloff = cone * attenuation(distance, source.constant, source.linear, source.quadratic);
            total += blinn_phong(n, l, v, source.color, source.diffuse, source.specular, material) * falloff;
        }
    }

    return total;
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn dark_source() -> SourceLight {
        let mut source = SourceLight::default();
        source.diffuse = 0.0;
        source.specular = 0.0;
        return source;
    }

    #[test]
    fn falloff_is_full_inside_inner_cone() {
        let (cut_off, outer) = (30f32.to_radians().cos(), 40f32.to_radians().cos());
        assert_eq!(spot_falloff(1.0, cut_off, outer), 1.0);
        assert_eq!(spot_falloff(cut_off, cut_off, outer), 1.0);
    }

    #[test]
    fn falloff_is_zero_outside_outer_cone() {
        let (cut_off, outer) = (30f32.to_radians().cos(), 40f32.to_radians().cos());
        assert_eq!(spot_falloff(outer, cut_off, outer), 0.0);
        assert_eq!(spot_falloff(-1.0, cut_off, outer), 0.0);
    }

    #[test]
    fn falloff_increases_strictly_between_cutoffs() {
        let (cut_off, outer) = (30f32.to_radians().cos(), 40f32.to_radians().cos());
        let mut previous = 0.0;
        for step in 1..100 {
            let cos_theta = outer + (cut_off - outer) * step as f32 / 100.0;
            let factor = spot_falloff(cos_theta, cut_off, outer);
            assert!(factor > previous, "falloff not increasing at step {}", step);
            assert!(factor < 1.0);
            previous = factor;
        }
    }

    #[test]
    fn equal_cutoffs_make_a_hard_cone() {
        assert_eq!(spot_falloff(0.9, 0.8, 0.8), 1.0);
        assert_eq!(spot_falloff(0.7, 0.8, 0.8), 0.0);
    }

    #[test]
    fn attenuation_follows_the_quadratic() {
        assert!((attenuation(0.0, 1.0, 0.01, 0.01) - 1.0).abs() < EPS);
        assert!((attenuation(10.0, 1.0, 0.1, 0.01) - 1.0 / 3.0).abs() < EPS);
        assert_eq!(attenuation(3.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn directed_light_facing_surface_gives_expected_terms() {
        let lights = SceneLights {
            ambient: AmbientLight {
                color: vector![0.3, 0.3, 0.3],
            },
            directed: vec![DirectedLight {
                direction: vector![-1.0, 0.0, 0.0],
                color: vector![0.9, 0.9, 0.9],
                diffuse: 0.2,
                specular: 0.8,
            }],
            source: dark_source(),
        };
        let material = Material::default();

        // Viewer straight along the normal, the half vector equals the normal.
        let head_on = SurfacePoint {
            position: Vector3::zeros(),
            normal: vector![1.0, 0.0, 0.0],
            view_position: vector![5.0, 0.0, 0.0],
        };
        let color = shade(&head_on, &lights, &material);
        let expected = 0.3 + 0.2 * 0.9 + 0.8 * 0.9;
        assert!((color.x - expected).abs() < EPS);
        assert!((color.y - color.z).abs() < EPS);

        // Viewer at 90 degrees, the half vector is 45 degrees off the normal.
        let grazing = SurfacePoint {
            view_position: vector![0.0, 5.0, 0.0],
            ..head_on
        };
        let color = shade(&grazing, &lights, &material);
        let specular = 0.8 * 0.9 * std::f32::consts::FRAC_1_SQRT_2.powf(1.1);
        assert!((color.x - (0.3 + 0.18 + specular)).abs() < EPS);
    }

    #[test]
    fn surface_facing_away_gets_only_ambient() {
        let lights = SceneLights {
            source: dark_source(),
            ..SceneLights::default()
        };
        let point = SurfacePoint {
            position: Vector3::zeros(),
            normal: vector![-1.0, 0.0, 0.0],
            view_position: vector![-5.0, 0.0, 0.0],
        };
        let color = shade(&point, &lights, &Material::default());
        assert!((color - lights.ambient.color).norm() < EPS);
    }

    #[test]
    fn spot_light_outside_cone_contributes_nothing() {
        let lights = SceneLights {
            ambient: AmbientLight {
                color: Vector3::zeros(),
            },
            directed: Vec::new(),
            source: SourceLight::spot(vector![0.0, 0.0, 5.0], vector![0.0, 0.0, -1.0], 10.0, 15.0),
        };
        let normal = vector![0.0, 0.0, 1.0];
        let inside = SurfacePoint {
            position: Vector3::zeros(),
            normal,
            view_position: vector![0.0, 0.0, 5.0],
        };
        let outside = SurfacePoint {
            position: vector![5.0, 0.0, 0.0],
            ..inside
        };
        assert!(shade(&inside, &lights, &Material::default()).x > 0.0);
        assert_eq!(shade(&outside, &lights, &Material::default()), Vector3::zeros());
    }

    #[test]
    fn spot_builder_orders_cutoffs() {
        let light = SourceLight::spot(Vector3::zeros(), vector![0.0, 0.0, -1.0], 40.0, 30.0);
        assert!(light.outer_cut_off <= light.cut_off);
        assert!((light.cut_off - 30f32.to_radians().cos()).abs() < EPS);
    }

    #[test]
    fn validation_rejects_bad_parameters() {
        assert!(SceneLights::default().validate().is_ok());

        let mut inverted = SceneLights::default();
        std::mem::swap(&mut inverted.source.cut_off, &mut inverted.source.outer_cut_off);
        assert!(matches!(inverted.validate(), Err(RenderError::InvalidLight(_))));

        let mut negative = SceneLights::default();
        negative.directed[0].color = vector![-0.1, 0.0, 0.0];
        assert!(negative.validate().is_err());

        let material = Material {
            shininess: -1.0,
            ..Material::default()
        };
        assert!(material.validate().is_err());
    }
}

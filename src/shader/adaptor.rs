//! Binding contracts between a shader program and the pass that feeds it.

use crate::graphics::{GraphicsContext, UniformValue};
use crate::uniforms;

/// What a program must declare and how its attributes and samplers are wired.
pub trait ShaderAdaptor {
    fn name(&self) -> &'static str;
    /// Attribute name with its fixed location.
    fn attributes(&self) -> &'static [(&'static str, u32)];
    /// Uniforms the pass uploads; a program lacking one is rejected at construction.
    fn required_uniforms(&self) -> Vec<String>;
    /// Points the sampler uniforms at their texture units.
    fn bind_samplers(&self, gfx: &mut dyn GraphicsContext);
}

/// Textured geometry: quads of the present pass and the skybox.
pub struct MainShaderAdaptor;

impl ShaderAdaptor for MainShaderAdaptor {
    fn name(&self) -> &'static str {
        return "main";
    }

    fn attributes(&self) -> &'static [(&'static str, u32)] {
        return &[uniforms::ATTR_POSITION, uniforms::ATTR_UV];
    }

    fn required_uniforms(&self) -> Vec<String> {
        return [uniforms::MODEL, uniforms::VIEW, uniforms::PROJECTION, uniforms::TEXTURE]
            .iter()
            .map(|name| name.to_string())
            .collect();
    }

    fn bind_samplers(&self, gfx: &mut dyn GraphicsContext) {
        gfx.set_uniform(uniforms::TEXTURE, UniformValue::Int(uniforms::TEXTURE_UNIT as i32));
    }
}

/// Lit meshes: lights, material, albedo and normal map.
pub struct LightShaderAdaptor;

impl ShaderAdaptor for LightShaderAdaptor {
    fn name(&self) -> &'static str {
        return "light";
    }

    fn attributes(&self) -> &'static [(&'static str, u32)] {
        return &[
            uniforms::ATTR_POSITION,
            uniforms::ATTR_UV,
            uniforms::ATTR_NORMAL,
            uniforms::ATTR_TANGENT,
        ];
    }

    fn required_uniforms(&self) -> Vec<String> {
        let mut names: Vec<String> = [
            uniforms::MODEL,
            uniforms::VIEW,
            uniforms::PROJECTION,
            uniforms::VIEW_POSITION,
            uniforms::TEXTURE,
            uniforms::NORMAL_MAP,
            uniforms::USE_NORMAL_MAP,
            uniforms::AMBIENT_COLOR,
            uniforms::DIRECTED_COUNT,
            uniforms::MATERIAL_AMBIENT,
            uniforms::MATERIAL_DIFFUSE,
            uniforms::MATERIAL_SPECULAR,
            uniforms::MATERIAL_SHININESS,
            uniforms::SOURCE_POSITION,
            uniforms::SOURCE_DIRECTION,
            uniforms::SOURCE_COLOR,
            uniforms::SOURCE_DIFFUSE,
            uniforms::SOURCE_SPECULAR,
            uniforms::SOURCE_CONSTANT,
            uniforms::SOURCE_LINEAR,
            uniforms::SOURCE_QUADRATIC,
            uniforms::SOURCE_CUT_OFF,
            uniforms::SOURCE_OUTER_CUT_OFF,
        ]
        .iter()
        .map(|name| name.to_string())
        .collect();
        // Only the first directed light has to exist.
        for field in ["direction", "color", "diffuse", "specular"] {
            names.push(uniforms::directed(0, field));
        }
        return names;
    }

    fn bind_samplers(&self, gfx: &mut dyn GraphicsContext) {
        gfx.set_uniform(uniforms::TEXTURE, UniformValue::Int(uniforms::TEXTURE_UNIT as i32));
        gfx.set_uniform(uniforms::NORMAL_MAP, UniformValue::Int(uniforms::NORMAL_MAP_UNIT as i32));
    }
}

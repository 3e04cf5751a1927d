//! Uniform and attribute names shared by the shader sources, the adaptors and the components
//! that upload values.

pub const MODEL: &str = "u_model";
pub const VIEW: &str = "u_view";
pub const PROJECTION: &str = "u_projection";
pub const VIEW_POSITION: &str = "u_view_position";

pub const TEXTURE: &str = "u_texture";
pub const NORMAL_MAP: &str = "u_normal_map";
pub const USE_NORMAL_MAP: &str = "u_use_normal_map";

pub const AMBIENT_COLOR: &str = "u_ambient.color";
pub const DIRECTED_COUNT: &str = "u_directed_count";
pub const MAX_DIRECTED_LIGHTS: usize = 4;

pub const MATERIAL_AMBIENT: &str = "u_material.ambient";
pub const MATERIAL_DIFFUSE: &str = "u_material.diffuse";
pub const MATERIAL_SPECULAR: &str = "u_material.specular";
pub const MATERIAL_SHININESS: &str = "u_material.shininess";

pub const SOURCE_POSITION: &str = "u_source.position";
pub const SOURCE_DIRECTION: &str = "u_source.direction";
pub const SOURCE_COLOR: &str = "u_source.color";
pub const SOURCE_DIFFUSE: &str = "u_source.diffuse";
pub const SOURCE_SPECULAR: &str = "u_source.specular";
pub const SOURCE_CONSTANT: &str = "u_source.constant";
pub const SOURCE_LINEAR: &str = "u_source.linear";
pub const SOURCE_QUADRATIC: &str = "u_source.quadratic";
pub const SOURCE_CUT_OFF: &str = "u_source.cut_off";
pub const SOURCE_OUTER_CUT_OFF: &str = "u_source.outer_cut_off";

/// Texture units the samplers read from.
pub const TEXTURE_UNIT: u32 = 0;
pub const NORMAL_MAP_UNIT: u32 = 1;

/// Fixed attribute locations.
pub const ATTR_POSITION: (&str, u32) = ("a_position", 0);
pub const ATTR_UV: (&str, u32) = ("a_uv", 1);
pub const ATTR_NORMAL: (&str, u32) = ("a_normal", 2);
pub const ATTR_TANGENT: (&str, u32) = ("a_tangent", 3);

/// Name of one field of the `index`-th directed light.
pub fn directed(index: usize, field: &str) -> String {
    return format!("u_directed[{}].{}", index, field);
}

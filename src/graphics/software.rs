//! CPU implementation of `GraphicsContext`.

use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use nalgebra as na;
use na::{Point3, Vector2, Vector3, Vector4};

use super::glsl::{self, ProgramInterface};
use super::kernel::{DrawState, Samplers, Varyings};
use super::raster::{self, RasterState, Target};
use super::texture::{self, TextureData};
use super::{
    DepthMode, GraphicsContext, Line, MeshHandle, ProgramHandle, TargetHandle, TextureHandle,
    UniformValue,
};
use crate::error::{RenderError, Result};
use crate::mesh::{MeshData, Vertex};
use crate::uniforms;

const TEXTURE_UNITS: usize = 4;

struct Program {
    interface: ProgramInterface,
    uniforms: HashMap<String, UniformValue>,
    attribute_locations: HashMap<String, u32>,
}

impl Program {
    /// Location an attribute reads from: the bound one, else its declaration order.
    fn location(&self, name: &str) -> Option<u32> {
        if let Some(location) = self.attribute_locations.get(name) {
            return Some(*location);
        }
        return self
            .interface
            .attributes
            .iter()
            .position(|attribute| attribute == name)
            .map(|index| index as u32);
    }
}

/// Software rasterizer with a default surface and any number of offscreen targets.
pub struct SoftwareContext {
    surface: Target,
    targets: Vec<Option<Target>>,
    textures: Vec<Option<TextureData>>,
    programs: Vec<Option<Program>>,
    meshes: Vec<Option<MeshData>>,
    units: [Option<TextureHandle>; TEXTURE_UNITS],
    current_program: Option<ProgramHandle>,
    current_target: Option<TargetHandle>,
    depth_mode: DepthMode,
    blend: bool,
    draw_calls: u64,
}

/// Read only view of the texture storage during a draw.
struct TextureView<'a> {
    textures: &'a [Option<TextureData>],
    targets: &'a [Option<Target>],
    units: &'a [Option<TextureHandle>; TEXTURE_UNITS],
}

impl TextureView<'_> {
    fn data(&self, unit: u32) -> Option<&TextureData> {
        let handle = (*self.units.get(unit as usize)?)?;
        return self.textures.get(handle.id() as usize)?.as_ref();
    }
}

impl Samplers for TextureView<'_> {
    fn sample_2d(&self, unit: u32, uv: Vector2<f32>) -> Option<Vector4<f32>> {
        return match self.data(unit)? {
            TextureData::Image(image) => Some(texture::sample_2d(image, uv)),
            TextureData::Target(index) => {
                let target = self.targets.get(*index)?.as_ref()?;
                Some(texture::sample_2d(&target.color, uv))
            }
            TextureData::Cubemap(_) => None,
        };
    }

    fn sample_cube(&self, unit: u32, direction: Vector3<f32>) -> Option<Vector4<f32>> {
        return match self.data(unit)? {
            TextureData::Cubemap(faces) => Some(texture::sample_cube(faces, direction)),
            _ => None,
        };
    }
}

fn attribute(vertex: &Vertex, location: u32) -> Vector3<f32> {
    return match location {
        0 => vertex.position,
        1 => Vector3::new(vertex.uv.x, vertex.uv.y, 0.0),
        2 => vertex.normal,
        3 => vertex.tangent,
        _ => Vector3::zeros(),
    };
}

fn store<T>(slots: &mut Vec<Option<T>>, value: T) -> u32 {
    if let Some(index) = slots.iter().position(Option::is_none) {
        slots[index] = Some(value);
        return index as u32;
    }
    slots.push(Some(value));
    return (slots.len() - 1) as u32;
}

impl SoftwareContext {
    /// Creates a context whose default surface is `width` x `height`, cleared to opaque black.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        return Ok(Self {
            surface: Target::new(width, height, Rgba([0, 0, 0, 255])),
            targets: Vec::new(),
            textures: Vec::new(),
            programs: Vec::new(),
            meshes: Vec::new(),
            units: [None; TEXTURE_UNITS],
            current_program: None,
            current_target: None,
            depth_mode: DepthMode::Less,
            blend: false,
            draw_calls: 0,
        });
    }

    /// Color attachment of the default surface.
    pub fn surface(&self) -> &RgbaImage {
        return &self.surface.color;
    }

    /// Reallocates the default surface, e.g. after the window changed size.
    pub fn resize_surface(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        self.surface = Target::new(width, height, Rgba([0, 0, 0, 255]));
        return Ok(());
    }

    /// Color attachment of an offscreen target.
    pub fn target_image(&self, target: TargetHandle) -> Option<&RgbaImage> {
        return self
            .targets
            .get(target.id() as usize)?
            .as_ref()
            .map(|target| &target.color);
    }

    /// Last value set for `name` on `program`.
    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        return self.program(program)?.uniforms.get(name).copied();
    }

    pub fn program_interface(&self, program: ProgramHandle) -> Option<&ProgramInterface> {
        return self.program(program).map(|program| &program.interface);
    }

    pub fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        return self.program(program)?.attribute_locations.get(name).copied();
    }

    pub fn depth_mode(&self) -> DepthMode {
        return self.depth_mode;
    }

    pub fn blend_enabled(&self) -> bool {
        return self.blend;
    }

    /// Number of `draw_indexed` calls that reached the rasterizer.
    pub fn draw_calls(&self) -> u64 {
        return self.draw_calls;
    }

    pub fn live_textures(&self) -> usize {
        return self.textures.iter().filter(|slot| slot.is_some()).count();
    }

    pub fn live_programs(&self) -> usize {
        return self.programs.iter().filter(|slot| slot.is_some()).count();
    }

    pub fn live_render_targets(&self) -> usize {
        return self.targets.iter().filter(|slot| slot.is_some()).count();
    }

    pub fn live_meshes(&self) -> usize {
        return self.meshes.iter().filter(|slot| slot.is_some()).count();
    }

    fn program(&self, program: ProgramHandle) -> Option<&Program> {
        return self.programs.get(program.id() as usize)?.as_ref();
    }

    fn raster_state(&self) -> RasterState {
        return RasterState {
            depth_mode: self.depth_mode,
            blend: self.blend,
        };
    }

    /// Takes the current target out of storage so it can be written while the others are sampled.
    fn take_target(&mut self) -> Option<Target> {
        let placeholder = Target::new(0, 0, Rgba([0, 0, 0, 0]));
        return match self.current_target {
            None => Some(std::mem::replace(&mut self.surface, placeholder)),
            Some(handle) => {
                let slot = self.targets.get_mut(handle.id() as usize)?;
                // Sampling the target being drawn into reads an empty image.
                slot.as_mut().map(|target| std::mem::replace(target, placeholder))
            }
        };
    }

    fn put_target(&mut self, target: Target) {
        match self.current_target {
            None => self.surface = target,
            Some(handle) => {
                if let Some(Some(slot)) = self.targets.get_mut(handle.id() as usize) {
                    *slot = target;
                }
            }
        }
    }
}

impl GraphicsContext for SoftwareContext {
    fn compile_program(&mut self, vertex_source: &str, fragment_source: &str) -> Result<ProgramHandle> {
        let interface = glsl::link(vertex_source, fragment_source)?;
        log::debug!(
            "linked `{}` program, {} uniforms, attributes {:?}",
            interface.kernel.name(),
            interface.uniforms.len(),
            interface.attributes
        );
        let program = Program {
            interface,
            uniforms: HashMap::new(),
            attribute_locations: HashMap::new(),
        };
        return Ok(ProgramHandle::new(store(&mut self.programs, program)));
    }

    fn has_uniform(&self, program: ProgramHandle, name: &str) -> bool {
        return self
            .program(program)
            .map_or(false, |program| program.interface.declares_uniform(name));
    }

    fn bind_attribute_location(&mut self, program: ProgramHandle, name: &str, location: u32) {
        if let Some(Some(program)) = self.programs.get_mut(program.id() as usize) {
            program.attribute_locations.insert(name.to_string(), location);
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        if self.program(program).is_none() {
            log::warn!("use_program: unknown program {}", program.id());
            return;
        }
        self.current_program = Some(program);
    }

    fn current_program(&self) -> Option<ProgramHandle> {
        return self.current_program;
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(handle) = self.current_program else {
            log::warn!("set_uniform `{}` without a program in use", name);
            return;
        };
        let Some(Some(program)) = self.programs.get_mut(handle.id() as usize) else {
            return;
        };
        if !program.interface.declares_uniform(name) {
            log::trace!("program {} has no uniform `{}`, ignored", handle.id(), name);
            return;
        }
        program.uniforms.insert(name.to_string(), value);
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if let Some(slot) = self.programs.get_mut(program.id() as usize) {
            *slot = None;
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn create_texture(&mut self, image: &RgbaImage) -> TextureHandle {
        return TextureHandle::new(store(&mut self.textures, TextureData::Image(image.clone())));
    }

    fn update_texture(&mut self, texture: TextureHandle, image: &RgbaImage) -> Result<()> {
        let unknown = RenderError::UnknownHandle {
            kind: "texture",
            id: texture.id(),
        };
        let Some(Some(data)) = self.textures.get_mut(texture.id() as usize) else {
            return Err(unknown);
        };
        return match data {
            TextureData::Image(current) => {
                *current = image.clone();
                Ok(())
            }
            _ => Err(RenderError::InvalidTexture(format!(
                "texture {} is not a plain 2D texture",
                texture.id()
            ))),
        };
    }

    fn create_cubemap(&mut self, faces: &[RgbaImage; 6]) -> Result<TextureHandle> {
        let (width, height) = faces[0].dimensions();
        if width == 0 || width != height {
            return Err(RenderError::InvalidTexture(format!(
                "cubemap faces must be square, got {}x{}",
                width, height
            )));
        }
        if faces.iter().any(|face| face.dimensions() != (width, height)) {
            return Err(RenderError::InvalidTexture(String::from(
                "cubemap faces differ in size",
            )));
        }
        let data = TextureData::Cubemap(Box::new(faces.clone()));
        return Ok(TextureHandle::new(store(&mut self.textures, data)));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        match self.units.get_mut(unit as usize) {
            Some(slot) => *slot = Some(texture),
            None => log::warn!("texture unit {} out of range", unit),
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(slot) = self.textures.get_mut(texture.id() as usize) {
            *slot = None;
        }
        for unit in self.units.iter_mut() {
            if *unit == Some(texture) {
                *unit = None;
            }
        }
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> Result<(TargetHandle, TextureHandle)> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        let index = store(&mut self.targets, Target::new(width, height, Rgba([0, 0, 0, 0])));
        let texture = store(&mut self.textures, TextureData::Target(index as usize));
        log::debug!("created {}x{} render target {}", width, height, index);
        return Ok((TargetHandle::new(index), TextureHandle::new(texture)));
    }

    fn bind_render_target(&mut self, target: Option<TargetHandle>) {
        if let Some(handle) = target {
            if !matches!(self.targets.get(handle.id() as usize), Some(Some(_))) {
                log::warn!("bind_render_target: unknown target {}", handle.id());
                return;
            }
        }
        self.current_target = target;
    }

    fn current_render_target(&self) -> Option<TargetHandle> {
        return self.current_target;
    }

    fn delete_render_target(&mut self, target: TargetHandle) {
        if let Some(slot) = self.targets.get_mut(target.id() as usize) {
            *slot = None;
        }
        if self.current_target == Some(target) {
            self.current_target = None;
        }
    }

    fn clear(&mut self, color: Rgba<u8>) {
        match self.current_target {
            None => self.surface.clear(color),
            Some(handle) => {
                if let Some(Some(target)) = self.targets.get_mut(handle.id() as usize) {
                    target.clear(color);
                }
            }
        }
    }

    fn set_depth_mode(&mut self, mode: DepthMode) {
        self.depth_mode = mode;
    }

    fn set_blend(&mut self, enabled: bool) {
        self.blend = enabled;
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
        return MeshHandle::new(store(&mut self.meshes, mesh.clone()));
    }

    fn update_mesh(&mut self, handle: MeshHandle, mesh: &MeshData) -> Result<()> {
        return match self.meshes.get_mut(handle.id() as usize) {
            Some(Some(current)) => {
                *current = mesh.clone();
                Ok(())
            }
            _ => Err(RenderError::UnknownHandle {
                kind: "mesh",
                id: handle.id(),
            }),
        };
    }

    fn delete_mesh(&mut self, handle: MeshHandle) {
        if let Some(slot) = self.meshes.get_mut(handle.id() as usize) {
            *slot = None;
        }
    }

    fn draw_indexed(&mut self, mesh: MeshHandle) {
        let Some(program_handle) = self.current_program else {
            log::warn!("draw_indexed without a program in use");
            return;
        };
        let Some(mut target) = self.take_target() else {
            return;
        };
        let state = self.raster_state();

        if let (Some(Some(program)), Some(Some(mesh))) = (
            self.programs.get(program_handle.id() as usize),
            self.meshes.get(mesh.id() as usize),
        ) {
            let lookup = |name: &str| program.uniforms.get(name).copied();
            let draw = DrawState::prepare(program.interface.kernel, &lookup);
            let view = TextureView {
                textures: &self.textures,
                targets: &self.targets,
                units: &self.units,
            };
            let locations = [
                program.location(uniforms::ATTR_POSITION.0).unwrap_or(0),
                program.location(uniforms::ATTR_UV.0).unwrap_or(1),
                program.location(uniforms::ATTR_NORMAL.0).unwrap_or(2),
                program.location(uniforms::ATTR_TANGENT.0).unwrap_or(3),
            ];
            let fetch = |vertex: &Vertex| {
                let uv = attribute(vertex, locations[1]);
                return Vertex {
                    position: attribute(vertex, locations[0]),
                    uv: Vector2::new(uv.x, uv.y),
                    normal: attribute(vertex, locations[2]),
                    tangent: attribute(vertex, locations[3]),
                };
            };
            let clip: Vec<_> = mesh
                .vertices
                .iter()
                .map(|vertex| draw.vertex(&fetch(vertex)))
                .collect();

            let mut shade = |varyings: &Varyings| draw.fragment(varyings, &view);
            for triangle in mesh.indices.chunks_exact(3) {
                let corners = [triangle[0], triangle[1], triangle[2]].map(|index| clip.get(index as usize));
                if let [Some(a), Some(b), Some(c)] = corners {
                    raster::draw_triangle(&mut target, state, [*a, *b, *c], &mut shade);
                } else {
                    debug_assert!(false, "mesh index out of range");
                }
            }
            self.draw_calls += 1;
        } else {
            log::warn!("draw_indexed: unknown program or mesh");
        }

        self.put_target(target);
    }

    fn draw_lines(&mut self, lines: &[Line]) {
        let mvp = match self.current_program.and_then(|handle| self.program(handle)) {
            Some(program) => {
                let lookup = |name: &str| program.uniforms.get(name).copied();
                *DrawState::prepare(program.interface.kernel, &lookup).mvp()
            }
            None => {
                log::warn!("draw_lines without a program in use");
                return;
            }
        };
        let Some(mut target) = self.take_target() else {
            return;
        };
        for line in lines {
            let from = mvp * Point3::from(line.from).to_homogeneous();
            let to = mvp * Point3::from(line.to).to_homogeneous();
            raster::draw_line_z_ignore(&mut target, from, to, line.color);
        }
        self.put_target(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::builtin_shader;
    use na::{vector, Matrix4};

    fn main_program(gfx: &mut SoftwareContext) -> ProgramHandle {
        let vertex = builtin_shader("vertex_shader.glsl").unwrap();
        let fragment = builtin_shader("fragment_shader.glsl").unwrap();
        return gfx.compile_program(vertex, fragment).unwrap();
    }

    fn full_screen_quad() -> MeshData {
        return MeshData::quad_from_corners(
            vector![-1.0, -1.0, 0.0],
            vector![1.0, -1.0, 0.0],
            vector![-1.0, 1.0, 0.0],
        );
    }

    #[test]
    fn zero_sized_context_is_rejected() {
        assert!(matches!(
            SoftwareContext::new(0, 10),
            Err(RenderError::InvalidViewport { width: 0, height: 10 })
        ));
    }

    #[test]
    fn undeclared_uniforms_are_ignored() {
        let mut gfx = SoftwareContext::new(4, 4).unwrap();
        let program = main_program(&mut gfx);
        gfx.use_program(program);
        gfx.set_uniform("u_not_there", UniformValue::Float(1.0));
        gfx.set_uniform(uniforms::MODEL, UniformValue::Mat4(Matrix4::identity()));
        assert_eq!(gfx.uniform(program, "u_not_there"), None);
        assert_eq!(gfx.uniform(program, uniforms::MODEL), Some(UniformValue::Mat4(Matrix4::identity())));
    }

    #[test]
    fn textured_quad_fills_the_surface() {
        let mut gfx = SoftwareContext::new(6, 6).unwrap();
        let program = main_program(&mut gfx);
        gfx.use_program(program);
        let green = Rgba([0, 255, 0, 255]);
        let texture = gfx.create_texture(&RgbaImage::from_pixel(2, 2, green));
        gfx.bind_texture(uniforms::TEXTURE_UNIT, texture);
        let mesh = gfx.upload_mesh(&full_screen_quad());
        gfx.draw_indexed(mesh);
        assert!(gfx.surface().pixels().all(|p| *p == green));
        assert_eq!(gfx.draw_calls(), 1);
    }

    #[test]
    fn render_target_content_is_sampled_back() {
        let mut gfx = SoftwareContext::new(4, 4).unwrap();
        let program = main_program(&mut gfx);
        let (target, texture) = gfx.create_render_target(4, 4).unwrap();
        gfx.bind_render_target(Some(target));
        gfx.clear(Rgba([10, 20, 30, 255]));
        gfx.bind_render_target(None);

        gfx.use_program(program);
        gfx.bind_texture(uniforms::TEXTURE_UNIT, texture);
        let mesh = gfx.upload_mesh(&full_screen_quad());
        gfx.draw_indexed(mesh);
        assert!(gfx.surface().pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn cubemap_faces_must_match() {
        let mut gfx = SoftwareContext::new(4, 4).unwrap();
        let mut faces: [RgbaImage; 6] = std::array::from_fn(|_| RgbaImage::new(2, 2));
        assert!(gfx.create_cubemap(&faces).is_ok());
        faces[3] = RgbaImage::new(4, 4);
        assert!(matches!(gfx.create_cubemap(&faces), Err(RenderError::InvalidTexture(_))));
    }

    #[test]
    fn deleted_slots_are_reused() {
        let mut gfx = SoftwareContext::new(4, 4).unwrap();
        let first = gfx.create_texture(&RgbaImage::new(1, 1));
        gfx.delete_texture(first);
        assert_eq!(gfx.live_textures(), 0);
        let second = gfx.create_texture(&RgbaImage::new(1, 1));
        assert_eq!(first, second);
        assert!(gfx.update_texture(TextureHandle::new(42), &RgbaImage::new(1, 1)).is_err());
    }

    #[test]
    fn bound_attribute_location_selects_the_vertex_stream() {
        let mut gfx = SoftwareContext::new(4, 4).unwrap();
        let program = main_program(&mut gfx);
        gfx.bind_attribute_location(program, uniforms::ATTR_POSITION.0, uniforms::ATTR_POSITION.1);
        assert_eq!(gfx.attribute_location(program, uniforms::ATTR_POSITION.0), Some(0));
        // Reading positions from the uv stream squeezes the quad into the upper right quadrant.
        gfx.bind_attribute_location(program, uniforms::ATTR_POSITION.0, uniforms::ATTR_UV.1);
        gfx.use_program(program);
        let texture = gfx.create_texture(&RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255])));
        gfx.bind_texture(uniforms::TEXTURE_UNIT, texture);
        let mesh = gfx.upload_mesh(&full_screen_quad());
        gfx.draw_indexed(mesh);
        assert_eq!(*gfx.surface().get_pixel(0, 3), Rgba([0, 0, 0, 255]));
        assert_eq!(*gfx.surface().get_pixel(3, 0), Rgba([255, 255, 255, 255]));
    }
}

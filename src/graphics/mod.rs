//! The graphics context seam.
//!
//! Every component of the frame talks to the platform through `GraphicsContext`. The crate
//! ships one implementation, `SoftwareContext`, a CPU rasterizer that the demo window and the
//! tests both render with.

mod glsl;
mod kernel;
mod raster;
mod software;
mod texture;

use image::{Rgba, RgbaImage};
use nalgebra as na;
use na::{Matrix4, Vector3};

use crate::error::Result;
use crate::mesh::MeshData;

pub use glsl::ProgramInterface;
pub use software::SoftwareContext;

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            pub fn new(id: u32) -> Self {
                return Self(id);
            }

            pub fn id(&self) -> u32 {
                return self.0;
            }
        }
    };
}

handle_type!(
    /// Linked vertex + fragment program.
    ProgramHandle
);
handle_type!(
    /// 2D texture or cubemap.
    TextureHandle
);
handle_type!(
    /// Offscreen color target. The default surface has no handle.
    TargetHandle
);
handle_type!(
    /// Uploaded vertex/index buffers.
    MeshHandle
);

/// Value of a single uniform slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vector3<f32>),
    Mat4(Matrix4<f32>),
}

/// Depth comparison used by subsequent draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    Less,
    LessEqual,
    Disabled,
}

/// Colored segment in model space, drawn by `draw_lines`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub from: Vector3<f32>,
    pub to: Vector3<f32>,
    pub color: Rgba<u8>,
}

/// Primitive operations a platform graphics API has to provide.
///
/// Binding state (current program, current render target, depth and blend state) is global to
/// the context, uniforms are local to the program they were set on.
pub trait GraphicsContext {
    /// Compiles and links both stages.
    fn compile_program(&mut self, vertex_source: &str, fragment_source: &str) -> Result<ProgramHandle>;
    fn has_uniform(&self, program: ProgramHandle, name: &str) -> bool;
    fn bind_attribute_location(&mut self, program: ProgramHandle, name: &str, location: u32);
    fn use_program(&mut self, program: ProgramHandle);
    fn current_program(&self) -> Option<ProgramHandle>;
    /// Sets a uniform of the current program, names the program doesn't declare are ignored.
    fn set_uniform(&mut self, name: &str, value: UniformValue);
    fn delete_program(&mut self, program: ProgramHandle);

    fn create_texture(&mut self, image: &RgbaImage) -> TextureHandle;
    fn update_texture(&mut self, texture: TextureHandle, image: &RgbaImage) -> Result<()>;
    /// Faces in +x, -x, +y, -y, +z, -z order.
    fn create_cubemap(&mut self, faces: &[RgbaImage; 6]) -> Result<TextureHandle>;
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Creates an offscreen target and the texture that samples its color attachment.
    fn create_render_target(&mut self, width: u32, height: u32) -> Result<(TargetHandle, TextureHandle)>;
    /// `None` restores the default surface.
    fn bind_render_target(&mut self, target: Option<TargetHandle>);
    fn current_render_target(&self) -> Option<TargetHandle>;
    fn delete_render_target(&mut self, target: TargetHandle);

    /// Clears color and depth of the current target.
    fn clear(&mut self, color: Rgba<u8>);
    fn set_depth_mode(&mut self, mode: DepthMode);
    fn set_blend(&mut self, enabled: bool);

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle;
    fn update_mesh(&mut self, handle: MeshHandle, mesh: &MeshData) -> Result<()>;
    fn delete_mesh(&mut self, handle: MeshHandle);
    /// Draws the whole mesh with the current program into the current target.
    fn draw_indexed(&mut self, mesh: MeshHandle);
    fn draw_lines(&mut self, lines: &[Line]);
}

//! A small frame renderer: skybox and lit mesh rendered offscreen, then presented with a 2D
//! overlay. Every component talks to the platform through `graphics::GraphicsContext`.

pub mod assets;
pub mod camera;
pub mod config;
pub mod context;
pub mod error;
pub mod framebuffer;
pub mod graphics;
pub mod light;
pub mod logging;
pub mod matrix;
pub mod mesh;
pub mod pipeline;
pub mod scene;
pub mod shader;
pub mod uniforms;

pub use error::{RenderError, Result};
pub use pipeline::{Page, RenderPipeline};

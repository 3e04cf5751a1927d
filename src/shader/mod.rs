mod adaptor;

pub use adaptor::{LightShaderAdaptor, MainShaderAdaptor, ShaderAdaptor};

use crate::error::{RenderError, Result};
use crate::graphics::{GraphicsContext, ProgramHandle};

/// A linked program together with the adaptor describing its uniform contract.
pub struct ShaderProgram {
    handle: ProgramHandle,
    adaptor: Box<dyn ShaderAdaptor>,
}

impl ShaderProgram {
    /// Compiles, links and checks the program against the adaptor. Any failure here is fatal
    /// for the pipeline, there is no reload path.
    pub fn new(
        gfx: &mut dyn GraphicsContext,
        vertex_source: &str,
        fragment_source: &str,
        adaptor: Box<dyn ShaderAdaptor>,
    ) -> Result<Self> {
        let handle = gfx.compile_program(vertex_source, fragment_source)?;
        if let Some(name) = adaptor
            .required_uniforms()
            .into_iter()
            .find(|name| !gfx.has_uniform(handle, name))
        {
            gfx.delete_program(handle);
            return Err(RenderError::MissingUniform {
                adaptor: adaptor.name(),
                name,
            });
        }
        for (name, location) in adaptor.attributes() {
            gfx.bind_attribute_location(handle, name, *location);
        }
        log::info!("shader program {} ready with `{}` adaptor", handle.id(), adaptor.name());
        return Ok(Self { handle, adaptor });
    }

    /// Makes this program current and rebinds its attributes and samplers.
    pub fn apply(&self, gfx: &mut dyn GraphicsContext) {
        gfx.use_program(self.handle);
        for (name, location) in self.adaptor.attributes() {
            gfx.bind_attribute_location(self.handle, name, *location);
        }
        self.adaptor.bind_samplers(gfx);
        log::trace!("program {} applied", self.handle.id());
    }

    pub fn is_current(&self, gfx: &dyn GraphicsContext) -> bool {
        return gfx.current_program() == Some(self.handle);
    }

    pub fn handle(&self) -> ProgramHandle {
        return self.handle;
    }

    pub fn adaptor_name(&self) -> &'static str {
        return self.adaptor.name();
    }

    pub fn destroy(self, gfx: &mut dyn GraphicsContext) {
        gfx.delete_program(self.handle);
    }
}

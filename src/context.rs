//! Everything a frame needs from the outside world, passed in explicitly.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::error::{RenderError, Result};
use crate::graphics::GraphicsContext;

/// Monotonic milliseconds since the page started.
pub trait TimeSource {
    fn elapsed_millis(&self) -> u64;
}

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        return Self { start: Instant::now() };
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        return Self::new();
    }
}

impl TimeSource for SystemClock {
    fn elapsed_millis(&self) -> u64 {
        return self.start.elapsed().as_millis() as u64;
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(millis: u64) -> Self {
        return Self {
            millis: Rc::new(Cell::new(millis)),
        };
    }

    pub fn set(&self, millis: u64) {
        self.millis.set(millis);
    }

    pub fn advance(&self, millis: u64) {
        self.millis.set(self.millis.get() + millis);
    }
}

impl TimeSource for ManualClock {
    fn elapsed_millis(&self) -> u64 {
        return self.millis.get();
    }
}

/// Viewport size plus its scale relative to the reference layout size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub kx: f32,
    pub ky: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, reference: (u32, u32)) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        if reference.0 == 0 || reference.1 == 0 {
            return Err(RenderError::InvalidViewport {
                width: reference.0,
                height: reference.1,
            });
        }
        return Ok(Self {
            width,
            height,
            kx: width as f32 / reference.0 as f32,
            ky: height as f32 / reference.1 as f32,
        });
    }
}

/// Viewport, time source and graphics context of one pipeline.
pub struct RenderContext<G: GraphicsContext> {
    pub viewport: Viewport,
    pub time: Box<dyn TimeSource>,
    pub gfx: G,
}

impl<G: GraphicsContext> RenderContext<G> {
    pub fn new(gfx: G, viewport: Viewport, time: Box<dyn TimeSource>) -> Self {
        return Self { viewport, time, gfx };
    }

    pub fn elapsed_millis(&self) -> u64 {
        return self.time.elapsed_millis();
    }
}

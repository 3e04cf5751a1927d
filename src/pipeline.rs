//! The per-frame pass sequence.
//!
//! A frame is a chain of pass objects, each consuming the previous one:
//! `SkyboxPass -> LitScenePass -> PresentPass`. Entering a pass performs every bind the pass
//! depends on (render target, program, camera, model matrix), so the ordering rules between
//! framebuffer, shader and camera can't be broken by a caller.

use nalgebra as na;
use na::vector;

use crate::assets::SceneAssets;
use crate::camera::Camera;
use crate::config::PipelineConfig;
use crate::context::{RenderContext, Viewport};
use crate::error::Result;
use crate::framebuffer::{FrameBuffer, FrameBufferState};
use crate::graphics::{DepthMode, GraphicsContext};
use crate::matrix::MatrixStack;
use crate::scene::{Axes, ImageProducer, Shape, SimplePolygon, SkyBox};
use crate::shader::{LightShaderAdaptor, MainShaderAdaptor, ShaderProgram};

/// Lifecycle hooks the platform bridge drives.
pub trait Page {
    fn draw(&mut self);
    fn on_resume(&mut self);
    fn on_pause(&mut self);
}

pub struct RenderPipeline<G: GraphicsContext> {
    context: RenderContext<G>,
    config: PipelineConfig,
    main_shader: ShaderProgram,
    skybox_shader: ShaderProgram,
    light_shader: ShaderProgram,
    camera: Camera,
    matrix: MatrixStack,
    frame_buffer: FrameBuffer,
    skybox: SkyBox,
    shape: Shape,
    polygon: SimplePolygon,
    axes: Axes,
    frames: u64,
}

impl<G: GraphicsContext> RenderPipeline<G> {
    /// Builds every GPU resource of the frame. Fails on bad configuration, shader errors or
    /// unusable assets, there is no degraded mode.
    pub fn new(
        mut context: RenderContext<G>,
        config: PipelineConfig,
        assets: &SceneAssets,
        producer: Box<dyn ImageProducer>,
    ) -> Result<Self> {
        config.validate()?;
        let viewport = context.viewport;
        let gfx = &mut context.gfx;

        let main_shader = ShaderProgram::new(
            gfx,
            &assets.main_vertex,
            &assets.main_fragment,
            Box::new(MainShaderAdaptor),
        )?;
        let skybox_shader = ShaderProgram::new(
            gfx,
            &assets.skybox_vertex,
            &assets.skybox_fragment,
            Box::new(MainShaderAdaptor),
        )?;
        let light_shader = ShaderProgram::new(
            gfx,
            &assets.light_vertex,
            &assets.light_fragment,
            Box::new(LightShaderAdaptor),
        )?;

        let mut camera = Camera::new(viewport.width, viewport.height, config.camera)?;
        camera.reset_for_2d();

        let frame_buffer = FrameBuffer::new(gfx, viewport.width, viewport.height, config.offscreen_clear)?;
        let skybox = SkyBox::new(gfx, &assets.skybox_faces)?;
        let mut shape = Shape::new(gfx, &assets.shape_mesh, &assets.shape_texture);
        if let Some(normal_map) = &assets.shape_normal_map {
            shape.add_normal_map(gfx, normal_map);
        }
        let polygon = SimplePolygon::new(gfx, producer, true);

        log::info!(
            "render pipeline ready: {}x{}, shape with {} triangles",
            viewport.width,
            viewport.height,
            shape.triangle_count()
        );
        return Ok(Self {
            context,
            config,
            main_shader,
            skybox_shader,
            light_shader,
            camera,
            matrix: MatrixStack::new(),
            frame_buffer,
            skybox,
            shape,
            polygon,
            axes: Axes::default(),
            frames: 0,
        });
    }

    /// Renders one frame into the default surface.
    pub fn draw(&mut self) {
        let elapsed = self.context.elapsed_millis();
        SkyboxPass::begin(self)
            .draw()
            .advance(elapsed)
            .draw()
            .present(elapsed);
        self.frames += 1;
    }

    /// Rebuilds the offscreen target and the camera for a new viewport size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let viewport = Viewport::new(width, height, self.config.reference_size)?;
        self.camera.resize(width, height)?;
        let gfx = &mut self.context.gfx;
        let frame_buffer = FrameBuffer::new(gfx, width, height, self.config.offscreen_clear)?;
        std::mem::replace(&mut self.frame_buffer, frame_buffer).destroy(gfx);
        self.context.viewport = viewport;
        log::info!("viewport resized to {}x{}", width, height);
        return Ok(());
    }

    /// Releases every GPU resource and hands the graphics context back.
    pub fn teardown(self) -> G {
        let Self {
            mut context,
            main_shader,
            skybox_shader,
            light_shader,
            frame_buffer,
            skybox,
            shape,
            polygon,
            frames,
            ..
        } = self;
        let gfx = &mut context.gfx;
        polygon.destroy(gfx);
        shape.destroy(gfx);
        skybox.destroy(gfx);
        frame_buffer.destroy(gfx);
        main_shader.destroy(gfx);
        skybox_shader.destroy(gfx);
        light_shader.destroy(gfx);
        log::info!("render pipeline torn down after {} frames", frames);
        return context.gfx;
    }

    pub fn context(&self) -> &RenderContext<G> {
        return &self.context;
    }

    pub fn context_mut(&mut self) -> &mut RenderContext<G> {
        return &mut self.context;
    }

    pub fn gfx(&self) -> &G {
        return &self.context.gfx;
    }

    pub fn config(&self) -> &PipelineConfig {
        return &self.config;
    }

    pub fn camera(&self) -> &Camera {
        return &self.camera;
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        return &self.frame_buffer;
    }

    pub fn polygon(&self) -> &SimplePolygon {
        return &self.polygon;
    }

    pub fn frames(&self) -> u64 {
        return self.frames;
    }
}

impl<G: GraphicsContext> Page for RenderPipeline<G> {
    fn draw(&mut self) {
        RenderPipeline::draw(self);
    }

    fn on_resume(&mut self) {
        log::debug!("page resumed");
    }

    fn on_pause(&mut self) {
        log::debug!("page paused");
    }
}

/// Centre of the overlay polygon at `elapsed` milliseconds, in viewport pixels.
pub fn polygon_center(config: &PipelineConfig, viewport: &Viewport, elapsed: u64) -> (f32, f32) {
    let animation = &config.polygon;
    let travel = elapsed as f64 / animation.speed_divisor as f64 + animation.offset as f64;
    let mut x = travel * viewport.kx as f64;
    let mut y = travel * viewport.ky as f64;
    if animation.wrap {
        x = x.rem_euclid(viewport.width as f64);
        y = y.rem_euclid(viewport.height as f64);
    }
    return (x as f32, y as f32);
}

/// Shape spin in degrees at `elapsed` milliseconds, reduced to [0, 360).
/// Done in f64, an f32 millisecond count stops resolving single milliseconds after 2^24.
pub fn spin_angle(elapsed: u64, rotation_divisor: f32) -> f32 {
    return (elapsed as f64 / rotation_divisor as f64).rem_euclid(360.0) as f32;
}

/// Offscreen target bound and cleared, skybox program and 3D camera applied.
pub struct SkyboxPass<'a, G: GraphicsContext> {
    pipeline: &'a mut RenderPipeline<G>,
}

impl<'a, G: GraphicsContext> SkyboxPass<'a, G> {
    pub fn begin(pipeline: &'a mut RenderPipeline<G>) -> Self {
        let RenderPipeline {
            context,
            config,
            skybox_shader,
            camera,
            frame_buffer,
            ..
        } = &mut *pipeline;
        let gfx = &mut context.gfx;
        debug_assert_eq!(gfx.current_render_target(), None, "frame started on an offscreen target");

        gfx.set_blend(false);
        gfx.set_depth_mode(DepthMode::Less);
        gfx.clear(config.background);
        frame_buffer.apply(gfx);
        skybox_shader.apply(gfx);
        camera.reset_for_3d();
        camera.apply(gfx);
        log::trace!("skybox pass");
        return Self { pipeline };
    }

    pub fn draw(self) -> LitScenePass<'a, G> {
        let pipeline = self.pipeline;
        debug_assert!(pipeline.skybox_shader.is_current(&pipeline.context.gfx));
        pipeline.skybox.prepare_and_draw(&mut pipeline.context.gfx);
        return LitScenePass::begin(pipeline);
    }
}

/// Lit program with lights, material and 3D camera applied, still drawing offscreen.
pub struct LitScenePass<'a, G: GraphicsContext> {
    pipeline: &'a mut RenderPipeline<G>,
}

impl<'a, G: GraphicsContext> LitScenePass<'a, G> {
    fn begin(pipeline: &'a mut RenderPipeline<G>) -> Self {
        let RenderPipeline {
            context,
            config,
            light_shader,
            camera,
            matrix,
            axes,
            frame_buffer,
            ..
        } = &mut *pipeline;
        let gfx = &mut context.gfx;
        debug_assert_eq!(gfx.current_render_target(), Some(frame_buffer.target()));

        light_shader.apply(gfx);
        config.lights.apply(gfx);
        config.material.apply(gfx);
        camera.apply(gfx);
        matrix.apply(gfx);
        if config.axes.show {
            axes.draw_axes(gfx, config.axes.length, config.axes.arrow_length, config.axes.arrow_width);
        }
        log::trace!("lit scene pass");
        return Self { pipeline };
    }

    /// Spins the shape by the time driven angle: `elapsed / rotation_divisor` degrees.
    pub fn advance(self, elapsed: u64) -> Self {
        let pipeline = &mut *self.pipeline;
        let angle = spin_angle(elapsed, pipeline.config.rotation_divisor);
        pipeline.matrix.rotate(angle, pipeline.config.rotation_axis);
        pipeline.matrix.apply(&mut pipeline.context.gfx);
        return self;
    }

    pub fn draw(self) -> PresentPass<'a, G> {
        let pipeline = self.pipeline;
        debug_assert!(pipeline.light_shader.is_current(&pipeline.context.gfx));
        pipeline.shape.prepare_and_draw(&mut pipeline.context.gfx);
        return PresentPass::begin(pipeline);
    }
}

/// Default surface bound and cleared, main program with 2D camera and identity model matrix.
pub struct PresentPass<'a, G: GraphicsContext> {
    pipeline: &'a mut RenderPipeline<G>,
}

impl<'a, G: GraphicsContext> PresentPass<'a, G> {
    fn begin(pipeline: &'a mut RenderPipeline<G>) -> Self {
        let RenderPipeline {
            context,
            config,
            main_shader,
            camera,
            matrix,
            frame_buffer,
            ..
        } = &mut *pipeline;
        let gfx = &mut context.gfx;

        frame_buffer.connect_default_frame_buffer(gfx);
        main_shader.apply(gfx);
        gfx.clear(config.background);
        // Painter's order for the overlay.
        gfx.set_depth_mode(DepthMode::Disabled);
        gfx.set_blend(true);
        camera.reset_for_2d();
        camera.apply(gfx);
        matrix.reset_translate_matrix();
        matrix.apply(gfx);
        log::trace!("present pass");
        return Self { pipeline };
    }

    /// Shows the offscreen image over the whole viewport, then the overlay polygon.
    pub fn present(self, elapsed: u64) {
        let RenderPipeline {
            context,
            config,
            main_shader,
            frame_buffer,
            polygon,
            ..
        } = self.pipeline;
        let viewport = context.viewport;
        let gfx = &mut context.gfx;
        debug_assert!(main_shader.is_current(&*gfx));
        debug_assert_eq!(frame_buffer.state(), FrameBufferState::Unbound);

        let (width, height) = (viewport.width as f32, viewport.height as f32);
        frame_buffer.draw_texture(
            gfx,
            vector![0.0, 0.0, 1.0],
            vector![width, 0.0, 1.0],
            vector![0.0, height, 1.0],
        );

        let (center_x, center_y) = polygon_center(config, &viewport, elapsed);
        polygon.prepare_and_draw(
            gfx,
            center_x,
            center_y,
            config.polygon.size * viewport.kx,
            config.polygon.aspect_correction,
        );

        gfx.set_blend(false);
        gfx.set_depth_mode(DepthMode::Less);
    }
}

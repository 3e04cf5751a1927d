use std::time;

use image::Rgba;
use show_image::{create_window, event, ImageInfo, ImageView, WindowOptions};

use tiny_frame::assets::{BuiltinAssets, FsAssetLoader, SceneAssets};
use tiny_frame::config::PipelineConfig;
use tiny_frame::context::{RenderContext, SystemClock, Viewport};
use tiny_frame::graphics::SoftwareContext;
use tiny_frame::logging::{init_logging, LoggingConfig};
use tiny_frame::scene::SolidFill;
use tiny_frame::{Page, RenderPipeline};

pub struct Params {
    pub width: u32,
    pub height: u32,
    pub print_fps: bool,
    pub asset_path: String,
    pub log_filter: Option<String>,
}

/// Helper, defining exit event to be an Escape key press.
fn is_exit_event(window_event: event::WindowEvent) -> bool {
    if let event::WindowEvent::KeyboardInput(event) = window_event {
        if event.input.key_code == Some(event::VirtualKeyCode::Escape) && event.input.state.is_released() {
            return true;
        }
    }

    return false;
}

/// Actualy launches the window and drives the pipeline once per loop iteration.
/// Takes struct, defining execution parameters.
pub fn run(params: Params) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig {
        env_filter: params.log_filter.clone(),
        ..Default::default()
    });

    // Files missing from the asset directory are replaced by built-in ones.
    let loader = FsAssetLoader::new(&params.asset_path).with_fallback(Box::new(BuiltinAssets));
    let assets = SceneAssets::load(&loader)?;

    let config = PipelineConfig::default();
    let viewport = Viewport::new(params.width, params.height, config.reference_size)?;
    let gfx = SoftwareContext::new(params.width, params.height)?;
    let context = RenderContext::new(gfx, viewport, Box::new(SystemClock::new()));
    let overlay = SolidFill {
        width: 200,
        height: 200,
        color: Rgba([255, 0, 255, 255]),
    };
    let mut pipeline = RenderPipeline::new(context, config, &assets, Box::new(overlay))?;

    let window_options: WindowOptions = WindowOptions {
        size: Some([params.width, params.height]),
        ..Default::default()
    };
    let window = create_window("output", window_options)?;
    let event_channel = window.event_channel()?;

    pipeline.on_resume();
    let mut exit = false;
    let mut frame_counter_time_begin = time::Instant::now();
    let mut frame_counter: u32 = 0;
    while !exit {
        pipeline.draw();

        let surface = pipeline.gfx().surface();
        let image_data = ImageView::new(ImageInfo::rgba8(surface.width(), surface.height()), surface.as_raw());
        window.set_image("image", image_data)?;

        // Unloading all the garbage from event channel, that has piled up, looking for exit event.
        let exit_poll_result = event_channel.try_iter()
        .map(|window_event| is_exit_event(window_event))
        .reduce(|was_exit_event, is_exit_event| was_exit_event || is_exit_event);

        // If any event is Escape key press, then exiting.
        exit = match exit_poll_result {
            Some(value) => value,
            None => false,
        };

        if params.print_fps {
            // Counting frames to printout stats every seconds.
            frame_counter += 1;
            if time::Instant::now()
            .duration_since(frame_counter_time_begin)
            .as_secs_f32() > 1.0 {
                println!("FPS --- {}", frame_counter);
                frame_counter_time_begin = time::Instant::now();
                frame_counter = 0;
            }
        }
    }
    pipeline.on_pause();

    let gfx = pipeline.teardown();
    log::info!("{} programs left after teardown", gfx.live_programs());

    return Ok(());
}

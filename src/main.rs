mod app;

use std::env;

const WIDTH: u32  = 800;
const HEIGHT: u32 = 800;

#[show_image::main]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Default values.
    let mut params = app::Params {
        width: WIDTH,
        height: HEIGHT,
        print_fps: false,
        asset_path: String::from("assets"),
        log_filter: None,
    };

    let args: Vec<String> = env::args().collect();
    for i in 1..args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("-p", Some(value)) => { params.asset_path = value.clone(); }
            ("-w", Some(value)) => { params.width = value.parse()?; }
            ("-h", Some(value)) => { params.height = value.parse()?; }
            ("-l", Some(value)) => { params.log_filter = Some(value.clone()); }
            ("-f", _) => { params.print_fps = true; }
            _ => ()
        }
    }

    app::run(params)?;

    return Ok(());
}

//! Demo: three stacked backdrop scenes on a scrollable page.
//!
//! ```text
//! cargo run --release -- [shape_shifter_preset.toml]
//! ```
//!
//! Scroll with the mouse wheel. Keys 1-5 switch the pointer style.

use backdrop::error::AppError;
use backdrop::scene::SceneConfig;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let preset = match std::env::args().nth(1) {
        Some(path) => {
            let scene = SceneConfig::load(&path)?;
            log::info!("Loaded preset '{}' from {path}", scene.name);
            Some(scene)
        }
        None => None,
    };
    backdrop::window::run(preset)
}

use anyhow::Context;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub mod app;
pub mod camera;
pub mod config;
pub mod tracer;
pub mod util;

use crate::app::Application;
use crate::config::{Options, HELP};
use crate::tracer::Scene;

/// Command-line entry point: renders the showcase scene for a number of
/// accumulated frames and writes the result as a PNG.
pub fn run() -> anyhow::Result<()> {
    // 로거 초기화
    env_logger::init();

    let options = Options::from_env()?;
    if options.help {
        print!("{}", HELP);
        return Ok(());
    }

    let mut rng = StdRng::seed_from_u64(options.settings.seed as u64);
    let scene = Scene::showcase(options.spheres, &mut rng);
    info!(
        "rendering {} spheres at {}x{} for {} frames",
        scene.spheres.len(),
        options.width,
        options.height,
        options.frames
    );

    let mut app = Application::new(scene, options.settings.clone());
    let mut total = std::time::Duration::ZERO;
    for _ in 0..options.frames {
        app.render(options.width, options.height);
        total += app.last_render();
    }

    let image = app
        .final_image()
        .context("no frame was rendered")?;
    image
        .save_png(&options.output)
        .with_context(|| format!("failed to write {}", options.output.display()))?;

    info!(
        "wrote {} after {} frames in {:.1}ms",
        options.output.display(),
        options.frames,
        total.as_secs_f64() * 1000.0
    );
    Ok(())
}

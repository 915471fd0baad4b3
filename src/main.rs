use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use lumen::{
    render::{render, to_rgb8},
    scene::Scene,
};
use std::path::PathBuf;

/// Offline path tracer: renders a TOML scene description to a PNG image.
#[derive(Parser)]
#[command(name = "lumen", version, about)]
struct Args {
    /// Scene description file
    scene: PathBuf,

    /// Output image path
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    /// Override the scene's samples per pixel
    #[arg(short, long)]
    samples: Option<u32>,

    /// Raise log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let mut scene = Scene::load(&args.scene)?;
    if let Some(samples) = args.samples {
        scene.settings.samples_per_pixel = samples.max(1);
    }

    info!(
        "rendering {:?}: {}x{} at {} spp, depth {}",
        args.scene,
        scene.settings.width,
        scene.settings.height,
        scene.settings.samples_per_pixel,
        scene.settings.max_depth,
    );

    let pixels = render(&scene);

    image::save_buffer(
        &args.output,
        &to_rgb8(&pixels),
        scene.settings.width,
        scene.settings.height,
        image::ColorType::Rgb8,
    )
    .with_context(|| format!("failed to write image {:?}", args.output))?;

    info!("wrote {:?}", args.output);

    Ok(())
}

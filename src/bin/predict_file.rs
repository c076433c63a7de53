//! predict_file - one-shot prediction for a local image file
//!
//! Runs the configured detection backend directly (no HTTP) and prints the
//! prediction JSON. Useful for smoke-testing a model artifact.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ewaste_detect::{aggregate, HazardCatalog};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the image file (PNG or JPEG).
    image: PathBuf,

    /// Path to the ONNX model artifact.
    #[arg(long, env = "EWASTE_MODEL_PATH", default_value = "models/best.onnx")]
    model: PathBuf,

    /// Square model input edge in pixels.
    #[arg(long, default_value_t = 640)]
    input_size: u32,

    /// Pretty-print the JSON result.
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let catalog = HazardCatalog::builtin();
    catalog.validate()?;

    let image = image::open(&args.image)
        .with_context(|| format!("failed to read image {}", args.image.display()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    log::info!(
        "running detection on {} ({}x{})",
        args.image.display(),
        width,
        height
    );

    let raw = run_backend(&args, image.into_raw(), width, height)?;
    let result = aggregate(&raw, &catalog);

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{rendered}");
    Ok(())
}

#[cfg(feature = "backend-tract")]
fn run_backend(
    args: &Args,
    pixels: Vec<u8>,
    width: u32,
    height: u32,
) -> Result<Vec<ewaste_detect::RawDetection>> {
    use ewaste_detect::{DetectorBackend, TractBackend};

    let class_names = catalog_class_names();
    let mut backend = TractBackend::new(&args.model, args.input_size, class_names)?;
    backend.detect(&pixels, width, height)
}

#[cfg(not(feature = "backend-tract"))]
fn run_backend(
    _args: &Args,
    _pixels: Vec<u8>,
    _width: u32,
    _height: u32,
) -> Result<Vec<ewaste_detect::RawDetection>> {
    use anyhow::anyhow;

    Err(anyhow!(
        "built without the 'backend-tract' feature; rebuild with --features backend-tract"
    ))
}

#[cfg(feature = "backend-tract")]
fn catalog_class_names() -> Vec<String> {
    HazardCatalog::builtin().detector_classes()
}

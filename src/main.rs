//! edge-segment CLI - promptable segmentation with EdgeSAM on ONNX Runtime

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;

use edge_segment::cli::{get_log_level, Cli, OutputFormat};
use edge_segment::models::{overlay_mask, prepare_image};
use edge_segment::{SegmentationSession, SessionConfig};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_level = get_log_level(cli.verbose);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(log_level.parse().context("Invalid log directive")?),
        )
        .init();

    tracing::info!("edge-segment started");

    let config = match &cli.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => cli.session_config(),
    };

    let mut session = SegmentationSession::new(&config);
    if let Some(err) = session.load_error() {
        bail!("Segmentation session initialization failed: {}", err);
    }
    let input_size = session.get_input_size();

    let image = image::open(&cli.image)
        .with_context(|| format!("Failed to load image: {}", cli.image.display()))?;
    tracing::info!(
        "Resize image {}x{} to {}x{}",
        image.width(),
        image.height(),
        input_size.0,
        input_size.1
    );

    let raster = prepare_image(&image, input_size)?;
    session.load_image(raster.view()).context("Image encoding failed")?;

    let prompts = cli.prompts(input_size);
    let result = session.get_mask(&prompts).context("Mask decoding failed")?;

    let mask_path = cli.mask_path();
    result
        .mask
        .save(&mask_path)
        .with_context(|| format!("Failed to write mask: {}", mask_path.display()))?;

    if let Some(overlay_path) = &cli.overlay {
        let resized = image
            .resize_exact(input_size.0, input_size.1, image::imageops::FilterType::Triangle)
            .to_rgb8();
        overlay_mask(&resized, &result.mask)?
            .save(overlay_path)
            .with_context(|| format!("Failed to write overlay: {}", overlay_path.display()))?;
    }

    let summary = result.summary();
    match cli.format {
        OutputFormat::Json => {
            let json = json!({
                "image": cli.image.display().to_string(),
                "mask": mask_path.display().to_string(),
                "prompts": prompts,
                "result": summary,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Image: {}", cli.image.display());
            println!("Mask: {}", mask_path.display());
            println!("  Score: {:.4}", summary.score);
            println!("  Size: {}x{}", summary.width, summary.height);
            println!("  Pixels: {}", summary.pixel_count);
            if let Some(bbox) = summary.bbox {
                println!(
                    "  BBox: ({}, {}, {}, {})",
                    bbox.x1, bbox.y1, bbox.x2, bbox.y2
                );
            }
        }
    }

    tracing::info!("Segmentation complete");
    Ok(())
}

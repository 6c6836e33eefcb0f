//! Render a saved board snapshot to a PNG file.

use clap::Parser;
use inkboard_core::shapes::now_millis;
use inkboard_core::wire::snapshot_from_wire;
use inkboard_render::{RasterRenderer, RenderConfig, export_snapshot, write_png};
use kurbo::Size;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "inkboard-export")]
#[command(version, about = "Export an inkboard snapshot as PNG", long_about = None)]
struct Args {
    /// Snapshot JSON ({"board": {...}, "shapes": [...]})
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output path (defaults to "<title>-<timestamp>.png")
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Viewport width; fits the content when width or height is omitted
    #[arg(long)]
    width: Option<f64>,

    /// Viewport height
    #[arg(long)]
    height: Option<f64>,

    /// Device pixels per board unit
    #[arg(long, default_value_t = 2.0)]
    scale: f64,

    /// Font used for text shapes
    #[arg(long, value_name = "TTF")]
    font: Option<PathBuf>,

    /// Local file for an image URL, as URL=PATH (repeatable)
    #[arg(long = "image", value_name = "URL=PATH")]
    images: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let text = std::fs::read_to_string(&args.input)?;
    let snapshot = snapshot_from_wire(&serde_json::from_str(&text)?)?;
    log::info!(
        "Loaded board {} with {} shapes",
        snapshot.board.id,
        snapshot.shapes.len()
    );

    let mut renderer = RasterRenderer::new(RenderConfig {
        export_pixel_ratio: args.scale,
        ..Default::default()
    });
    if let Some(font) = &args.font {
        renderer = renderer.with_font_data(std::fs::read(font)?)?;
    }
    for mapping in &args.images {
        let Some((url, path)) = mapping.split_once('=') else {
            return Err(format!("expected URL=PATH, got {mapping}").into());
        };
        renderer.images_mut().insert_bytes(url, &std::fs::read(path)?)?;
    }

    let viewport = match (args.width, args.height) {
        (Some(width), Some(height)) => Some(Size::new(width, height)),
        _ => None,
    };
    let image = export_snapshot(&mut renderer, &snapshot, viewport)?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(snapshot.board.export_file_name(now_millis())));
    write_png(&output, &image)?;
    println!("{}", output.display());
    Ok(())
}

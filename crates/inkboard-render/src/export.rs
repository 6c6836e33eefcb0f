//! Whole-board export to PNG.

use crate::raster::{RasterRenderer, content_bounds, encode_png, pan_to_origin};
use crate::renderer::{RasterImage, RenderContext, RenderResult, Renderer, RendererError};
use inkboard_core::board::BoardSnapshot;
use kurbo::{Point, Size};
use std::path::Path;

/// Render every shape of a snapshot. With no viewport the image is fitted
/// to the content plus the configured margin.
pub fn export_snapshot(
    renderer: &mut RasterRenderer,
    snapshot: &BoardSnapshot,
    viewport: Option<Size>,
) -> RenderResult<RasterImage> {
    let margin = renderer.config().export_margin;
    let (size, pan) = match viewport {
        Some(size) => (size, kurbo::Vec2::ZERO),
        None => match content_bounds(&snapshot.shapes, margin) {
            Some(bounds) => (bounds.size(), pan_to_origin(bounds.origin())),
            None => (Size::new(margin * 2.0, margin * 2.0), pan_to_origin(Point::ZERO)),
        },
    };
    let ctx = RenderContext::new(&snapshot.shapes, size)
        .with_pan_offset(pan)
        .with_background(renderer.config().background_color);
    renderer.export_raster(&ctx)
}

/// Encode and write a PNG file.
pub fn write_png(path: &Path, image: &RasterImage) -> RenderResult<()> {
    let bytes = encode_png(image)?;
    std::fs::write(path, bytes)
        .map_err(|e| RendererError::Encode(format!("{}: {}", path.display(), e)))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderConfig;
    use inkboard_core::board::Board;
    use inkboard_core::shapes::{Rectangle, SerializableColor, Shape};

    fn snapshot() -> BoardSnapshot {
        let mut rect = Rectangle::new(Point::new(100.0, 100.0), 20.0, 10.0);
        rect.style.fill_color = Some(SerializableColor::new(0, 0, 255, 255));
        BoardSnapshot {
            board: Board::new("b", "Export me"),
            shapes: vec![Shape::Rectangle(rect)],
        }
    }

    #[test]
    fn test_fit_to_content() {
        let mut renderer = RasterRenderer::new(RenderConfig {
            export_pixel_ratio: 1.0,
            export_margin: 10.0,
            ..Default::default()
        });
        let image = export_snapshot(&mut renderer, &snapshot(), None).unwrap();
        assert_eq!((image.width, image.height), (40, 30));
        assert_eq!(image.pixel(20, 15), Some([0, 0, 255, 255]));
        assert_eq!(image.pixel(2, 2), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_configured_background() {
        let mut renderer = RasterRenderer::new(RenderConfig {
            background_color: peniko::Color::from_rgba8(0, 0, 0, 255),
            ..Default::default()
        });
        let image = export_snapshot(&mut renderer, &snapshot(), None).unwrap();
        assert_eq!(image.pixel(1, 1), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_empty_board_exports_blank() {
        let mut renderer = RasterRenderer::default();
        let empty = BoardSnapshot::default();
        let image = export_snapshot(&mut renderer, &empty, None).unwrap();
        assert_eq!((image.width, image.height), (80, 80));
    }

    #[test]
    fn test_write_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(snapshot().board.export_file_name(1));
        let mut renderer = RasterRenderer::default();
        let image = export_snapshot(&mut renderer, &snapshot(), Some(Size::new(50.0, 40.0))).unwrap();
        write_png(&path, &image).unwrap();

        assert!(path.ends_with("Export me-1.png"));
        let decoded = ::image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (100, 80));
    }

    #[test]
    fn test_write_to_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("x.png");
        let image = RasterImage {
            rgba_data: vec![0; 4],
            width: 1,
            height: 1,
        };
        assert!(matches!(write_png(&path, &image), Err(RendererError::Encode(_))));
    }
}

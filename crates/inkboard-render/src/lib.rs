//! Inkboard Render Library
//!
//! Renderer abstraction and a CPU raster implementation for inkboard.
//! Renderers only read the shape list; they never mutate it.

mod export;
mod raster;
mod renderer;

pub use export::{export_snapshot, write_png};
pub use raster::{ImageCache, RasterRenderer, content_bounds, encode_png};
pub use renderer::{RasterImage, RenderConfig, RenderContext, RenderResult, Renderer, RendererError};

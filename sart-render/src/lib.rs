pub mod render;
pub mod screens;
pub mod text;

pub use render::{FrameStats, SkiaRenderer};
pub use screens::{fallback_text, pixmap_from_rgba, stretch_to};
pub use text::{render_text_block, render_text_pixmap, wrap_words};

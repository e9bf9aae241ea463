//! Scroll-driven parallax timeline engine for pixel-art title sequences.
//!
//! Given a viewport, the natural size of a reference image and a scroll
//! progress in `[0, 1]`, the engine yields per-layer vertical offsets and
//! per-overlay opacities and translations. The pipeline runs
//! `viewport → responsive config → pixel scale → timeline segments → frame`.

pub mod assets;
pub mod error_codes;
pub mod manifest;
pub mod overlay;
pub mod parallax;
pub mod pixel_scale;
pub mod preview;
pub mod progress;
pub mod responsive;
pub mod scene;
pub mod schema;
pub mod timeline;
pub mod viewport;

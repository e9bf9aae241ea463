//! Software snapshot of a single frame: layers composited with
//! nearest-neighbour scaling, overlays drawn as translucent placeholder
//! panels. Meant for eyeballing layouts, not for production output.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use tiny_skia::{
    Color, ColorU8, FilterQuality, Paint, Pixmap, PixmapPaint, Rect, Transform,
};

use crate::assets::FsImageSizeLoader;
use crate::error_codes::CodedError;
use crate::overlay::OverlayKind;
use crate::parallax::LayerSpec;
use crate::scene::{FrameState, SceneLayout};

const BACKGROUND: (u8, u8, u8) = (0x0b, 0x0d, 0x26);
const INTRO_CARD_HEIGHT: f32 = 96.0;
const CTA_PANEL_HEIGHT: f32 = 180.0;
const LOGO_ASPECT: f32 = 0.3;

/// Longest preview edge in pixels.
pub const MAX_PREVIEW_SIDE: u32 = 8192;
/// 8K UHD worth of pixels.
pub const MAX_PREVIEW_PIXELS: u64 = 7680 * 4320;

/// Decoded layer images keyed by source.
#[derive(Default)]
pub struct LayerImages {
    by_source: BTreeMap<String, Pixmap>,
}

impl LayerImages {
    /// Decodes every layer source it can; failures are logged and the layer
    /// is left out of the preview.
    pub fn load(loader: &FsImageSizeLoader, layers: &[LayerSpec]) -> Self {
        let mut by_source = BTreeMap::new();
        for layer in layers {
            if by_source.contains_key(&layer.source) {
                continue;
            }
            let path = loader.resolve(&layer.source);
            match decode_pixmap(&path) {
                Ok(pixmap) => {
                    by_source.insert(layer.source.clone(), pixmap);
                }
                Err(error) => {
                    tracing::warn!(
                        layer = %layer.id,
                        error = %format!("{error:#}"),
                        "skipping layer in preview"
                    );
                }
            }
        }
        Self { by_source }
    }

    pub fn insert(&mut self, source: impl Into<String>, pixmap: Pixmap) {
        self.by_source.insert(source.into(), pixmap);
    }

    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

fn decode_pixmap(path: &Path) -> Result<Pixmap> {
    let rgba = image::open(path)
        .with_context(|| format!("failed to decode {}", path.display()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("image {} has zero size", path.display()))?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Renders `frame` at the layout's viewport size.
pub fn render_frame(layout: &SceneLayout, frame: &FrameState, images: &LayerImages) -> Result<Pixmap> {
    let (width, height) = preview_dimensions(layout)?;
    let mut pixmap = Pixmap::new(width, height).context("failed to create preview pixmap")?;
    let (r, g, b) = BACKGROUND;
    pixmap.fill(Color::from_rgba8(r, g, b, 255));

    let canvas_w = width as f32;
    let canvas_h = height as f32;
    let scale = frame.scene_scale as f32;
    let sources = layout
        .layers
        .iter()
        .map(|layer| (layer.id.as_str(), layer.source.as_str()))
        .collect::<BTreeMap<_, _>>();

    let paint = PixmapPaint {
        quality: FilterQuality::Nearest,
        ..PixmapPaint::default()
    };

    for layer in &frame.layers {
        let Some(image) = sources
            .get(layer.id.as_str())
            .and_then(|source| images.by_source.get(*source))
        else {
            continue;
        };
        if layer.width_px == 0 || layer.height_px == 0 {
            continue;
        }
        let shown_w = layer.width_px as f32 * scale;
        let shown_h = layer.height_px as f32 * scale;
        let transform = Transform::from_row(
            shown_w / image.width() as f32,
            0.0,
            0.0,
            shown_h / image.height() as f32,
            (canvas_w - shown_w) / 2.0,
            canvas_h / 2.0 + (layer.offset_y_px as f32 - canvas_h / 2.0) * scale,
        );
        pixmap.draw_pixmap(0, 0, image.as_ref(), &paint, transform, None);
    }

    let mut overlays = frame.overlays.clone();
    overlays.sort_by_key(|overlay| overlay.stack_order);
    for overlay in overlays {
        let alpha = (overlay.opacity.clamp(0.0, 1.0) * 200.0).round() as u8;
        if alpha == 0 {
            continue;
        }
        let shift = overlay.translate_y_px as f32;
        let tokens = &layout.tokens;
        let (rect, rgb) = match overlay.kind {
            OverlayKind::Intro => {
                let pad = tokens.intro_padding_x as f32;
                let w = (tokens.intro_max_width as f32).min(canvas_w - 2.0 * pad);
                (
                    Rect::from_xywh(pad, tokens.intro_padding_top as f32 + shift, w, INTRO_CARD_HEIGHT),
                    (0xf4, 0xf1, 0xe8),
                )
            }
            OverlayKind::MidLogo => {
                let pad = tokens.logo_padding_x as f32;
                let w = (tokens.logo_max_width as f32).min(canvas_w - 2.0 * pad);
                (
                    Rect::from_xywh((canvas_w - w) / 2.0, shift, w, w * LOGO_ASPECT),
                    (0xe8, 0xb8, 0x4a),
                )
            }
            OverlayKind::Cta => {
                let pad = tokens.cta_wrapper_padding_x as f32;
                let w = (tokens.cta_max_width as f32).min(canvas_w - 2.0 * pad);
                let top = canvas_h - tokens.cta_wrapper_padding_y as f32 - CTA_PANEL_HEIGHT;
                (
                    Rect::from_xywh((canvas_w - w) / 2.0, top + shift, w, CTA_PANEL_HEIGHT),
                    (0x1a, 0x14, 0x30),
                )
            }
        };
        let Some(rect) = rect else {
            continue;
        };
        let mut fill = Paint::default();
        fill.set_color_rgba8(rgb.0, rgb.1, rgb.2, alpha);
        fill.anti_alias = false;
        pixmap.fill_rect(rect, &fill, Transform::identity(), None);
    }

    Ok(pixmap)
}

fn preview_dimensions(layout: &SceneLayout) -> Result<(u32, u32)> {
    let viewport = layout.viewport;
    let side = |value: f64| {
        if value.is_finite() {
            value.max(1.0).round().min(f64::from(u32::MAX)) as u32
        } else {
            u32::MAX
        }
    };
    let (width, height) = (side(viewport.width), side(viewport.height));
    let pixels = u64::from(width) * u64::from(height);
    if width > MAX_PREVIEW_SIDE || height > MAX_PREVIEW_SIDE || pixels > MAX_PREVIEW_PIXELS {
        return Err(anyhow!(CodedError::usage(
            "PREVIEW_TOO_LARGE",
            format!(
                "preview of {viewport} exceeds the {MAX_PREVIEW_SIDE}px edge or \
                 {MAX_PREVIEW_PIXELS} pixel limit"
            ),
        )
        .with_details(json!({
            "width": viewport.width,
            "height": viewport.height,
            "max_side": MAX_PREVIEW_SIDE,
            "max_pixels": MAX_PREVIEW_PIXELS,
        }))));
    }
    Ok((width, height))
}

pub fn save_png(pixmap: &Pixmap, path: &Path) -> Result<()> {
    pixmap
        .save_png(path)
        .with_context(|| format!("failed to write preview {}", path.display()))
}

//! Live scene state: the inputs that change at runtime and the layout
//! snapshot derived from them.
//!
//! Every input change rebuilds [`SceneLayout`] from scratch, so the layout is
//! a pure function of the current inputs and never holds stale pieces from
//! an earlier viewport. Evaluating a frame only reads the layout.

use std::collections::{BTreeMap, HashSet};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::assets::SizeEvent;
use crate::overlay::{opacity, LogoPlacement, OverlayKind, OverlayMotion};
use crate::parallax::{default_title_layers, layer_offset, LayerSpec};
use crate::pixel_scale::{compute_pixel_scale, PixelScale, FALLBACK_TRAVEL_PX};
use crate::progress::{sweep, ScrollProgress, ScrollProgressSource};
use crate::responsive::{resolve, Bucket, PresentationTokens, ResponsiveConfig};
use crate::timeline::{segment_config, TimelineSegments};
use crate::viewport::{NaturalSize, Viewport};

const TIGHT_PADDING_SCALE: f64 = 0.88;
const TIGHT_LAYER_OFFSET_SCALE: f64 = 0.94;
const TIGHT_SCENE_SCALE: f64 = 0.94;
const VERY_NARROW_MAX_WIDTH: f64 = 600.0;

/// Everything the layout is derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneInputs {
    pub viewport: Viewport,
    pub zoom: f64,
    /// Natural sizes keyed by image source.
    pub sizes: BTreeMap<String, NaturalSize>,
}

impl Default for SceneInputs {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            zoom: 1.0,
            sizes: BTreeMap::new(),
        }
    }
}

/// Compaction applied when the backdrop barely overflows the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spacing {
    pub tight: bool,
    pub padding_scale: f64,
    pub layer_offset_scale: f64,
    pub scene_scale: f64,
}

impl Spacing {
    pub const ROOMY: Self = Self {
        tight: false,
        padding_scale: 1.0,
        layer_offset_scale: 1.0,
        scene_scale: 1.0,
    };

    pub const TIGHT: Self = Self {
        tight: true,
        padding_scale: TIGHT_PADDING_SCALE,
        layer_offset_scale: TIGHT_LAYER_OFFSET_SCALE,
        scene_scale: TIGHT_SCENE_SCALE,
    };

    pub fn compute(viewport_height: f64, raw_overflow_px: f64) -> Self {
        if viewport_height <= 0.0 {
            return Self::ROOMY;
        }
        let buffer = viewport_height * 0.18 + (viewport_height * 0.02).max(24.0);
        if raw_overflow_px <= buffer {
            Self::TIGHT
        } else {
            Self::ROOMY
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerPlacement {
    pub id: String,
    pub source: String,
    pub stack_order: i32,
    pub curve_exponent: f64,
    pub start_offset_px: f64,
    pub width_px: u32,
    pub height_px: u32,
}

/// Derived layout for one set of [`SceneInputs`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneLayout {
    pub viewport: Viewport,
    pub bucket: Bucket,
    pub config: ResponsiveConfig,
    /// Presentation tokens after spacing compaction.
    pub tokens: PresentationTokens,
    pub pixel_scale: PixelScale,
    pub travel_px: f64,
    pub effective_viewport_height: f64,
    pub scroll_screens: f64,
    pub section_height_px: f64,
    pub spacing: Spacing,
    pub segments: TimelineSegments,
    pub logo: LogoPlacement,
    pub motion: OverlayMotion,
    /// Sorted by stack order, back to front.
    pub layers: Vec<LayerPlacement>,
}

impl SceneLayout {
    pub fn compute(layers: &[LayerSpec], reference: &LayerSpec, inputs: &SceneInputs) -> Self {
        let viewport = inputs.viewport;
        let config = resolve(viewport);
        let reference_size = inputs.sizes.get(&reference.source).copied();

        let (pixel_scale, travel_px) = match reference_size {
            Some(size) if viewport.is_measured() => {
                let scale = compute_pixel_scale(size, viewport);
                (scale, scale.travel_px)
            }
            _ => (PixelScale::NEUTRAL, FALLBACK_TRAVEL_PX),
        };

        let viewport_height = viewport.height_px();
        let effective_viewport_height = viewport.effective_height(inputs.zoom);
        let scroll_screens = config.scroll_pages + travel_px / effective_viewport_height.max(1.0);
        let section_height_px = (effective_viewport_height * config.scroll_pages + travel_px).round();
        let spacing = Spacing::compute(viewport_height, pixel_scale.raw_overflow_px);

        let segments = segment_config(&config, scroll_screens);
        let layout_width = viewport.layout_width();
        let very_narrow = layout_width > 0.0 && layout_width <= VERY_NARROW_MAX_WIDTH;
        let logo = LogoPlacement::compute(
            viewport_height,
            config.tokens.logo_ratio,
            spacing.tight,
            very_narrow,
        );
        let motion = OverlayMotion::new(&segments, logo);

        let mut placements = layers
            .iter()
            .map(|layer| {
                let natural = inputs
                    .sizes
                    .get(&layer.source)
                    .copied()
                    .or(reference_size)
                    .unwrap_or_default();
                let (width_px, height_px) = natural.scaled(pixel_scale.factor);
                LayerPlacement {
                    id: layer.id.clone(),
                    source: layer.source.clone(),
                    stack_order: layer.stack_order,
                    curve_exponent: layer.curve_exponent,
                    start_offset_px: config.layer_offset(layer)
                        * viewport_height
                        * spacing.layer_offset_scale,
                    width_px,
                    height_px,
                }
            })
            .collect::<Vec<_>>();
        placements.sort_by_key(|placement| placement.stack_order);

        let tokens = if spacing.tight {
            config.tokens.spaced(spacing.padding_scale)
        } else {
            config.tokens
        };

        Self {
            viewport,
            bucket: config.bucket,
            tokens,
            config,
            pixel_scale,
            travel_px,
            effective_viewport_height,
            scroll_screens,
            section_height_px,
            spacing,
            segments,
            logo,
            motion,
            layers: placements,
        }
    }

    pub fn frame(&self, progress: ScrollProgress) -> FrameState {
        let layers = self
            .layers
            .iter()
            .map(|layer| LayerFrame {
                id: layer.id.clone(),
                stack_order: layer.stack_order,
                offset_y_px: layer_offset(
                    progress,
                    layer.curve_exponent,
                    layer.start_offset_px,
                    self.travel_px,
                ),
                width_px: layer.width_px,
                height_px: layer.height_px,
            })
            .collect();

        let overlays = OverlayKind::ALL
            .into_iter()
            .map(|kind| OverlayFrame {
                kind,
                stack_order: kind.stack_order(),
                opacity: opacity(progress, &kind.segment(&self.segments)),
                translate_y_px: self.motion.translate_y(kind, progress),
            })
            .collect();

        FrameState {
            progress,
            section_height_px: self.section_height_px,
            scene_scale: self.spacing.scene_scale,
            layers,
            overlays,
        }
    }

    /// Evaluates `steps + 1` evenly spaced frames and digests their JSON
    /// encoding, one frame per line, with SHA-256.
    pub fn sweep(&self, steps: u32) -> Result<SweepReport> {
        let frames = sweep(steps).map(|progress| self.frame(progress)).collect::<Vec<_>>();
        let mut hasher = Sha256::new();
        for frame in &frames {
            let encoded = serde_json::to_vec(frame).context("failed to encode frame")?;
            hasher.update(&encoded);
            hasher.update(b"\n");
        }
        Ok(SweepReport {
            steps: steps.max(1),
            digest: format!("{:x}", hasher.finalize()),
            frames,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub steps: u32,
    pub digest: String,
    pub frames: Vec<FrameState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerFrame {
    pub id: String,
    pub stack_order: i32,
    pub offset_y_px: f64,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayFrame {
    pub kind: OverlayKind,
    pub stack_order: i32,
    pub opacity: f64,
    pub translate_y_px: f64,
}

/// Transforms and opacities for one rendered frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameState {
    pub progress: ScrollProgress,
    pub section_height_px: f64,
    pub scene_scale: f64,
    pub layers: Vec<LayerFrame>,
    pub overlays: Vec<OverlayFrame>,
}

impl FrameState {
    pub fn overlay(&self, kind: OverlayKind) -> Option<&OverlayFrame> {
        self.overlays.iter().find(|overlay| overlay.kind == kind)
    }

    pub fn layer(&self, id: &str) -> Option<&LayerFrame> {
        self.layers.iter().find(|layer| layer.id == id)
    }
}

/// The parallax scene: a fixed layer stack plus live inputs.
#[derive(Debug, Clone)]
pub struct ParallaxScene {
    layers: Vec<LayerSpec>,
    reference: usize,
    inputs: SceneInputs,
    layout: SceneLayout,
}

impl ParallaxScene {
    /// `reference` names the layer whose natural size drives the pixel scale;
    /// defaults to the first layer.
    pub fn new(layers: Vec<LayerSpec>, reference: Option<&str>) -> Result<Self> {
        validate_layers(&layers)?;
        let reference = match reference {
            Some(id) => layers
                .iter()
                .position(|layer| layer.id == id)
                .with_context(|| format!("reference layer '{id}' is not in the layer stack"))?,
            None => 0,
        };
        let inputs = SceneInputs::default();
        let layout = SceneLayout::compute(&layers, &layers[reference], &inputs);
        Ok(Self {
            layers,
            reference,
            inputs,
            layout,
        })
    }

    /// The title-screen stack with the backdrop as reference.
    pub fn title() -> Self {
        let layers = default_title_layers();
        let inputs = SceneInputs::default();
        let layout = SceneLayout::compute(&layers, &layers[0], &inputs);
        Self {
            layers,
            reference: 0,
            inputs,
            layout,
        }
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn reference_layer(&self) -> &LayerSpec {
        &self.layers[self.reference]
    }

    pub fn inputs(&self) -> &SceneInputs {
        &self.inputs
    }

    pub fn layout(&self) -> &SceneLayout {
        &self.layout
    }

    /// Returns whether anything changed.
    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        if self.inputs.viewport == viewport {
            return false;
        }
        self.inputs.viewport = viewport;
        self.recompute();
        true
    }

    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
        if self.inputs.zoom == zoom {
            return false;
        }
        self.inputs.zoom = zoom;
        self.recompute();
        true
    }

    pub fn set_size(&mut self, source: &str, size: NaturalSize) -> bool {
        if !size.is_positive() || self.inputs.sizes.get(source) == Some(&size) {
            return false;
        }
        self.inputs.sizes.insert(source.to_owned(), size);
        self.recompute();
        true
    }

    /// Applies a loader result. Failed loads keep the last-known size.
    pub fn apply_size_event(&mut self, event: SizeEvent) -> bool {
        match event.size {
            Some(size) if size.is_positive() => self.set_size(&event.source, size),
            _ => {
                tracing::warn!(
                    source = %event.source,
                    "image size unavailable, keeping last known size"
                );
                false
            }
        }
    }

    pub fn frame(&self, progress: ScrollProgress) -> FrameState {
        self.layout.frame(progress)
    }

    pub fn frame_from(&self, source: &impl ScrollProgressSource) -> FrameState {
        self.layout.frame(source.sample())
    }

    fn recompute(&mut self) {
        self.layout = SceneLayout::compute(&self.layers, &self.layers[self.reference], &self.inputs);
        tracing::debug!(
            viewport = %self.inputs.viewport,
            bucket = %self.layout.bucket,
            factor = self.layout.pixel_scale.factor,
            travel_px = self.layout.travel_px,
            section_height_px = self.layout.section_height_px,
            tight = self.layout.spacing.tight,
            "recomputed scene layout"
        );
    }
}

fn validate_layers(layers: &[LayerSpec]) -> Result<()> {
    if layers.is_empty() {
        bail!("scene must define at least one layer");
    }
    let mut seen = HashSet::with_capacity(layers.len());
    for layer in layers {
        layer.validate()?;
        if !seen.insert(layer.id.as_str()) {
            bail!("duplicate layer id '{}'", layer.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKDROP: &str = "Backdrop_dark.png";

    fn laptop_scene() -> ParallaxScene {
        let mut scene = ParallaxScene::title();
        scene.set_size(BACKDROP, NaturalSize::new(256, 256));
        scene.set_viewport(Viewport::new(1440.0, 900.0));
        scene
    }

    #[test]
    fn unloaded_reference_uses_fallback_travel() {
        let mut scene = ParallaxScene::title();
        scene.set_viewport(Viewport::new(1440.0, 900.0));
        let layout = scene.layout();
        assert_eq!(layout.pixel_scale, PixelScale::NEUTRAL);
        assert_eq!(layout.travel_px, FALLBACK_TRAVEL_PX);
        assert_eq!(layout.section_height_px, (900.0_f64 * 3.0 + 300.0).round());
        assert!(layout.spacing.tight);
    }

    #[test]
    fn reference_size_drives_scale_and_section_height() {
        let scene = laptop_scene();
        let layout = scene.layout();
        assert_eq!(layout.bucket, Bucket::Compact);
        assert_eq!(layout.pixel_scale.factor, 6);
        assert_eq!(layout.travel_px, 636.0);
        assert_eq!(layout.section_height_px, 3336.0);
        assert!(!layout.spacing.tight);
        let backdrop = &layout.layers[0];
        assert_eq!(backdrop.id, "backdrop");
        assert_eq!((backdrop.width_px, backdrop.height_px), (1536, 1536));
    }

    #[test]
    fn layers_are_sorted_by_stack_order() {
        let scene = laptop_scene();
        let orders = scene
            .layout()
            .layers
            .iter()
            .map(|l| l.stack_order)
            .collect::<Vec<_>>();
        assert_eq!(orders, vec![0, 1, 10, 20, 30, 40, 60, 70, 80]);
    }

    #[test]
    fn layers_without_size_borrow_reference_size() {
        let mut scene = laptop_scene();
        scene.set_size("Butterflies_1.png", NaturalSize::new(128, 64));
        let frame = scene.frame(ScrollProgress::START);
        let butterflies = frame.layer("butterflies_1").expect("layer present");
        assert_eq!((butterflies.width_px, butterflies.height_px), (768, 384));
        let river = frame.layer("river").expect("layer present");
        assert_eq!((river.width_px, river.height_px), (1536, 1536));
    }

    #[test]
    fn all_layers_meet_at_final_frame() {
        let frame = laptop_scene().frame(ScrollProgress::END);
        assert!(frame.layers.iter().all(|layer| layer.offset_y_px == -636.0));
        let cta = frame.overlay(OverlayKind::Cta).expect("cta present");
        assert_eq!(cta.opacity, 1.0);
        assert_eq!(cta.translate_y_px, -10.0);
    }

    #[test]
    fn first_frame_shows_layers_at_start_offsets() {
        let frame = laptop_scene().frame(ScrollProgress::START);
        let river = frame.layer("river").expect("layer present");
        assert!((river.offset_y_px - 0.75 * 900.0).abs() < 1e-9);
        let backdrop = frame.layer("backdrop").expect("layer present");
        assert!((backdrop.offset_y_px - (-0.14 * 900.0)).abs() < 1e-9);
        assert!(frame.overlays.iter().all(|overlay| overlay.opacity == 0.0));
    }

    #[test]
    fn tight_spacing_scales_offsets_and_paddings() {
        let mut scene = ParallaxScene::title();
        scene.set_size(BACKDROP, NaturalSize::new(480, 270));
        scene.set_viewport(Viewport::new(1920.0, 1080.0));
        let layout = scene.layout();
        assert!(layout.spacing.tight);
        assert_eq!(layout.spacing.scene_scale, 0.94);
        assert_eq!(layout.travel_px, 270.0);
        let river = layout.layers.iter().find(|l| l.id == "river").expect("river");
        assert!((river.start_offset_px - 0.61 * 1080.0 * 0.94).abs() < 1e-9);
        assert_eq!(layout.tokens.intro_padding_top, 106);
    }

    #[test]
    fn zoom_lengthens_section() {
        let mut scene = laptop_scene();
        let before = scene.layout().section_height_px;
        assert!(scene.set_zoom(2.0));
        assert_eq!(scene.layout().section_height_px, (1800.0_f64 * 3.0 + 636.0).round());
        assert!(scene.layout().section_height_px > before);
        assert!(!scene.set_zoom(2.0));
        assert!(scene.set_zoom(f64::NAN));
        assert_eq!(scene.inputs().zoom, 1.0);
    }

    #[test]
    fn resize_order_does_not_matter() {
        let mut direct = laptop_scene();
        direct.set_viewport(Viewport::new(390.0, 844.0));

        let mut wandering = ParallaxScene::title();
        wandering.set_viewport(Viewport::new(2560.0, 1440.0));
        wandering.set_viewport(Viewport::new(800.0, 600.0));
        wandering.set_size(BACKDROP, NaturalSize::new(256, 256));
        wandering.set_viewport(Viewport::new(1440.0, 900.0));
        wandering.set_viewport(Viewport::new(390.0, 844.0));

        assert_eq!(direct.layout(), wandering.layout());
    }

    #[test]
    fn failed_size_event_keeps_last_known_size() {
        let mut scene = laptop_scene();
        let before = scene.layout().clone();
        let changed = scene.apply_size_event(SizeEvent {
            source: BACKDROP.to_owned(),
            size: None,
        });
        assert!(!changed);
        assert_eq!(scene.layout(), &before);
    }

    #[test]
    fn redundant_updates_report_no_change() {
        let mut scene = laptop_scene();
        assert!(!scene.set_viewport(Viewport::new(1440.0, 900.0)));
        assert!(!scene.set_size(BACKDROP, NaturalSize::new(256, 256)));
        assert!(!scene.set_size(BACKDROP, NaturalSize::new(0, 0)));
    }

    #[test]
    fn rejects_invalid_layer_stacks() {
        let error = ParallaxScene::new(Vec::new(), None).expect_err("empty stack");
        assert!(error.to_string().contains("at least one layer"));

        let duplicated = vec![
            LayerSpec::new("sky", "sky.png", 2.0, 0),
            LayerSpec::new("sky", "sky2.png", 3.0, 1),
        ];
        let error = ParallaxScene::new(duplicated, None).expect_err("duplicate ids");
        assert!(error.to_string().contains("duplicate layer id 'sky'"));

        let error = ParallaxScene::new(vec![LayerSpec::new("sky", "sky.png", 2.0, 0)], Some("sea"))
            .expect_err("unknown reference");
        assert!(error.to_string().contains("reference layer 'sea'"));
    }

    #[test]
    fn sweep_digest_is_stable_and_input_sensitive() {
        let first = laptop_scene().layout().sweep(40).expect("sweep");
        let second = laptop_scene().layout().sweep(40).expect("sweep");
        assert_eq!(first.frames.len(), 41);
        assert_eq!(first.digest.len(), 64);
        assert_eq!(first, second);

        let mut resized = laptop_scene();
        resized.set_viewport(Viewport::new(1920.0, 1080.0));
        assert_ne!(resized.layout().sweep(40).expect("sweep").digest, first.digest);
    }

    #[test]
    fn custom_reference_layer_drives_scale() {
        let layers = vec![
            LayerSpec::new("stars", "stars.png", 4.0, 0),
            LayerSpec::new("city", "city.png", 2.0, 1),
        ];
        let mut scene = ParallaxScene::new(layers, Some("city")).expect("valid scene");
        scene.set_viewport(Viewport::new(1600.0, 1000.0));
        scene.set_size("stars.png", NaturalSize::new(64, 64));
        assert_eq!(scene.layout().pixel_scale, PixelScale::NEUTRAL);
        scene.set_size("city.png", NaturalSize::new(400, 300));
        assert_eq!(scene.layout().pixel_scale.factor, 4);
        assert_eq!(scene.reference_layer().id, "city");
    }
}

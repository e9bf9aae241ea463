//! Viewport → configuration bundle.
//!
//! Buckets are an ordered table of `(predicate, override)` rows. The first
//! row whose predicate matches wins, so a tighter predicate must sit above
//! any broader one that would also match (very-narrow before narrow).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parallax::{LayerSpec, DEFAULT_LAYER_OFFSET_VH};
use crate::viewport::{Viewport, FALLBACK_VIEWPORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    VeryNarrow,
    Narrow,
    Compact,
    UltraWide,
    Wide,
    Base,
}

impl Bucket {
    pub const ALL: [Bucket; 6] = [
        Self::VeryNarrow,
        Self::Narrow,
        Self::Compact,
        Self::UltraWide,
        Self::Wide,
        Self::Base,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::VeryNarrow => "very-narrow",
            Self::Narrow => "narrow",
            Self::Compact => "compact",
            Self::UltraWide => "ultra-wide",
            Self::Wide => "wide",
            Self::Base => "base",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Two-axis padding in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Padding {
    pub vertical: u32,
    pub horizontal: u32,
}

impl Padding {
    pub const fn new(vertical: u32, horizontal: u32) -> Self {
        Self {
            vertical,
            horizontal,
        }
    }
}

/// Layout numbers handed to the overlay renderer. The engine never lays out
/// text itself; it only scales these under tight spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PresentationTokens {
    pub intro_padding_top: u32,
    pub intro_padding_x: u32,
    pub intro_card_padding: Padding,
    pub intro_max_width: u32,
    pub cta_wrapper_padding_x: u32,
    pub cta_wrapper_padding_y: u32,
    pub cta_panel_padding: Padding,
    pub cta_max_width: u32,
    pub cta_columns: u32,
    pub cta_gap: u32,
    pub logo_ratio: f64,
    pub logo_max_width: u32,
    pub logo_padding_x: u32,
}

impl PresentationTokens {
    const BASE: Self = Self {
        intro_padding_top: 108,
        intro_padding_x: 24,
        intro_card_padding: Padding::new(20, 24),
        intro_max_width: 420,
        cta_wrapper_padding_x: 24,
        cta_wrapper_padding_y: 32,
        cta_panel_padding: Padding::new(32, 36),
        cta_max_width: 720,
        cta_columns: 2,
        cta_gap: 24,
        logo_ratio: 0.18,
        logo_max_width: 620,
        logo_padding_x: 24,
    };

    /// Scales spacing tokens; the CTA gap never drops below 8 px.
    pub fn spaced(&self, scale: f64) -> Self {
        let px = |value: u32| (f64::from(value) * scale).round().max(0.0) as u32;
        Self {
            intro_padding_top: px(self.intro_padding_top),
            intro_padding_x: px(self.intro_padding_x),
            cta_wrapper_padding_x: px(self.cta_wrapper_padding_x),
            cta_wrapper_padding_y: px(self.cta_wrapper_padding_y),
            cta_gap: px(self.cta_gap).max(8),
            ..*self
        }
    }
}

/// Immutable configuration snapshot for one viewport bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsiveConfig {
    pub bucket: Bucket,
    /// Scroll length of the section in viewport heights.
    pub scroll_pages: f64,
    pub intro_fraction: f64,
    pub intro_delay_fraction: f64,
    pub intro_display_multiplier: f64,
    pub cta_reveal_ratio: f64,
    /// Per-layer start offsets (fraction of viewport height) overriding the
    /// layer's own default, keyed by layer id.
    pub layer_offsets: Vec<(&'static str, f64)>,
    pub tokens: PresentationTokens,
}

impl ResponsiveConfig {
    pub fn base() -> Self {
        Self {
            bucket: Bucket::Base,
            scroll_pages: 3.2,
            intro_fraction: 0.1,
            intro_delay_fraction: 0.018,
            intro_display_multiplier: 2.0,
            cta_reveal_ratio: 0.75,
            layer_offsets: Vec::new(),
            tokens: PresentationTokens::BASE,
        }
    }

    /// Start offset for `layer` as a fraction of viewport height: bucket
    /// override, then the layer's own offset, then the stack default.
    pub fn layer_offset(&self, layer: &LayerSpec) -> f64 {
        self.layer_offsets
            .iter()
            .find(|(id, _)| *id == layer.id)
            .map(|(_, offset)| *offset)
            .or(layer.offset_vh)
            .unwrap_or(DEFAULT_LAYER_OFFSET_VH)
    }

    pub fn for_bucket(bucket: Bucket) -> Self {
        BUCKET_RULES
            .iter()
            .find(|rule| rule.bucket == bucket)
            .map(|rule| (rule.apply)(Self::base()))
            .unwrap_or_else(Self::base)
    }
}

struct BucketRule {
    bucket: Bucket,
    matches: fn(f64, f64) -> bool,
    apply: fn(ResponsiveConfig) -> ResponsiveConfig,
}

const BUCKET_RULES: &[BucketRule] = &[
    BucketRule {
        bucket: Bucket::VeryNarrow,
        matches: |width, _| width <= 600.0,
        apply: very_narrow,
    },
    BucketRule {
        bucket: Bucket::Narrow,
        matches: |width, _| width <= 900.0,
        apply: narrow,
    },
    BucketRule {
        bucket: Bucket::Compact,
        matches: |width, height| width <= 1200.0 || height <= 940.0,
        apply: compact,
    },
    BucketRule {
        bucket: Bucket::UltraWide,
        matches: |width, _| width >= 2200.0,
        apply: ultra_wide,
    },
    BucketRule {
        bucket: Bucket::Wide,
        matches: |width, _| width >= 1800.0,
        apply: wide,
    },
    BucketRule {
        bucket: Bucket::Base,
        matches: |_, _| true,
        apply: |base| base,
    },
];

/// Selects the first bucket whose predicate matches the layout width and
/// height. Unmeasured axes fall back to [`FALLBACK_VIEWPORT`].
pub fn select_bucket(viewport: Viewport) -> Bucket {
    let (width, height) = bucket_dimensions(viewport);
    BUCKET_RULES
        .iter()
        .find(|rule| (rule.matches)(width, height))
        .map_or(Bucket::Base, |rule| rule.bucket)
}

pub fn resolve(viewport: Viewport) -> ResponsiveConfig {
    ResponsiveConfig::for_bucket(select_bucket(viewport))
}

fn bucket_dimensions(viewport: Viewport) -> (f64, f64) {
    let width = match viewport.layout_width() {
        width if width > 0.0 => width,
        _ => FALLBACK_VIEWPORT.width,
    };
    let height = match viewport.height_px() {
        height if height > 0.0 => height,
        _ => FALLBACK_VIEWPORT.height,
    };
    (width, height)
}

fn very_narrow(base: ResponsiveConfig) -> ResponsiveConfig {
    ResponsiveConfig {
        bucket: Bucket::VeryNarrow,
        scroll_pages: 2.3,
        intro_fraction: 0.15,
        intro_delay_fraction: 0.005,
        cta_reveal_ratio: 0.55,
        layer_offsets: vec![
            ("mountain_range", 0.44),
            ("river", 0.48),
            ("gravestones", 0.52),
            ("torii_gate", 0.48),
        ],
        tokens: PresentationTokens {
            intro_padding_top: 80,
            intro_padding_x: 16,
            intro_card_padding: Padding::new(16, 18),
            intro_max_width: 320,
            cta_wrapper_padding_x: 16,
            cta_wrapper_padding_y: 22,
            cta_panel_padding: Padding::new(24, 20),
            cta_max_width: 380,
            cta_columns: 1,
            cta_gap: 16,
            logo_ratio: 0.08,
            logo_max_width: 360,
            logo_padding_x: 12,
        },
        ..base
    }
}

fn narrow(base: ResponsiveConfig) -> ResponsiveConfig {
    ResponsiveConfig {
        bucket: Bucket::Narrow,
        scroll_pages: 2.6,
        intro_fraction: 0.13,
        intro_delay_fraction: 0.01,
        cta_reveal_ratio: 0.6,
        layer_offsets: vec![
            ("mountain_range", 0.48),
            ("river", 0.52),
            ("gravestones", 0.56),
            ("torii_gate", 0.52),
        ],
        tokens: PresentationTokens {
            intro_padding_top: 88,
            intro_padding_x: 18,
            intro_card_padding: Padding::new(18, 22),
            intro_max_width: 360,
            cta_wrapper_padding_x: 18,
            cta_wrapper_padding_y: 26,
            cta_panel_padding: Padding::new(28, 24),
            cta_max_width: 520,
            cta_columns: 2,
            cta_gap: 20,
            logo_ratio: 0.16,
            logo_max_width: 520,
            logo_padding_x: 18,
        },
        ..base
    }
}

fn compact(base: ResponsiveConfig) -> ResponsiveConfig {
    ResponsiveConfig {
        bucket: Bucket::Compact,
        scroll_pages: 3.0,
        intro_delay_fraction: 0.015,
        cta_reveal_ratio: 0.68,
        layer_offsets: vec![
            ("mountain_range", 0.72),
            ("river", 0.75),
            ("gravestones", 0.68),
            ("torii_gate", 0.54),
        ],
        tokens: PresentationTokens {
            intro_padding_top: 96,
            intro_padding_x: 22,
            cta_wrapper_padding_x: 22,
            cta_wrapper_padding_y: 30,
            cta_panel_padding: Padding::new(30, 28),
            cta_max_width: 640,
            logo_ratio: 0.17,
            logo_max_width: 580,
            logo_padding_x: 20,
            ..base.tokens
        },
        ..base
    }
}

fn ultra_wide(base: ResponsiveConfig) -> ResponsiveConfig {
    ResponsiveConfig {
        bucket: Bucket::UltraWide,
        scroll_pages: 3.8,
        intro_fraction: 0.085,
        intro_delay_fraction: 0.035,
        cta_reveal_ratio: 0.78,
        layer_offsets: vec![
            ("mountain_range", 0.65),
            ("river", 0.68),
            ("gravestones", 0.7),
            ("torii_gate", 0.66),
        ],
        tokens: PresentationTokens {
            intro_padding_top: 132,
            intro_padding_x: 36,
            intro_card_padding: Padding::new(26, 34),
            cta_wrapper_padding_x: 40,
            cta_wrapper_padding_y: 44,
            cta_panel_padding: Padding::new(40, 48),
            cta_max_width: 920,
            cta_columns: 2,
            cta_gap: 32,
            logo_ratio: 0.22,
            logo_max_width: 840,
            logo_padding_x: 36,
            ..base.tokens
        },
        ..base
    }
}

fn wide(base: ResponsiveConfig) -> ResponsiveConfig {
    ResponsiveConfig {
        bucket: Bucket::Wide,
        scroll_pages: 3.5,
        intro_fraction: 0.09,
        intro_delay_fraction: 0.03,
        cta_reveal_ratio: 0.76,
        layer_offsets: vec![
            ("mountain_range", 0.57),
            ("river", 0.61),
            ("gravestones", 0.64),
            ("torii_gate", 0.6),
        ],
        tokens: PresentationTokens {
            intro_padding_top: 120,
            intro_padding_x: 30,
            intro_card_padding: Padding::new(24, 30),
            cta_wrapper_padding_x: 32,
            cta_wrapper_padding_y: 36,
            cta_panel_padding: Padding::new(36, 40),
            cta_max_width: 860,
            cta_columns: 2,
            cta_gap: 28,
            logo_ratio: 0.2,
            logo_max_width: 720,
            logo_padding_x: 32,
            ..base.tokens
        },
        ..base
    }
}

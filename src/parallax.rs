use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::progress::ScrollProgress;

/// Start offset (fraction of viewport height) for layers that name none.
pub const DEFAULT_LAYER_OFFSET_VH: f64 = -0.14;

/// One stacked image of the parallax scene.
///
/// Curve exponents above 1 hold a layer back until late in the scroll
/// (distant scenery); exponents below 1 move it early (foreground).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub curve_exponent: f64,
    #[serde(default)]
    pub stack_order: i32,
    #[serde(default)]
    pub offset_vh: Option<f64>,
}

impl LayerSpec {
    pub fn new(id: &str, source: &str, curve_exponent: f64, stack_order: i32) -> Self {
        Self {
            id: id.to_owned(),
            source: source.to_owned(),
            curve_exponent,
            stack_order,
            offset_vh: None,
        }
    }

    pub fn with_offset(mut self, offset_vh: f64) -> Self {
        self.offset_vh = Some(offset_vh);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("layer id cannot be empty");
        }
        if self.source.trim().is_empty() {
            bail!("layer '{}' source cannot be empty", self.id);
        }
        if !self.curve_exponent.is_finite() || self.curve_exponent <= 0.0 {
            bail!(
                "layer '{}' curve_exponent must be a finite number > 0, got {}",
                self.id,
                self.curve_exponent
            );
        }
        if let Some(offset) = self.offset_vh {
            if !offset.is_finite() {
                bail!("layer '{}' offset_vh must be finite", self.id);
            }
        }
        Ok(())
    }
}

/// The title screen stack, back to front by `stack_order`.
pub fn default_title_layers() -> Vec<LayerSpec> {
    vec![
        LayerSpec::new("backdrop", "Backdrop_dark.png", 20.0, 0),
        LayerSpec::new("mountain_range", "Mountain_range.png", 8.0, 10).with_offset(0.545),
        LayerSpec::new("river", "River.png", 10.0, 20).with_offset(0.55),
        LayerSpec::new("gravestones", "Gravestones.png", 11.0, 30).with_offset(0.6),
        LayerSpec::new("torii_gate", "Torii_gate.png", 12.0, 40).with_offset(0.55),
        LayerSpec::new("spirit_orb", "Spirit_orb.png", 8.0, 1),
        LayerSpec::new("butterflies_3", "Butterflies_3.png", 0.75, 60),
        LayerSpec::new("butterflies_2", "Butterflies_2.png", 0.8, 70),
        LayerSpec::new("butterflies_1", "Butterflies_1.png", 0.6, 80),
    ]
}

/// `progress ^ exponent`. Invalid exponents behave linearly.
pub fn curve(progress: ScrollProgress, exponent: f64) -> f64 {
    let exponent = if exponent.is_finite() && exponent > 0.0 {
        exponent
    } else {
        1.0
    };
    progress.value().powf(exponent)
}

/// Vertical offset of a layer: the curved progress interpolates from
/// `start_offset_px` to the shared terminal offset `-travel_px`.
///
/// Written as a weighted sum so that progress 1 yields exactly `-travel_px`
/// for every exponent and start offset.
pub fn layer_offset(
    progress: ScrollProgress,
    exponent: f64,
    start_offset_px: f64,
    travel_px: f64,
) -> f64 {
    let curved = curve(progress, exponent);
    let end = -travel_px.max(0.0);
    start_offset_px * (1.0 - curved) + end * curved
}

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error_codes::CodedError;

/// The scene never lays out wider than this, however wide the window is.
pub const MAX_SCENE_WIDTH: f64 = 2200.0;

/// Viewport assumed by the resolver when no measurement is available yet.
pub const FALLBACK_VIEWPORT: Viewport = Viewport {
    width: 1440.0,
    height: 900.0,
};

const FALLBACK_EFFECTIVE_HEIGHT: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn has_width(&self) -> bool {
        self.width.is_finite() && self.width > 0.0
    }

    pub fn has_height(&self) -> bool {
        self.height.is_finite() && self.height > 0.0
    }

    pub fn is_measured(&self) -> bool {
        self.has_width() && self.has_height()
    }

    /// Width used for layout: the measured width capped at [`MAX_SCENE_WIDTH`],
    /// or 0 when unmeasured.
    pub fn layout_width(&self) -> f64 {
        if self.has_width() {
            self.width.min(MAX_SCENE_WIDTH)
        } else {
            0.0
        }
    }

    /// Height in pixels, or 0 when unmeasured.
    pub fn height_px(&self) -> f64 {
        if self.has_height() {
            self.height
        } else {
            0.0
        }
    }

    /// Height the scroll section is sized against. A pinch-zoomed page keeps
    /// its CSS height but shows fewer CSS pixels, so the section grows with
    /// the zoom factor; zoom below 1 is ignored.
    pub fn effective_height(&self, zoom: f64) -> f64 {
        let base = if self.has_height() {
            self.height
        } else {
            FALLBACK_EFFECTIVE_HEIGHT
        };
        let zoom = if zoom.is_finite() { zoom.max(1.0) } else { 1.0 };
        base * zoom
    }

    /// Parses `WIDTHxHEIGHT`, e.g. `1440x900`.
    pub fn parse(value: &str) -> Result<Self> {
        let (width, height) = parse_dimensions(value).ok_or_else(|| {
            anyhow!(CodedError::usage(
                "INVALID_VIEWPORT",
                format!("invalid viewport '{value}', expected WIDTHxHEIGHT"),
            )
            .with_details(json!({ "provided": value, "example": "1440x900" })))
        })?;
        Ok(Self::new(f64::from(width), f64::from(height)))
    }
}

impl FromStr for Viewport {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Intrinsic pixel size of an image asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NaturalSize {
    pub width: u32,
    pub height: u32,
}

impl NaturalSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn scaled(&self, factor: u32) -> (u32, u32) {
        (
            self.width.saturating_mul(factor),
            self.height.saturating_mul(factor),
        )
    }

    pub fn parse(value: &str) -> Result<Self> {
        let (width, height) = parse_dimensions(value).ok_or_else(|| {
            anyhow!(CodedError::usage(
                "INVALID_SIZE",
                format!("invalid image size '{value}', expected WIDTHxHEIGHT"),
            )
            .with_details(json!({ "provided": value, "example": "256x256" })))
        })?;
        Ok(Self::new(width, height))
    }
}

impl FromStr for NaturalSize {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl fmt::Display for NaturalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn parse_dimensions(value: &str) -> Option<(u32, u32)> {
    let normalized = value.trim().to_ascii_lowercase();
    let (width, height) = normalized.split_once('x')?;
    let width = width.trim().parse::<u32>().ok()?;
    let height = height.trim().parse::<u32>().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

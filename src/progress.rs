use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::error_codes::CodedError;

/// Normalised scroll position through the parallax section, always in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[serde(transparent)]
pub struct ScrollProgress(f64);

impl ScrollProgress {
    pub const START: Self = Self(0.0);
    pub const END: Self = Self(1.0);

    /// Clamps into `[0, 1]`; NaN maps to the start.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::START;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Strict variant for user input: rejects values outside `[0, 1]`.
    pub fn parse(value: &str) -> Result<Self> {
        let parsed = value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && (0.0..=1.0).contains(v));
        parsed.map(Self).ok_or_else(|| {
            anyhow!(CodedError::usage(
                "INVALID_PROGRESS",
                format!("invalid progress '{value}', expected a number in [0, 1]"),
            )
            .with_details(json!({ "provided": value, "min": 0.0, "max": 1.0 })))
        })
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for ScrollProgress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        f64::deserialize(deserializer).map(Self::new)
    }
}

impl fmt::Display for ScrollProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// Anything that can report where the reader is inside the section.
pub trait ScrollProgressSource {
    fn sample(&self) -> ScrollProgress;
}

/// Progress derived from the scroll container's bounding box: 0 when the
/// container's top edge reaches the viewport top, 1 when its bottom edge does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerScroll {
    /// Container top relative to the viewport top; negative once scrolled past.
    pub container_top: f64,
    pub container_height: f64,
}

impl ContainerScroll {
    pub fn new(container_top: f64, container_height: f64) -> Self {
        Self {
            container_top,
            container_height,
        }
    }

    /// From document coordinates: the page scroll offset and the container's
    /// offset from the document top.
    pub fn from_page(scroll_y: f64, container_offset_top: f64, container_height: f64) -> Self {
        Self::new(container_offset_top - scroll_y, container_height)
    }
}

impl ScrollProgressSource for ContainerScroll {
    fn sample(&self) -> ScrollProgress {
        let scrolled = -self.container_top;
        if !self.container_height.is_finite() || self.container_height <= 0.0 {
            return if scrolled > 0.0 {
                ScrollProgress::END
            } else {
                ScrollProgress::START
            };
        }
        ScrollProgress::new(scrolled / self.container_height)
    }
}

impl ScrollProgressSource for ScrollProgress {
    fn sample(&self) -> ScrollProgress {
        *self
    }
}

/// `steps + 1` evenly spaced samples from 0 to 1 inclusive.
pub fn sweep(steps: u32) -> impl Iterator<Item = ScrollProgress> {
    let steps = steps.max(1);
    (0..=steps).map(move |index| ScrollProgress::new(f64::from(index) / f64::from(steps)))
}

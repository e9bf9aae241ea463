use serde::Serialize;

use crate::viewport::{NaturalSize, Viewport};

/// Travel used while the reference image size is still unknown.
pub const FALLBACK_TRAVEL_PX: f64 = 300.0;

/// Share of the viewport height used as travel when the backdrop does not
/// overflow vertically at all.
const MIN_TRAVEL_SHARE: f64 = 0.25;

/// Integer zoom of the pixel-art reference image plus the vertical distance
/// it can travel once scaled to cover the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelScale {
    pub factor: u32,
    pub travel_px: f64,
    /// Overflow before the zero-travel substitution.
    pub raw_overflow_px: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
}

impl PixelScale {
    pub const NEUTRAL: Self = Self {
        factor: 1,
        travel_px: 0.0,
        raw_overflow_px: 0.0,
        scaled_width: 0,
        scaled_height: 0,
    };
}

impl Default for PixelScale {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Smallest integer factor at which `natural` covers the viewport on both
/// axes. Coverage uses the layout width, so the scene cap applies.
///
/// Non-positive inputs yield [`PixelScale::NEUTRAL`].
pub fn compute_pixel_scale(natural: NaturalSize, viewport: Viewport) -> PixelScale {
    let width = viewport.layout_width();
    let height = viewport.height_px();
    if !natural.is_positive() || width <= 0.0 || height <= 0.0 {
        return PixelScale::NEUTRAL;
    }

    let cover_w = (width / f64::from(natural.width)).ceil();
    let cover_h = (height / f64::from(natural.height)).ceil();
    let factor = cover_w.max(cover_h).max(1.0).min(f64::from(u32::MAX)) as u32;

    let (scaled_width, scaled_height) = natural.scaled(factor);
    let raw_overflow_px = (f64::from(scaled_height) - height).max(0.0);
    let travel_px = if raw_overflow_px > 0.0 {
        raw_overflow_px
    } else {
        (height * MIN_TRAVEL_SHARE).round()
    };

    PixelScale {
        factor,
        travel_px,
        raw_overflow_px,
        scaled_width,
        scaled_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_backdrop_on_laptop_viewport() {
        let scale = compute_pixel_scale(NaturalSize::new(256, 256), Viewport::new(1440.0, 900.0));
        assert_eq!(scale.factor, 6);
        assert_eq!(scale.scaled_height, 1536);
        assert_eq!(scale.scaled_width, 1536);
        assert_eq!(scale.travel_px, 636.0);
        assert_eq!(scale.raw_overflow_px, 636.0);
    }

    #[test]
    fn factor_is_max_of_axis_ceilings() {
        let cases = [
            ((320, 180), (1920.0, 1080.0), 6),
            ((320, 180), (390.0, 844.0), 5),
            ((256, 256), (2560.0, 1440.0), 9),
            ((4000, 3000), (1440.0, 900.0), 1),
            ((100, 50), (1000.0, 501.0), 11),
        ];
        for ((w, h), (vw, vh), expected) in cases {
            let natural = NaturalSize::new(w, h);
            let viewport = Viewport::new(vw, vh);
            let scale = compute_pixel_scale(natural, viewport);
            assert_eq!(scale.factor, expected, "{natural} on {viewport}");
            assert!(f64::from(scale.scaled_width) >= viewport.layout_width());
            assert!(f64::from(scale.scaled_height) >= vh);
            if scale.factor > 1 {
                let smaller = natural.scaled(scale.factor - 1);
                assert!(
                    f64::from(smaller.0) < viewport.layout_width() || f64::from(smaller.1) < vh,
                    "factor should be minimal for {natural} on {viewport}"
                );
            }
        }
    }

    #[test]
    fn exact_fit_substitutes_quarter_height_travel() {
        let scale = compute_pixel_scale(NaturalSize::new(480, 270), Viewport::new(1920.0, 1080.0));
        assert_eq!(scale.factor, 4);
        assert_eq!(scale.raw_overflow_px, 0.0);
        assert_eq!(scale.travel_px, 270.0);
    }

    #[test]
    fn non_positive_inputs_are_neutral() {
        let viewport = Viewport::new(1440.0, 900.0);
        assert_eq!(
            compute_pixel_scale(NaturalSize::new(0, 256), viewport),
            PixelScale::NEUTRAL
        );
        assert_eq!(
            compute_pixel_scale(NaturalSize::new(256, 256), Viewport::new(0.0, 900.0)),
            PixelScale::NEUTRAL
        );
        assert_eq!(
            compute_pixel_scale(NaturalSize::new(256, 256), Viewport::new(1440.0, -1.0)),
            PixelScale::NEUTRAL
        );
    }

    #[test]
    fn coverage_uses_capped_scene_width() {
        let capped = compute_pixel_scale(NaturalSize::new(256, 256), Viewport::new(3840.0, 1000.0));
        assert_eq!(capped.factor, 9);
    }
}

use serde::Serialize;

use crate::progress::ScrollProgress;
use crate::timeline::{Terminal, TimelineSegment, TimelineSegments};

const INTRO_RISE_PX: (f64, f64) = (20.0, -10.0);
const CTA_RISE_PX: (f64, f64) = (40.0, -10.0);
const LOGO_ENTRY_Y_PX: f64 = -80.0;
const LOGO_MAX_Y_PX: f64 = 240.0;
const LOGO_VERY_NARROW_Y_PX: f64 = 20.0;
const FALLBACK_LOGO_HEIGHT_PX: f64 = 780.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Intro,
    MidLogo,
    Cta,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 3] = [Self::Intro, Self::MidLogo, Self::Cta];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::MidLogo => "mid_logo",
            Self::Cta => "cta",
        }
    }

    /// Stacking of the overlay panels above the parallax layers.
    pub fn stack_order(self) -> i32 {
        match self {
            Self::Intro => 95,
            Self::MidLogo => 92,
            Self::Cta => 90,
        }
    }

    pub fn segment(self, segments: &TimelineSegments) -> TimelineSegment {
        match self {
            Self::Intro => segments.intro,
            Self::MidLogo => segments.mid_logo,
            Self::Cta => segments.cta,
        }
    }
}

/// Opacity of an overlay at `progress`: ramps in over `[start, fade_in_end]`,
/// holds, ramps out over `[fade_out_start, end]`. Holding segments stay at 1.
pub fn opacity(progress: ScrollProgress, segment: &TimelineSegment) -> f64 {
    let p = progress.value();
    if p < segment.start {
        return 0.0;
    }
    if p < segment.fade_in_end {
        return ramp(p, segment.start, segment.fade_in_end);
    }
    if segment.terminal == Terminal::Hold || p <= segment.fade_out_start {
        return 1.0;
    }
    if p < segment.end {
        return 1.0 - ramp(p, segment.fade_out_start, segment.end);
    }
    0.0
}

fn ramp(p: f64, from: f64, to: f64) -> f64 {
    let span = to - from;
    if span <= 0.0 {
        return 1.0;
    }
    ((p - from) / span).clamp(0.0, 1.0)
}

/// Piecewise-linear value over progress, held flat outside the first and
/// last keyframe. Keyframe positions that go backwards are raised to their
/// predecessor, so a later keyframe can never be reached before an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyframes {
    points: Vec<(f64, f64)>,
}

impl Keyframes {
    pub fn new(points: &[(f64, f64)]) -> Self {
        let mut sanitized: Vec<(f64, f64)> = Vec::with_capacity(points.len());
        for &(at, value) in points {
            let at = match sanitized.last() {
                Some(&(previous, _)) => at.max(previous),
                None => at,
            };
            sanitized.push((at, value));
        }
        Self { points: sanitized }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn sample(&self, progress: ScrollProgress) -> f64 {
        let p = progress.value();
        let Some(&(first_at, first_value)) = self.points.first() else {
            return 0.0;
        };
        if p <= first_at {
            return first_value;
        }
        for pair in self.points.windows(2) {
            let (from_at, from_value) = pair[0];
            let (to_at, to_value) = pair[1];
            if p < to_at {
                let t = ramp(p, from_at, to_at);
                return from_value + (to_value - from_value) * t;
            }
        }
        self.points.last().map_or(first_value, |&(_, value)| value)
    }
}

/// Vertical placement of the mid-logo, derived from viewport height and
/// the bucket's logo ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogoPlacement {
    pub resting_y_px: f64,
    pub final_y_px: f64,
}

impl LogoPlacement {
    pub fn compute(viewport_height: f64, logo_ratio: f64, tight: bool, very_narrow: bool) -> Self {
        let height = if viewport_height > 0.0 {
            viewport_height
        } else {
            FALLBACK_LOGO_HEIGHT_PX
        };
        let base_y = (height * logo_ratio).min(LOGO_MAX_Y_PX);
        let resting_y_px = if very_narrow {
            LOGO_VERY_NARROW_Y_PX
        } else if tight {
            base_y * 0.9
        } else {
            base_y
        };
        let lift = -(height * 0.74).min(660.0).max(300.0);
        let final_y_px = if tight { lift * 0.92 } else { lift };
        Self {
            resting_y_px,
            final_y_px,
        }
    }
}

/// Translation curves for each overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayMotion {
    pub intro: Keyframes,
    pub mid_logo: Keyframes,
    pub cta: Keyframes,
}

impl OverlayMotion {
    pub fn new(segments: &TimelineSegments, logo: LogoPlacement) -> Self {
        let cta_start = segments.cta_fade_start();
        Self {
            intro: Keyframes::new(&[
                (segments.intro.start, INTRO_RISE_PX.0),
                (segments.intro.end, INTRO_RISE_PX.1),
            ]),
            mid_logo: Keyframes::new(&[
                (segments.mid_logo.start, LOGO_ENTRY_Y_PX),
                (segments.mid_logo.fade_in_end, logo.resting_y_px),
                (cta_start, logo.resting_y_px),
                (1.0, logo.final_y_px),
            ]),
            cta: Keyframes::new(&[(cta_start, CTA_RISE_PX.0), (1.0, CTA_RISE_PX.1)]),
        }
    }

    pub fn translate_y(&self, kind: OverlayKind, progress: ScrollProgress) -> f64 {
        match kind {
            OverlayKind::Intro => self.intro.sample(progress),
            OverlayKind::MidLogo => self.mid_logo.sample(progress),
            OverlayKind::Cta => self.cta.sample(progress),
        }
    }
}

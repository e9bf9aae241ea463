//! Scroll-progress segments for the overlay panels.
//!
//! The segments depend on each other, so they are derived in a fixed order:
//!
//! ```text
//! intro (raw) ──► cta ──► intro (refined) ──► mid-logo
//!                  │                              ▲
//!                  └──────────────────────────────┘
//! ```
//!
//! The refined intro never feeds back into the CTA; the CTA is always clamped
//! against the raw intro end. The mid-logo starts after the refined intro has
//! ended and peaks before the CTA is fully shown, so no two overlays are ever
//! at full opacity together.

use serde::Serialize;

use crate::responsive::ResponsiveConfig;

/// Width given to an interval whose computed bounds would invert.
pub const MIN_SEGMENT_SPAN: f64 = 1e-4;

const INTRO_MIN_SPAN: f64 = 0.001;
const INTRO_MAX_SPAN: f64 = 0.55;
const INTRO_LATEST_END: f64 = 0.92;
const INTRO_FADE_IN_SHARE: f64 = 0.35;
const INTRO_HOLD_SHARE: f64 = 0.8;
const PRESENTS_HOLD_MULTIPLIER: f64 = 3.0;

const MID_LOGO_GAP: f64 = 0.05;
const MID_LOGO_LATEST_START: f64 = 0.5;

const CTA_MIN_RATIO: f64 = 0.5;
const CTA_MAX_RATIO: f64 = 0.88;
const CTA_LATEST_REVEAL: f64 = 0.985;

/// What an overlay does once its segment's fade-out point is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    FadeOut,
    /// Stays fully visible through the end of the section.
    Hold,
}

/// `start ≤ fade_in_end ≤ fade_out_start ≤ end`, all within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineSegment {
    pub start: f64,
    pub fade_in_end: f64,
    pub fade_out_start: f64,
    pub end: f64,
    pub terminal: Terminal,
}

impl TimelineSegment {
    /// Builds a fade-in / hold / fade-out segment. Inverted ramps collapse to
    /// [`MIN_SEGMENT_SPAN`] anchored at their left bound; an inverted hold
    /// collapses to zero width.
    pub fn fading(start: f64, fade_in_end: f64, fade_out_start: f64, end: f64) -> Self {
        Self::fading_within(start, fade_in_end, fade_out_start, end, 1.0)
    }

    /// Like [`TimelineSegment::fading`], but no boundary passes `ceiling`.
    /// When a collapsed ramp would overshoot it, the segment is pulled back
    /// below the ceiling instead.
    pub fn fading_within(
        start: f64,
        fade_in_end: f64,
        fade_out_start: f64,
        end: f64,
        ceiling: f64,
    ) -> Self {
        let ceiling = unit(ceiling);
        let bound = |value: f64| unit(value).min(ceiling);

        let mut start = bound(start);
        let mut fade_in_end = ramp_end(start, bound(fade_in_end));
        let mut fade_out_start = bound(fade_out_start).max(fade_in_end);
        let mut end = ramp_end(fade_out_start, bound(end));
        if end > ceiling {
            end = ceiling;
            fade_out_start = fade_out_start.min(end - MIN_SEGMENT_SPAN).max(0.0);
            fade_in_end = fade_in_end.min(fade_out_start);
            start = start.min(fade_in_end - MIN_SEGMENT_SPAN).max(0.0);
        }

        Self {
            start,
            fade_in_end,
            fade_out_start,
            end,
            terminal: Terminal::FadeOut,
        }
    }

    /// Builds a segment that fades in over `[start, full]` and never leaves.
    pub fn holding(start: f64, full: f64) -> Self {
        let start = unit(start);
        let fade_in_end = ramp_end(start, full);
        Self {
            start,
            fade_in_end,
            fade_out_start: 1.0,
            end: 1.0,
            terminal: Terminal::Hold,
        }
    }

    pub fn is_ordered(&self) -> bool {
        0.0 <= self.start
            && self.start <= self.fade_in_end
            && self.fade_in_end <= self.fade_out_start
            && self.fade_out_start <= self.end
            && self.end <= 1.0
    }
}

/// Everything the segmenter reads. Scroll screens come from the scene
/// (section length including backdrop travel, in viewport heights).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineInputs {
    pub intro_fraction: f64,
    pub intro_delay_fraction: f64,
    pub intro_display_multiplier: f64,
    pub cta_reveal_ratio: f64,
    pub scroll_screens: f64,
}

impl TimelineInputs {
    pub fn from_config(config: &ResponsiveConfig, scroll_screens: f64) -> Self {
        Self {
            intro_fraction: config.intro_fraction,
            intro_delay_fraction: config.intro_delay_fraction,
            intro_display_multiplier: config.intro_display_multiplier,
            cta_reveal_ratio: config.cta_reveal_ratio,
            scroll_screens,
        }
    }
}

/// The three overlay segments plus the CTA figures other consumers key off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineSegments {
    pub intro: TimelineSegment,
    pub mid_logo: TimelineSegment,
    pub cta: TimelineSegment,
    /// CTA reveal ratio after the scroll-length adjustment.
    pub cta_ratio: f64,
}

impl TimelineSegments {
    pub fn cta_fade_start(&self) -> f64 {
        self.cta.start
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TimelineSegment)> {
        [
            ("intro", &self.intro),
            ("mid_logo", &self.mid_logo),
            ("cta", &self.cta),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RawIntro {
    start: f64,
    fade_in_end: f64,
    hold_end: f64,
    end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CtaTimings {
    ratio: f64,
    fade_start: f64,
    /// Progress at which the CTA reaches full opacity.
    full: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RefinedIntro {
    hold_end: f64,
    end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MidLogoTimings {
    start: f64,
    hold: f64,
    end: f64,
}

pub fn segment(inputs: &TimelineInputs) -> TimelineSegments {
    let raw = raw_intro(inputs);
    let cta = cta_timings(inputs, &raw);
    let refined = refined_intro(&raw, &cta);

    let cta_segment = TimelineSegment::holding(cta.fade_start, cta.full);
    let intro = TimelineSegment::fading_within(
        raw.start,
        raw.fade_in_end,
        refined.hold_end,
        refined.end,
        cta_segment.start,
    );
    let mid = mid_logo(&intro, &cta, cta_segment.fade_in_end);

    TimelineSegments {
        intro,
        mid_logo: TimelineSegment::fading(mid.start, mid.hold, mid.hold, mid.end),
        cta: cta_segment,
        cta_ratio: cta.ratio,
    }
}

pub fn segment_config(config: &ResponsiveConfig, scroll_screens: f64) -> TimelineSegments {
    segment(&TimelineInputs::from_config(config, scroll_screens))
}

fn raw_intro(inputs: &TimelineInputs) -> RawIntro {
    let latest_start = (inputs.intro_fraction - 0.01).max(0.0);
    let start = inputs.intro_delay_fraction.min(latest_start).max(0.0);
    let base_span = (inputs.intro_fraction - start).max(INTRO_MIN_SPAN);
    let multiplier = finite_or(inputs.intro_display_multiplier, 1.0).max(1.0);
    let span = (base_span * multiplier).min(INTRO_MAX_SPAN);
    RawIntro {
        start,
        fade_in_end: start + span * INTRO_FADE_IN_SHARE,
        hold_end: start + span * INTRO_HOLD_SHARE,
        end: (start + span).min(INTRO_LATEST_END),
    }
}

/// Short sections reveal the CTA earlier; long ones slightly later.
fn cta_ratio_adjustment(scroll_screens: f64) -> f64 {
    if scroll_screens <= 2.4 {
        -0.12
    } else if scroll_screens <= 2.9 {
        -0.07
    } else if scroll_screens >= 3.6 {
        0.02
    } else {
        0.0
    }
}

fn cta_timings(inputs: &TimelineInputs, raw: &RawIntro) -> CtaTimings {
    let ratio = clamp(
        inputs.cta_reveal_ratio + cta_ratio_adjustment(inputs.scroll_screens),
        CTA_MIN_RATIO,
        CTA_MAX_RATIO,
    );
    let full = inputs.intro_fraction + ratio * (1.0 - inputs.intro_fraction);
    let fade_window = clamp((1.0 - ratio) * 0.55, 0.08, 0.2);
    let earliest_start = (inputs.intro_fraction + 0.015).max((raw.end + 0.02).min(0.96));
    let fade_start = clamp(full - fade_window, earliest_start, 0.98);
    CtaTimings {
        ratio,
        fade_start,
        full: full.min(CTA_LATEST_REVEAL),
    }
}

/// Stretches the "presents" hold now that the CTA start is known.
fn refined_intro(raw: &RawIntro, cta: &CtaTimings) -> RefinedIntro {
    let fade_in_end = raw.fade_in_end;
    let hold_span = (raw.hold_end - fade_in_end).max(MIN_SEGMENT_SPAN);
    let fade_out_span = (raw.end - raw.hold_end).max(MIN_SEGMENT_SPAN);
    let cta_start = finite_or(cta.fade_start, 0.97);

    let hold_cap = (fade_in_end + 0.01).max((cta_start - 0.02).min(0.94));
    let hold_end = (fade_in_end + hold_span * PRESENTS_HOLD_MULTIPLIER).min(hold_cap);
    let fade_out_cap = (hold_end + 0.005).max((cta_start - 0.01).min(0.965));
    RefinedIntro {
        hold_end,
        end: (hold_end + fade_out_span).min(fade_out_cap),
    }
}

/// Anchored on the published intro's end. `cta_full_at` is where the CTA
/// reaches full opacity; the logo's peak must come strictly before it.
fn mid_logo(intro: &TimelineSegment, cta: &CtaTimings, cta_full_at: f64) -> MidLogoTimings {
    let mut start = (intro.end + MID_LOGO_GAP).min(MID_LOGO_LATEST_START.max(intro.end));
    let hold_candidate = (start + 0.22).min(cta.fade_start - 0.05);
    let mut hold = if hold_candidate > start {
        hold_candidate
    } else {
        start + 0.06
    };
    let latest_peak = cta_full_at - MIN_SEGMENT_SPAN;
    if hold >= latest_peak {
        hold = latest_peak;
        start = start.min(hold - MIN_SEGMENT_SPAN).max(intro.end);
    }
    let end_candidate = (hold + 0.12).min(cta.full - 0.02);
    let end = if end_candidate > hold {
        end_candidate
    } else {
        hold + 0.02
    };
    MidLogoTimings { start, hold, end }
}

/// `min(max(value, min), max)`: the upper bound wins when the bounds cross.
fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

fn unit(value: f64) -> f64 {
    clamp(finite_or(value, 0.0), 0.0, 1.0)
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Right bound of a ramp starting at `left`; never at or before `left`
/// unless `left` already sits at the end of the timeline.
fn ramp_end(left: f64, right: f64) -> f64 {
    let right = unit(right);
    if right > left {
        right
    } else {
        (left + MIN_SEGMENT_SPAN).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responsive::{Bucket, ResponsiveConfig};

    const EPS: f64 = 1e-9;

    fn inputs(intro_fraction: f64, delay: f64, multiplier: f64) -> TimelineInputs {
        TimelineInputs {
            intro_fraction,
            intro_delay_fraction: delay,
            intro_display_multiplier: multiplier,
            cta_reveal_ratio: 0.75,
            scroll_screens: 3.2,
        }
    }

    #[test]
    fn raw_intro_without_display_multiplier() {
        let raw = raw_intro(&inputs(0.1, 0.018, 1.0));
        assert!((raw.start - 0.018).abs() < EPS);
        assert!((raw.fade_in_end - 0.0467).abs() < 1e-4);
        assert!((raw.hold_end - 0.0836).abs() < 1e-4);
        assert!((raw.end - 0.1).abs() < EPS);
    }

    #[test]
    fn display_multiplier_stretches_and_caps_span() {
        let raw = raw_intro(&inputs(0.1, 0.018, 2.0));
        assert!((raw.end - (0.018 + 0.164)).abs() < EPS);

        let capped = raw_intro(&inputs(0.5, 0.0, 4.0));
        assert!((capped.end - 0.55).abs() < EPS);
    }

    #[test]
    fn late_delay_is_pulled_inside_intro_fraction() {
        let raw = raw_intro(&inputs(0.1, 0.5, 1.0));
        assert!((raw.start - 0.09).abs() < EPS);
        assert!((raw.end - 0.1).abs() < EPS);
    }

    #[test]
    fn cta_adjustment_follows_scroll_length() {
        assert_eq!(cta_ratio_adjustment(2.3), -0.12);
        assert_eq!(cta_ratio_adjustment(2.4), -0.12);
        assert_eq!(cta_ratio_adjustment(2.7), -0.07);
        assert_eq!(cta_ratio_adjustment(3.2), 0.0);
        assert_eq!(cta_ratio_adjustment(3.6), 0.02);
    }

    #[test]
    fn laptop_base_timeline() {
        // Base configuration, 256px backdrop at 1440x900: travel 636px.
        let screens = 3.2 + 636.0 / 900.0;
        let segments = segment_config(&ResponsiveConfig::base(), screens);

        assert!((segments.cta_ratio - 0.77).abs() < EPS);
        assert!((segments.cta.fade_in_end - 0.793).abs() < 1e-9);
        assert!((segments.cta.start - 0.6665).abs() < 1e-9);
        assert_eq!(segments.cta.terminal, Terminal::Hold);

        assert!((segments.intro.start - 0.018).abs() < EPS);
        assert!((segments.intro.fade_in_end - 0.0754).abs() < 1e-9);
        assert!((segments.intro.fade_out_start - 0.2968).abs() < 1e-9);
        assert!((segments.intro.end - 0.3296).abs() < 1e-9);

        // the logo waits for the stretched intro to finish
        assert!((segments.mid_logo.start - 0.3796).abs() < 1e-9);
        assert!((segments.mid_logo.fade_in_end - 0.5996).abs() < 1e-9);
        assert!((segments.mid_logo.end - 0.7196).abs() < 1e-9);
    }

    #[test]
    fn mid_logo_falls_back_when_cta_crowds_it() {
        // Phone-sized section: the CTA starts before start + 0.22 - 0.05.
        let config = ResponsiveConfig::for_bucket(Bucket::VeryNarrow);
        let segments = segment_config(&config, 2.3 + 180.0 / 844.0);
        assert!((segments.cta.start - 0.375).abs() < 1e-9);
        assert!((segments.mid_logo.start - 0.415).abs() < 1e-9);
        assert!((segments.mid_logo.fade_in_end - 0.475).abs() < 1e-9);
        assert!((segments.mid_logo.end - 0.555).abs() < 1e-9);
        assert!((segments.intro.fade_out_start - 0.355).abs() < 1e-9);
        assert!((segments.intro.end - 0.365).abs() < 1e-9);
    }

    #[test]
    fn stretched_intro_finishes_before_mid_logo_peaks() {
        // 768x320 with a 320x180 backdrop: the presents hold runs to 0.418
        let config = ResponsiveConfig::for_bucket(Bucket::Narrow);
        let segments = segment_config(&config, 3.288);
        assert!((segments.intro.fade_out_start - 0.418).abs() < 1e-9);
        assert!((segments.intro.end - 0.442).abs() < 1e-9);
        assert!((segments.mid_logo.start - 0.492).abs() < 1e-9);
        assert!(segments.mid_logo.fade_in_end > segments.intro.end);
        assert!(segments.mid_logo.fade_out_start < segments.cta.fade_in_end);
    }

    #[test]
    fn every_bucket_yields_ordered_segments() {
        for bucket in Bucket::ALL {
            let config = ResponsiveConfig::for_bucket(bucket);
            for screens in [1.0, 2.4, 2.8, 3.3, 3.6, 5.0] {
                let segments = segment_config(&config, screens);
                for (name, segment) in segments.iter() {
                    assert!(
                        segment.is_ordered(),
                        "{bucket} {screens}: {name} out of order: {segment:?}"
                    );
                }
                assert!(segments.intro.end <= segments.cta.start, "{bucket} {screens}");
            }
        }
    }

    #[test]
    fn segmenting_is_idempotent() {
        let config = ResponsiveConfig::for_bucket(Bucket::Wide);
        assert_eq!(segment_config(&config, 3.9), segment_config(&config, 3.9));
    }

    #[test]
    fn degenerate_inputs_still_produce_valid_segments() {
        let extreme = [
            inputs(0.0, 0.0, 1.0),
            inputs(0.99, 0.9, 10.0),
            inputs(f64::NAN, f64::NAN, f64::NAN),
            TimelineInputs {
                cta_reveal_ratio: 5.0,
                scroll_screens: f64::INFINITY,
                ..inputs(0.6, 0.2, 3.0)
            },
        ];
        for inputs in extreme {
            let segments = segment(&inputs);
            for (name, segment) in segments.iter() {
                assert!(segment.is_ordered(), "{name}: {segment:?} for {inputs:?}");
                assert!(segment.start.is_finite() && segment.end.is_finite());
            }
            assert!(segments.intro.end <= segments.cta.start, "{inputs:?}");
            assert!(segments.mid_logo.start >= segments.intro.end, "{inputs:?}");
        }
    }

    #[test]
    fn inverted_ramp_collapses_at_left_bound() {
        let segment = TimelineSegment::fading(0.4, 0.3, 0.2, 0.1);
        assert_eq!(segment.start, 0.4);
        assert!((segment.fade_in_end - (0.4 + MIN_SEGMENT_SPAN)).abs() < EPS);
        assert_eq!(segment.fade_out_start, segment.fade_in_end);
        assert!((segment.end - (segment.fade_out_start + MIN_SEGMENT_SPAN)).abs() < EPS);

        let pulled_back = TimelineSegment::fading_within(0.9, 0.99, 0.99, 0.99, 0.98);
        assert_eq!(pulled_back.end, 0.98);
        assert!(pulled_back.is_ordered());
        assert!(pulled_back.fade_out_start < pulled_back.end);
        assert_eq!(pulled_back.start, 0.9);

        let holding = TimelineSegment::holding(0.9, 0.8);
        assert!((holding.fade_in_end - (0.9 + MIN_SEGMENT_SPAN)).abs() < EPS);
        assert_eq!(holding.end, 1.0);
    }
}

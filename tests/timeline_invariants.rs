//! Properties that must hold for every viewport, not just the tuned ones.

use titlescroll::overlay::{opacity, OverlayKind};
use titlescroll::pixel_scale::compute_pixel_scale;
use titlescroll::progress::{sweep, ScrollProgress};
use titlescroll::responsive::{resolve, select_bucket, Bucket, ResponsiveConfig};
use titlescroll::scene::ParallaxScene;
use titlescroll::timeline::{segment, segment_config, TimelineInputs};
use titlescroll::viewport::{NaturalSize, Viewport};

const WIDTHS: [f64; 12] = [
    280.0, 390.0, 600.0, 601.0, 768.0, 900.0, 1024.0, 1200.0, 1440.0, 1800.0, 2200.0, 3840.0,
];
const HEIGHTS: [f64; 8] = [320.0, 568.0, 844.0, 900.0, 940.0, 941.0, 1080.0, 2160.0];

fn viewports() -> impl Iterator<Item = Viewport> {
    WIDTHS
        .into_iter()
        .flat_map(|width| HEIGHTS.into_iter().map(move |height| Viewport::new(width, height)))
}

#[test]
fn every_viewport_yields_ordered_segments() {
    let backdrops = [NaturalSize::new(256, 256), NaturalSize::new(320, 180)];
    for viewport in viewports() {
        for backdrop in backdrops {
            let config = resolve(viewport);
            let scale = compute_pixel_scale(backdrop, viewport);
            let screens = config.scroll_pages + scale.travel_px / viewport.height;
            let segments = segment_config(&config, screens);
            for (name, seg) in segments.iter() {
                assert!(seg.is_ordered(), "{name} unordered at {viewport}: {seg:?}");
                assert!(seg.start >= 0.0 && seg.end <= 1.0, "{name} out of range at {viewport}");
            }
            assert!(
                segments.intro.end <= segments.cta.start,
                "intro overlaps cta at {viewport}"
            );
        }
    }
}

#[test]
fn bucket_table_is_total_and_first_match() {
    for viewport in viewports() {
        let bucket = select_bucket(viewport);
        let width = viewport.layout_width();
        let expected = if width <= 600.0 {
            Bucket::VeryNarrow
        } else if width <= 900.0 {
            Bucket::Narrow
        } else if width <= 1200.0 || viewport.height <= 940.0 {
            Bucket::Compact
        } else if width >= 2200.0 {
            Bucket::UltraWide
        } else if width >= 1800.0 {
            Bucket::Wide
        } else {
            Bucket::Base
        };
        assert_eq!(bucket, expected, "bucket for {viewport}");
        assert_eq!(resolve(viewport).bucket, bucket);
    }
}

#[test]
fn documented_intro_example() {
    let config = ResponsiveConfig {
        intro_fraction: 0.1,
        intro_delay_fraction: 0.018,
        intro_display_multiplier: 1.0,
        ..ResponsiveConfig::base()
    };
    let segments = segment(&TimelineInputs::from_config(&config, 3.2));
    let intro = segments.intro;
    assert!((intro.start - 0.018).abs() < 1e-9);
    assert!((intro.fade_in_end - 0.0467).abs() < 1e-4);
    // the presents hold stretches the 0.1 raw end, but never into the CTA
    assert!(intro.end >= 0.1);
    assert!(intro.end <= segments.cta.start);
}

#[test]
fn segmentation_is_idempotent() {
    for viewport in viewports() {
        let config = resolve(viewport);
        assert_eq!(segment_config(&config, 3.5), segment_config(&config, 3.5));
    }
}

#[test]
fn overlay_opacity_stays_in_unit_range_along_sweeps() {
    for viewport in viewports().step_by(7) {
        let segments = segment_config(&resolve(viewport), 3.0);
        let mut previous_cta = 0.0;
        for progress in sweep(200) {
            for kind in OverlayKind::ALL {
                let value = opacity(progress, &kind.segment(&segments));
                assert!((0.0..=1.0).contains(&value), "{kind:?} at {progress}");
            }
            let cta = opacity(progress, &segments.cta);
            assert!(cta >= previous_cta, "cta opacity regressed at {progress}");
            previous_cta = cta;
        }
        assert_eq!(opacity(ScrollProgress::END, &segments.cta), 1.0);
    }
}

#[test]
fn at_most_one_overlay_is_fully_visible() {
    let backdrops = [
        NaturalSize::new(256, 256),
        NaturalSize::new(320, 180),
        NaturalSize::new(480, 270),
        NaturalSize::new(160, 400),
    ];
    for viewport in viewports() {
        for backdrop in backdrops {
            for zoom in [1.0, 1.5, 3.0] {
                let mut scene = ParallaxScene::title();
                scene.set_size("Backdrop_dark.png", backdrop);
                scene.set_zoom(zoom);
                scene.set_viewport(viewport);
                let segments = scene.layout().segments;

                // full opacity can be a single point, so sample every boundary too
                let boundaries = segments.iter().flat_map(|(_, seg)| {
                    [seg.start, seg.fade_in_end, seg.fade_out_start, seg.end]
                });
                let samples = sweep(400)
                    .chain(boundaries.map(ScrollProgress::new))
                    .collect::<Vec<_>>();
                for progress in samples {
                    let full = OverlayKind::ALL
                        .into_iter()
                        .filter(|kind| opacity(progress, &kind.segment(&segments)) >= 1.0)
                        .collect::<Vec<_>>();
                    assert!(
                        full.len() <= 1,
                        "{full:?} fully visible together at {progress} for {viewport}, \
                         backdrop {backdrop}, zoom {zoom}"
                    );
                }
            }
        }
    }
}
